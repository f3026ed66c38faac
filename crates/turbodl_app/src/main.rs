mod platform;

use clap::Parser;
use engine_logging::{engine_info, engine_warn};

fn main() -> anyhow::Result<()> {
    let cli = platform::Cli::parse();
    let loaded = platform::ClientConfig::resolve(&cli);

    platform::logging::initialize(loaded.config.log_destination);
    if let Some(warning) = &loaded.warning {
        engine_warn!("{}", warning);
        eprintln!("warning: {warning}; using defaults");
    }
    engine_info!(
        "Starting with settings from {:?}: backend={} push={}",
        loaded.path,
        loaded.config.backend_url,
        loaded.config.push_url()
    );

    platform::run_app(loaded.config)
}
