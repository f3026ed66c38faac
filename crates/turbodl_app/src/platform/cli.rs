use std::path::PathBuf;

use clap::Parser;

use super::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(name = "turbodl")]
#[command(about = "Terminal client for the TurboDL media backend.")]
pub struct Cli {
    /// Client settings file (default: ./turbodl.ron).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:8000. Overrides the settings file.
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Where diagnostic logs go. Overrides the settings file.
    #[arg(long, value_enum)]
    pub log: Option<LogDestination>,
}
