mod app;
mod cli;
mod command;
mod config;
mod effects;
pub mod logging;

pub use app::run_app;
pub use cli::Cli;
pub use config::ClientConfig;
