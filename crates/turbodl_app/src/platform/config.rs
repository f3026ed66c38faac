use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use turbodl_engine::{CommandSettings, EngineConfig, PushSettings};

use super::cli::Cli;
use super::logging::LogDestination;

pub const DEFAULT_CONFIG_PATH: &str = "./turbodl.ron";

/// Client settings, read from a RON file. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub backend_url: String,
    /// Push-channel URL. Derived from `backend_url` when unset.
    pub push_url: Option<String>,
    pub reconnect_delay_ms: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub log_destination: LogDestination,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            push_url: None,
            reconnect_delay_ms: 3000,
            connect_timeout_ms: 5000,
            request_timeout_ms: 30000,
            log_destination: LogDestination::File,
        }
    }
}

/// Outcome of reading the settings file. The logger is not up yet when the
/// file is read, so problems are reported back instead of logged here.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: ClientConfig,
    pub path: PathBuf,
    pub warning: Option<String>,
}

impl ClientConfig {
    /// Read settings from `path`. A missing file yields defaults silently; an
    /// unreadable or unparsable one yields defaults plus a warning.
    pub fn load(path: &Path) -> LoadedConfig {
        let (config, warning) = match fs::read_to_string(path) {
            Ok(text) => match ron::from_str::<ClientConfig>(&text) {
                Ok(config) => (config, None),
                Err(err) => (
                    ClientConfig::default(),
                    Some(format!("Failed to parse settings from {:?}: {}", path, err)),
                ),
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                (ClientConfig::default(), None)
            }
            Err(err) => (
                ClientConfig::default(),
                Some(format!("Failed to read settings from {:?}: {}", path, err)),
            ),
        };
        LoadedConfig {
            config,
            path: path.to_path_buf(),
            warning,
        }
    }

    /// Resolve settings from the command line: file first, flags on top.
    pub fn resolve(cli: &Cli) -> LoadedConfig {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut loaded = Self::load(&path);
        loaded.config.apply_overrides(cli);
        loaded
    }

    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(url) = &cli.backend_url {
            self.backend_url = url.clone();
        }
        if let Some(destination) = cli.log {
            self.log_destination = destination;
        }
    }

    pub fn push_url(&self) -> String {
        if let Some(url) = &self.push_url {
            return url.clone();
        }
        let base = self.backend_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws_base}/ws")
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            commands: CommandSettings {
                base_url: self.backend_url.clone(),
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
                request_timeout: Duration::from_millis(self.request_timeout_ms),
            },
            push: PushSettings {
                url: self.push_url(),
                reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cli(args: &[&str]) -> Cli {
        use clap::Parser;
        Cli::parse_from(std::iter::once("turbodl").chain(args.iter().copied()))
    }

    #[test]
    fn missing_file_gives_defaults_without_warning() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ClientConfig::load(&dir.path().join("absent.ron"));
        assert_eq!(loaded.config, ClientConfig::default());
        assert!(loaded.warning.is_none());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turbodl.ron");
        fs::write(
            &path,
            r#"(backend_url: "http://media.lan:9000", reconnect_delay_ms: 500, log_destination: Both)"#,
        )
        .unwrap();

        let loaded = ClientConfig::load(&path);
        assert!(loaded.warning.is_none());
        assert_eq!(loaded.config.backend_url, "http://media.lan:9000");
        assert_eq!(loaded.config.reconnect_delay_ms, 500);
        assert_eq!(loaded.config.request_timeout_ms, 30000);
        assert_eq!(loaded.config.log_destination, LogDestination::Both);
    }

    #[test]
    fn unparsable_file_warns_and_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turbodl.ron");
        fs::write(&path, "(backend_url: 42").unwrap();

        let loaded = ClientConfig::load(&path);
        assert_eq!(loaded.config, ClientConfig::default());
        assert!(loaded.warning.unwrap().contains("Failed to parse"));
    }

    #[test]
    fn flags_override_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.ron");
        fs::write(&path, r#"(backend_url: "http://a:1", log_destination: Terminal)"#).unwrap();
        let path_arg = path.to_string_lossy().to_string();

        let loaded = ClientConfig::resolve(&cli(&[
            "--config",
            &path_arg,
            "--backend-url",
            "https://b:2/",
            "--log",
            "file",
        ]));

        assert_eq!(loaded.path, path);
        assert_eq!(loaded.config.backend_url, "https://b:2/");
        assert_eq!(loaded.config.log_destination, LogDestination::File);
        assert_eq!(loaded.config.push_url(), "wss://b:2/ws");
    }

    #[test]
    fn push_url_is_derived_unless_set() {
        let mut config = ClientConfig::default();
        assert_eq!(config.push_url(), "ws://localhost:8000/ws");

        config.push_url = Some("ws://elsewhere/events".to_string());
        assert_eq!(config.push_url(), "ws://elsewhere/events");
    }

    #[test]
    fn engine_config_carries_timings() {
        let engine = ClientConfig::default().engine_config();
        assert_eq!(engine.push.reconnect_delay, Duration::from_secs(3));
        assert_eq!(engine.commands.request_timeout, Duration::from_secs(30));
        assert_eq!(engine.commands.base_url, "http://localhost:8000");
    }
}
