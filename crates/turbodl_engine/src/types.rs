use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Rate reported by the backend: a number in MB/s or a string it formatted itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Speed {
    Measured(f64),
    Preformatted(String),
}

/// A decoded `progress` frame from the push channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressUpdate {
    pub status: Option<String>,
    pub percent: Option<f64>,
    pub speed: Option<Speed>,
    pub eta: Option<u64>,
    pub message: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Download,
    ScrapeImages,
    ScrapeScripts,
    DownloadClip,
    Convert,
}

impl CommandKind {
    pub fn endpoint(self) -> &'static str {
        match self {
            CommandKind::Download => "/download",
            CommandKind::ScrapeImages => "/scrape-images",
            CommandKind::ScrapeScripts => "/scrape-scripts",
            CommandKind::DownloadClip => "/download-clip",
            CommandKind::Convert => "/convert",
        }
    }
}

/// A one-way job request for the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandRequest {
    Download {
        /// The video object exactly as analysis returned it.
        video: serde_json::Value,
        format_idx: usize,
    },
    ScrapeImages {
        url: String,
    },
    ScrapeScripts {
        url: String,
    },
    DownloadClip {
        url: String,
    },
    Convert {
        file_path: String,
        quality: String,
    },
}

impl CommandRequest {
    pub fn kind(&self) -> CommandKind {
        match self {
            CommandRequest::Download { .. } => CommandKind::Download,
            CommandRequest::ScrapeImages { .. } => CommandKind::ScrapeImages,
            CommandRequest::ScrapeScripts { .. } => CommandKind::ScrapeScripts,
            CommandRequest::DownloadClip { .. } => CommandKind::DownloadClip,
            CommandRequest::Convert { .. } => CommandKind::Convert,
        }
    }

    /// JSON body posted to the command endpoint.
    pub fn body(&self) -> serde_json::Value {
        match self {
            CommandRequest::Download { video, format_idx } => {
                serde_json::json!({ "video": video, "format_idx": format_idx })
            }
            CommandRequest::ScrapeImages { url }
            | CommandRequest::ScrapeScripts { url }
            | CommandRequest::DownloadClip { url } => serde_json::json!({ "url": url }),
            CommandRequest::Convert { file_path, quality } => {
                serde_json::json!({ "file_path": file_path, "quality": quality })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VideoFormat {
    pub ext: Option<String>,
    pub quality: Option<String>,
    pub resolution: Option<String>,
    pub filesize: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedVideo {
    pub title: String,
    pub formats: Vec<VideoFormat>,
    /// Full object from the backend, echoed back on download.
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisReport {
    pub found: bool,
    pub videos: Vec<AnalyzedVideo>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Connecting {
        attempt: u32,
    },
    Connected,
    Disconnected {
        reason: String,
        retry_in: Duration,
    },
    Progress(ProgressUpdate),
    AnalysisCompleted(Result<AnalysisReport, CommandError>),
    CommandAccepted {
        kind: CommandKind,
    },
    CommandFailed {
        kind: CommandKind,
        error: CommandError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct CommandError {
    pub kind: CommandFailureKind,
    pub message: String,
}

impl CommandError {
    pub(crate) fn new(kind: CommandFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Decode,
    Network,
}

impl fmt::Display for CommandFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandFailureKind::InvalidUrl => write!(f, "invalid url"),
            CommandFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            CommandFailureKind::Timeout => write!(f, "timeout"),
            CommandFailureKind::Decode => write!(f, "invalid response"),
            CommandFailureKind::Network => write!(f, "network error"),
        }
    }
}
