use std::fmt;
use std::str::FromStr;

use crate::{LogSource, ProgressEvent};

/// Backend job kinds that occupy the job slot. Analysis is request/response
/// and never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Download,
    ScrapeImages,
    ScrapeScripts,
    DownloadClip,
    Convert,
}

impl JobKind {
    pub fn log_source(self) -> LogSource {
        match self {
            JobKind::Download => LogSource::Download,
            JobKind::ScrapeImages | JobKind::ScrapeScripts => LogSource::Scraper,
            JobKind::DownloadClip => LogSource::Clips,
            JobKind::Convert => LogSource::Converter,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobKind::Download => "Download",
            JobKind::ScrapeImages => "Image scrape",
            JobKind::ScrapeScripts => "Script scrape",
            JobKind::DownloadClip => "Clip download",
            JobKind::Convert => "Conversion",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityPreset {
    #[default]
    High,
    Medium,
    Fast,
    Ultrafast,
}

impl QualityPreset {
    pub const ALL: [QualityPreset; 4] = [
        QualityPreset::High,
        QualityPreset::Medium,
        QualityPreset::Fast,
        QualityPreset::Ultrafast,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QualityPreset::High => "high",
            QualityPreset::Medium => "medium",
            QualityPreset::Fast => "fast",
            QualityPreset::Ultrafast => "ultrafast",
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownQualityPreset(pub String);

impl fmt::Display for UnknownQualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown quality preset '{}' (expected high, medium, fast or ultrafast)",
            self.0
        )
    }
}

impl std::error::Error for UnknownQualityPreset {}

impl FromStr for QualityPreset {
    type Err = UnknownQualityPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualityPreset::ALL
            .into_iter()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownQualityPreset(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormatInfo {
    pub ext: Option<String>,
    pub quality: Option<String>,
    pub resolution: Option<String>,
    pub filesize: Option<u64>,
}

impl fmt::Display for FormatInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = match self.filesize {
            Some(bytes) if bytes > 0 => format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0)),
            _ => "Unknown Size".to_string(),
        };
        write!(
            f,
            "{} {} ({} - {})",
            self.ext.as_deref().unwrap_or("?"),
            self.quality.as_deref().unwrap_or("Unknown"),
            self.resolution.as_deref().unwrap_or("Unknown Res"),
            size
        )
    }
}

/// A video found by analysis.
///
/// `payload` is the backend's own description of the video and is sent back
/// untouched when the video is downloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub title: String,
    pub formats: Vec<FormatInfo>,
    pub payload: serde_json::Value,
}

/// A fire-and-forget job request.
#[derive(Debug, Clone, PartialEq)]
pub enum JobRequest {
    Download {
        video: VideoInfo,
        format_index: usize,
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
        quality: QualityPreset,
    },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Download { .. } => JobKind::Download,
            JobRequest::ScrapeImages { .. } => JobKind::ScrapeImages,
            JobRequest::ScrapeScripts { .. } => JobKind::ScrapeScripts,
            JobRequest::DownloadClip { .. } => JobKind::DownloadClip,
            JobRequest::Convert { .. } => JobKind::Convert,
        }
    }

    /// Log line narrating the start of the job.
    pub fn narrative(&self) -> String {
        match self {
            JobRequest::Download { video, .. } => format!("Starting download: {}", video.title),
            JobRequest::ScrapeImages { url } => format!("Starting Images scrape for: {url}"),
            JobRequest::ScrapeScripts { url } => format!("Starting Scripts scrape for: {url}"),
            JobRequest::DownloadClip { url } => format!("Starting clip download: {url}"),
            JobRequest::Convert { file_path, quality } => {
                format!("Starting conversion: {file_path} ({quality})")
            }
        }
    }
}

/// Coarse job phase derived from the job slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Busy,
}

/// The single slot a running job occupies.
///
/// `Submitting` is written by the dispatcher when it accepts a request and
/// before the backend reports progress; `Busy` is written only from pushed
/// progress events.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JobSlot {
    #[default]
    Vacant,
    Submitting {
        kind: JobKind,
    },
    Busy {
        /// `None` when progress arrived for a job this client did not submit.
        kind: Option<JobKind>,
        progress: ProgressEvent,
    },
}

impl JobSlot {
    pub fn phase(&self) -> Phase {
        match self {
            JobSlot::Vacant => Phase::Idle,
            JobSlot::Submitting { .. } => Phase::Submitting,
            JobSlot::Busy { .. } => Phase::Busy,
        }
    }

    pub fn is_vacant(&self) -> bool {
        matches!(self, JobSlot::Vacant)
    }

    pub fn kind(&self) -> Option<JobKind> {
        match self {
            JobSlot::Vacant => None,
            JobSlot::Submitting { kind } => Some(*kind),
            JobSlot::Busy { kind, .. } => *kind,
        }
    }

    pub fn progress(&self) -> Option<&ProgressEvent> {
        match self {
            JobSlot::Busy { progress, .. } => Some(progress),
            _ => None,
        }
    }
}
