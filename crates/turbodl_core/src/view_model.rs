use crate::{JobKind, LinkState, Phase, ProgressEvent, Speed};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub phase: Phase,
    pub job_kind: Option<JobKind>,
    pub progress: Option<ProgressView>,
    pub link: LinkState,
    pub scanning: bool,
    pub video_count: usize,
    pub log_len: usize,
    pub notifications_sent: u64,
    pub dirty: bool,
}

impl AppViewModel {
    /// True while submissions are refused.
    pub fn working(&self) -> bool {
        self.phase != Phase::Idle
    }
}

/// Display strings for the current progress snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub status_label: String,
    pub percent: String,
    pub speed: String,
    pub eta: String,
    pub message: Option<String>,
}

impl ProgressView {
    pub fn from_event(event: &ProgressEvent) -> Self {
        Self {
            status_label: event
                .status
                .as_ref()
                .map(|status| status_label(status.as_wire()))
                .unwrap_or_default(),
            percent: format_percent(event.percent),
            speed: format_speed(event.speed.as_ref()),
            eta: format_eta(event.eta),
            message: event.message.clone(),
        }
    }

    /// Single status line, e.g. `DOWNLOADING 42.5% 3.10 MB/s 10s rem`.
    pub fn line(&self) -> String {
        [
            self.status_label.as_str(),
            self.percent.as_str(),
            self.speed.as_str(),
            self.eta.as_str(),
            self.message.as_deref().unwrap_or(""),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

fn status_label(raw: &str) -> String {
    raw.to_uppercase().replace('_', " ")
}

pub fn format_percent(percent: Option<f64>) -> String {
    match percent {
        Some(value) if value > 0.0 => format!("{value:.1}%"),
        _ => "0%".to_string(),
    }
}

pub fn format_speed(speed: Option<&Speed>) -> String {
    match speed {
        Some(Speed::Measured(mb_per_sec)) if *mb_per_sec > 0.0 => {
            format!("{mb_per_sec:.2} MB/s")
        }
        Some(Speed::Preformatted(text)) => text.clone(),
        _ => String::new(),
    }
}

pub fn format_eta(eta: Option<u64>) -> String {
    match eta {
        Some(seconds) if seconds > 0 => format!("{seconds}s rem"),
        _ => String::new(),
    }
}
