/// Status carried by a progress event pushed from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Downloading,
    DownloadingSafe,
    Converting,
    Uploading,
    Completed,
    Error,
    /// Informational statuses such as `scanning` or `merging`.
    Other(String),
}

impl Status {
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "downloading" => Status::Downloading,
            "downloading_safe" => Status::DownloadingSafe,
            "converting" => Status::Converting,
            "uploading" => Status::Uploading,
            "completed" => Status::Completed,
            "error" => Status::Error,
            other => Status::Other(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            Status::Downloading => "downloading",
            Status::DownloadingSafe => "downloading_safe",
            Status::Converting => "converting",
            Status::Uploading => "uploading",
            Status::Completed => "completed",
            Status::Error => "error",
            Status::Other(raw) => raw,
        }
    }

    /// True for statuses that mean a job is actively running.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Status::Downloading | Status::DownloadingSafe | Status::Converting | Status::Uploading
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Error)
    }
}

/// Transfer rate as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Speed {
    /// Megabytes per second.
    Measured(f64),
    /// Rate string already formatted by the backend.
    Preformatted(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressEvent {
    pub status: Option<Status>,
    pub percent: Option<f64>,
    pub speed: Option<Speed>,
    pub eta: Option<u64>,
    pub message: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub files: Vec<String>,
}

/// How the orchestrator reacts to a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Busy,
    Completed,
    Failed,
    Informational,
    Ignored,
}

impl ProgressEvent {
    pub fn with_status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn classify(&self) -> EventClass {
        match &self.status {
            Some(status) if status.is_busy() => EventClass::Busy,
            Some(Status::Completed) => EventClass::Completed,
            Some(Status::Error) => EventClass::Failed,
            _ if self.message.is_some() => EventClass::Informational,
            _ => EventClass::Ignored,
        }
    }

    /// Error text for a failed event; the backend normally sets `error`.
    pub fn error_text(&self) -> &str {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("Unknown error")
    }

    pub fn completion_text(&self) -> String {
        match (&self.output, self.files.len()) {
            (Some(output), _) => format!("Completed: {output}"),
            (None, 0) => "Operation completed successfully.".to_string(),
            (None, 1) => "Completed: 1 file saved.".to_string(),
            (None, count) => format!("Completed: {count} files saved."),
        }
    }
}
