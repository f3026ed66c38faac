use std::fmt;

use chrono::{DateTime, Local};

/// Who narrated a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    System,
    Info,
    Success,
    Error,
    Analysis,
    Download,
    Scraper,
    Clips,
    Converter,
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogSource::System => "System",
            LogSource::Info => "Info",
            LogSource::Success => "Success",
            LogSource::Error => "Error",
            LogSource::Analysis => "Analysis",
            LogSource::Download => "Download",
            LogSource::Scraper => "Scraper",
            LogSource::Clips => "Clips",
            LogSource::Converter => "Converter",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub source: LogSource,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] {}",
            self.timestamp.format("%H:%M:%S"),
            self.source,
            self.message
        )
    }
}

pub type Clock = fn() -> DateTime<Local>;

/// Append-only session log shown to the user.
///
/// Entries keep insertion order and are never removed; the log lives as long
/// as the process.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    clock: Clock,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_clock(Local::now)
    }
}

impl PartialEq for EventLog {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            entries: Vec::new(),
            clock,
        }
    }

    pub fn append(&mut self, source: LogSource, message: impl Into<String>) {
        self.entries.push(LogEntry {
            timestamp: (self.clock)(),
            source,
            message: message.into(),
        });
    }

    pub fn snapshot(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries appended after the first `offset` ones.
    pub fn since(&self, offset: usize) -> &[LogEntry] {
        self.entries.get(offset..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
