use crate::view_model::{AppViewModel, ProgressView};
use crate::{EventLog, JobKind, JobSlot, LogSource, ProgressEvent, VideoInfo};

/// Push-channel state as seen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Connecting,
    Open,
    Reconnecting,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AnalysisState {
    #[default]
    Idle,
    Scanning {
        url: String,
    },
    Ready {
        videos: Vec<VideoInfo>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    slot: JobSlot,
    log: EventLog,
    link: LinkState,
    analysis: AnalysisState,
    notifications_sent: u64,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            phase: self.slot.phase(),
            job_kind: self.slot.kind(),
            progress: self.slot.progress().map(ProgressView::from_event),
            link: self.link,
            scanning: matches!(self.analysis, AnalysisState::Scanning { .. }),
            video_count: self.videos().len(),
            log_len: self.log.len(),
            notifications_sent: self.notifications_sent,
            dirty: self.dirty,
        }
    }

    pub fn slot(&self) -> &JobSlot {
        &self.slot
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn analysis(&self) -> &AnalysisState {
        &self.analysis
    }

    pub fn videos(&self) -> &[VideoInfo] {
        match &self.analysis {
            AnalysisState::Ready { videos } => videos,
            _ => &[],
        }
    }

    /// Returns whether anything changed since the last call and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn append_log(&mut self, source: LogSource, message: impl Into<String>) {
        self.log.append(source, message);
        self.mark_dirty();
    }

    pub(crate) fn set_link(&mut self, link: LinkState) {
        if self.link != link {
            self.link = link;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_analysis(&mut self, analysis: AnalysisState) {
        self.analysis = analysis;
        self.mark_dirty();
    }

    pub(crate) fn reserve_slot(&mut self, kind: JobKind) {
        self.slot = JobSlot::Submitting { kind };
        self.mark_dirty();
    }

    /// Level-triggered: every busy-class event re-asserts `Busy` and replaces
    /// the snapshot.
    pub(crate) fn enter_busy(&mut self, progress: ProgressEvent) {
        let kind = self.slot.kind();
        self.slot = JobSlot::Busy { kind, progress };
        self.mark_dirty();
    }

    /// Frees the slot, returning what occupied it.
    pub(crate) fn release_slot(&mut self) -> JobSlot {
        let previous = std::mem::take(&mut self.slot);
        if !previous.is_vacant() {
            self.mark_dirty();
        }
        previous
    }

    pub(crate) fn record_notification(&mut self) {
        self.notifications_sent += 1;
        self.mark_dirty();
    }
}
