//! TurboDL core: pure job-orchestration state machine, session log and view-model helpers.
mod effect;
mod job;
mod log;
mod msg;
mod progress;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use job::{
    FormatInfo, JobKind, JobRequest, JobSlot, Phase, QualityPreset, UnknownQualityPreset,
    VideoInfo,
};
pub use log::{Clock, EventLog, LogEntry, LogSource};
pub use msg::Msg;
pub use progress::{EventClass, ProgressEvent, Speed, Status};
pub use state::{AnalysisState, AppState, LinkState};
pub use update::update;
pub use view_model::{format_eta, format_percent, format_speed, AppViewModel, ProgressView};
