//! TurboDL engine: push-channel connection, frame decoding and backend command requests.
mod commands;
mod engine;
mod frame;
mod push;
mod sink;
mod types;

pub use commands::{parse_analysis, CommandSettings, CommandTransport, ReqwestTransport};
pub use engine::{EngineConfig, EngineError, EngineHandle};
pub use frame::{decode_frame, FrameError};
pub use push::{PushChannel, PushSettings};
pub use sink::{ChannelEventSink, EventSink};
pub use types::{
    AnalysisReport, AnalyzedVideo, CommandError, CommandFailureKind, CommandKind, CommandRequest,
    EngineEvent, ProgressUpdate, Speed, VideoFormat,
};
