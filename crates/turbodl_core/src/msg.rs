use std::time::Duration;

use crate::{JobKind, JobRequest, ProgressEvent, VideoInfo};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User asked to analyze a URL for downloadable videos.
    AnalyzeRequested { url: String },
    /// Analysis response from the backend, or the transport error text.
    AnalysisFinished(Result<Vec<VideoInfo>, String>),
    /// User submitted a fire-and-forget job.
    SubmitJob(JobRequest),
    /// The backend acknowledged a submitted job.
    CommandAccepted { kind: JobKind },
    /// A submitted job could not be delivered to the backend.
    CommandFailed { kind: JobKind, error: String },
    /// The push channel is attempting to connect.
    Connecting { attempt: u32 },
    /// The push channel opened.
    Connected,
    /// An open push channel dropped; a reconnect follows after `retry_in`.
    ConnectionLost { retry_in: Duration },
    /// A progress event arrived on the push channel.
    Progress(ProgressEvent),
    /// Render tick to coalesce output.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
