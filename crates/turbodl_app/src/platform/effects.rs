use std::io::Write;
use std::sync::mpsc;
use std::thread;

use engine_logging::{engine_debug, engine_info, engine_warn};
use turbodl_core::{
    Effect, FormatInfo, JobKind, JobRequest, Msg, ProgressEvent, Speed, Status, VideoInfo,
};
use turbodl_engine::{
    AnalyzedVideo, CommandKind, CommandRequest, EngineConfig, EngineError, EngineEvent,
    EngineHandle, ProgressUpdate, VideoFormat,
};

/// Surfaces a finished-task notification to the user. Best effort.
pub trait Notifier {
    fn notify(&self, title: &str, body: &str) -> std::io::Result<()>;
}

/// Highlighted line plus terminal bell.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, title: &str, body: &str) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "\x07\x1b[1;32m*** {title}: {body} ***\x1b[0m")?;
        out.flush()
    }
}

/// Runs core effects against the engine and feeds engine events back as `Msg`s.
pub struct EffectRunner {
    engine: EngineHandle,
    notifier: Box<dyn Notifier>,
}

impl EffectRunner {
    pub fn new(
        config: EngineConfig,
        msg_tx: mpsc::Sender<Msg>,
        notifier: Box<dyn Notifier>,
    ) -> Result<Self, EngineError> {
        let mut engine = EngineHandle::new(config)?;
        if let Some(events) = engine.take_events() {
            spawn_event_bridge(events, msg_tx);
        }
        engine.connect();
        Ok(Self { engine, notifier })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Analyze { url } => {
                    engine_info!("Analyze url_len={} url={}", url.len(), url);
                    self.engine.analyze(url);
                }
                Effect::IssueCommand(request) => {
                    let command = to_command(request);
                    let kind = command.kind();
                    engine_info!("Submitting {:?} to {}", kind, kind.endpoint());
                    self.engine.submit(command);
                }
                Effect::Notify { title, body } => {
                    if let Err(err) = self.notifier.notify(&title, &body) {
                        engine_warn!("Notification '{}' not shown: {}", title, err);
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.engine.shutdown();
    }
}

fn spawn_event_bridge(events: mpsc::Receiver<EngineEvent>, msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        while let Ok(event) = events.recv() {
            if msg_tx.send(map_event(event)).is_err() {
                break;
            }
        }
        engine_debug!("Engine event stream closed");
    });
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Connecting { attempt } => Msg::Connecting { attempt },
        EngineEvent::Connected => Msg::Connected,
        EngineEvent::Disconnected { retry_in, .. } => Msg::ConnectionLost { retry_in },
        EngineEvent::Progress(update) => Msg::Progress(map_progress(update)),
        EngineEvent::AnalysisCompleted(result) => Msg::AnalysisFinished(
            result
                .map(|report| report.videos.into_iter().map(map_video).collect())
                .map_err(|err| err.to_string()),
        ),
        EngineEvent::CommandAccepted { kind } => {
            engine_debug!("Backend acknowledged {:?}", kind);
            Msg::CommandAccepted {
                kind: map_kind(kind),
            }
        }
        EngineEvent::CommandFailed { kind, error } => {
            engine_warn!("{:?} was not delivered: {}", kind, error);
            Msg::CommandFailed {
                kind: map_kind(kind),
                error: error.to_string(),
            }
        }
    }
}

fn map_progress(update: ProgressUpdate) -> ProgressEvent {
    ProgressEvent {
        status: update.status.as_deref().map(Status::from_wire),
        percent: update.percent,
        speed: update.speed.map(|speed| match speed {
            turbodl_engine::Speed::Measured(mb) => Speed::Measured(mb),
            turbodl_engine::Speed::Preformatted(text) => Speed::Preformatted(text),
        }),
        eta: update.eta,
        message: update.message,
        output: update.output,
        error: update.error,
        files: update.files,
    }
}

fn map_kind(kind: CommandKind) -> JobKind {
    match kind {
        CommandKind::Download => JobKind::Download,
        CommandKind::ScrapeImages => JobKind::ScrapeImages,
        CommandKind::ScrapeScripts => JobKind::ScrapeScripts,
        CommandKind::DownloadClip => JobKind::DownloadClip,
        CommandKind::Convert => JobKind::Convert,
    }
}

fn map_video(video: AnalyzedVideo) -> VideoInfo {
    VideoInfo {
        title: video.title,
        formats: video.formats.into_iter().map(map_format).collect(),
        payload: video.raw,
    }
}

fn map_format(format: VideoFormat) -> FormatInfo {
    FormatInfo {
        ext: format.ext,
        quality: format.quality,
        resolution: format.resolution,
        filesize: format.filesize,
    }
}

fn to_command(request: JobRequest) -> CommandRequest {
    match request {
        JobRequest::Download {
            video,
            format_index,
        } => CommandRequest::Download {
            video: video.payload,
            format_idx: format_index,
        },
        JobRequest::ScrapeImages { url } => CommandRequest::ScrapeImages { url },
        JobRequest::ScrapeScripts { url } => CommandRequest::ScrapeScripts { url },
        JobRequest::DownloadClip { url } => CommandRequest::DownloadClip { url },
        JobRequest::Convert { file_path, quality } => CommandRequest::Convert {
            file_path,
            quality: quality.as_str().to_string(),
        },
    }
}
