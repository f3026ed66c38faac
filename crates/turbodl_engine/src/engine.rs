use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::commands::{CommandSettings, CommandTransport, ReqwestTransport};
use crate::push::{PushChannel, PushSettings};
use crate::sink::ChannelEventSink;
use crate::{CommandError, CommandRequest, EngineEvent, EventSink};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub commands: CommandSettings,
    pub push: PushSettings,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to build command transport: {0}")]
    Transport(#[from] CommandError),
}

enum EngineCommand {
    Connect,
    Analyze { url: String },
    Submit(CommandRequest),
    Shutdown,
}

/// Handle to the IO side: one push-channel session plus command requests,
/// all driven on a private tokio runtime. Events come back in the order the
/// engine produced them.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Option<mpsc::Receiver<EngineEvent>>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let transport: Arc<dyn CommandTransport> =
            Arc::new(ReqwestTransport::new(config.commands)?);
        Self::with_transport(config.push, transport)
    }

    /// Build an engine around any command transport.
    pub fn with_transport(
        push: PushSettings,
        transport: Arc<dyn CommandTransport>,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("turbodl-engine")
            .enable_all()
            .build()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx));

        thread::spawn(move || {
            let shutdown = CancellationToken::new();
            let mut push = PushChannel::new(push, Arc::clone(&sink), shutdown.clone());

            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Connect => push.connect(runtime.handle()),
                    EngineCommand::Analyze { url } => {
                        let transport = Arc::clone(&transport);
                        let sink = Arc::clone(&sink);
                        runtime.spawn(async move {
                            let result = transport.analyze(&url).await;
                            if let Err(err) = &result {
                                engine_warn!("Analysis of {} failed: {}", url, err);
                            }
                            sink.emit(EngineEvent::AnalysisCompleted(result));
                        });
                    }
                    EngineCommand::Submit(request) => {
                        let transport = Arc::clone(&transport);
                        let sink = Arc::clone(&sink);
                        runtime.spawn(async move {
                            handle_submit(transport.as_ref(), request, sink.as_ref()).await;
                        });
                    }
                    EngineCommand::Shutdown => break,
                }
            }

            shutdown.cancel();
            push.close();
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
            engine_info!("Engine stopped");
        });

        Ok(Self {
            cmd_tx,
            event_rx: Some(event_rx),
        })
    }

    /// Open (or reopen) the push channel.
    pub fn connect(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Connect);
    }

    pub fn analyze(&self, url: impl Into<String>) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::Analyze { url: url.into() });
    }

    pub fn submit(&self, request: CommandRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Submit(request));
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.as_ref()?.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.as_ref()?.recv_timeout(timeout).ok()
    }

    /// Hand the event stream to another thread. Afterwards `try_recv` and
    /// `recv_timeout` on the handle return `None`.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<EngineEvent>> {
        self.event_rx.take()
    }

    /// Stop the push channel and the runtime. Pending requests are dropped.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn handle_submit(transport: &dyn CommandTransport, request: CommandRequest, sink: &dyn EventSink) {
    let kind = request.kind();
    match transport.submit(&request).await {
        Ok(()) => {
            engine_info!("Backend accepted {:?} request", kind);
            sink.emit(EngineEvent::CommandAccepted { kind });
        }
        Err(error) => {
            engine_warn!("{:?} request failed: {}", kind, error);
            sink.emit(EngineEvent::CommandFailed { kind, error });
        }
    }
}
