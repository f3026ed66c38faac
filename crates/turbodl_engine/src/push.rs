//! Push-channel connection manager.
//!
//! Owns the single websocket session to the backend. A session task connects,
//! forwards decoded progress frames to the registered [`EventSink`] in arrival
//! order, and when an open connection drops waits a fixed delay and connects
//! again. Retrying never gives up on its own; it stops only when the session's
//! [`CancellationToken`] is cancelled.

use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::frame::decode_frame;
use crate::{EngineEvent, EventSink};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct PushSettings {
    pub url: String,
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".to_string(),
            reconnect_delay: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct PushChannel {
    settings: PushSettings,
    sink: Arc<dyn EventSink>,
    shutdown: CancellationToken,
    session: Option<Session>,
}

impl PushChannel {
    /// `shutdown` bounds every session this channel starts.
    pub fn new(
        settings: PushSettings,
        sink: Arc<dyn EventSink>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            settings,
            sink,
            shutdown,
            session: None,
        }
    }

    /// Replace the event consumer. Takes effect on the next `connect`.
    pub fn on_event(&mut self, sink: Arc<dyn EventSink>) {
        self.sink = sink;
    }

    /// Start a session, replacing any running one.
    ///
    /// The new session does not dial until the previous task has exited, so at
    /// most one connection is ever open.
    pub fn connect(&mut self, runtime: &tokio::runtime::Handle) {
        let previous = self.stop_session();
        let cancel = self.shutdown.child_token();
        let settings = self.settings.clone();
        let sink = Arc::clone(&self.sink);
        let session_cancel = cancel.clone();

        let task = runtime.spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            run_session_loop(&settings, sink.as_ref(), &session_cancel).await;
        });

        self.session = Some(Session { cancel, task });
    }

    /// Stop the session. No reconnect follows.
    pub fn close(&mut self) {
        if self.stop_session().is_some() {
            engine_info!("Push channel closed by client");
        }
    }

    pub fn is_active(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.task.is_finished())
    }

    fn stop_session(&mut self) -> Option<JoinHandle<()>> {
        let session = self.session.take()?;
        session.cancel.cancel();
        Some(session.task)
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.stop_session();
    }
}

enum SessionEnd {
    Cancelled,
    Lost(String),
}

async fn run_session_loop(settings: &PushSettings, sink: &dyn EventSink, cancel: &CancellationToken) {
    let mut attempt = 0u32;

    loop {
        attempt = attempt.saturating_add(1);
        emit(sink, cancel, EngineEvent::Connecting { attempt });

        let connected = tokio::select! {
            _ = cancel.cancelled() => return,
            result = tokio::time::timeout(settings.connect_timeout, connect_async(settings.url.as_str())) => result,
        };

        match connected {
            Ok(Ok((stream, _response))) => {
                engine_info!("Push channel connected to {}", settings.url);
                emit(sink, cancel, EngineEvent::Connected);
                attempt = 0;

                match read_frames(stream, settings, sink, cancel).await {
                    SessionEnd::Cancelled => return,
                    SessionEnd::Lost(reason) => {
                        engine_warn!(
                            "Push channel lost ({}), reconnecting in {:?}",
                            reason,
                            settings.reconnect_delay
                        );
                        emit(
                            sink,
                            cancel,
                            EngineEvent::Disconnected {
                                reason,
                                retry_in: settings.reconnect_delay,
                            },
                        );
                    }
                }
            }
            Ok(Err(err)) => {
                engine_warn!(
                    "Push channel connect attempt {} to {} failed: {}",
                    attempt,
                    settings.url,
                    err
                );
            }
            Err(_) => {
                engine_warn!(
                    "Push channel connect attempt {} to {} timed out",
                    attempt,
                    settings.url
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(settings.reconnect_delay) => {}
        }
    }
}

async fn read_frames(
    mut stream: WsStream,
    settings: &PushSettings,
    sink: &dyn EventSink,
    cancel: &CancellationToken,
) -> SessionEnd {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            next = stream.next() => Some(next),
        };
        let Some(next) = next else {
            // A replacement session waits for this task to exit.
            if tokio::time::timeout(settings.connect_timeout, stream.close(None))
                .await
                .is_err()
            {
                engine_warn!("Push channel close handshake timed out; dropping connection");
            }
            return SessionEnd::Cancelled;
        };

        match next {
            Some(Ok(Message::Text(text))) => handle_text(&text, sink, cancel),
            Some(Ok(Message::Close(frame))) => {
                return SessionEnd::Lost(format!("closed by backend: {frame:?}"));
            }
            Some(Ok(_)) => {
                // Ping/pong are answered by tungstenite; binary frames carry nothing for us.
            }
            Some(Err(err)) => return SessionEnd::Lost(err.to_string()),
            None => return SessionEnd::Lost("stream ended".to_string()),
        }
    }
}

fn handle_text(text: &str, sink: &dyn EventSink, cancel: &CancellationToken) {
    match decode_frame(text) {
        Ok(Some(update)) => emit(sink, cancel, EngineEvent::Progress(update)),
        Ok(None) => engine_debug!("Ignoring non-progress push frame"),
        Err(err) => engine_debug!("Dropping malformed push frame: {}", err),
    }
}

/// Events are suppressed once the session is cancelled so a closed channel
/// stays silent.
fn emit(sink: &dyn EventSink, cancel: &CancellationToken, event: EngineEvent) {
    if !cancel.is_cancelled() {
        sink.emit(event);
    }
}
