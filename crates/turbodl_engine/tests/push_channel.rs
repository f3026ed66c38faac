use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use turbodl_engine::{EngineEvent, EventSink, PushChannel, PushSettings};

const RETRY: Duration = Duration::from_millis(30);

struct TestSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

fn test_sink() -> (Arc<dyn EventSink>, mpsc::UnboundedReceiver<EngineEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(TestSink { tx }), rx)
}

fn settings(url: String) -> PushSettings {
    PushSettings {
        url,
        reconnect_delay: RETRY,
        connect_timeout: Duration::from_secs(2),
    }
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> EngineEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event within timeout")
        .expect("sink open")
}

/// Collect events until `done` returns true for the collected list.
async fn collect_until(
    rx: &mut mpsc::UnboundedReceiver<EngineEvent>,
    done: impl Fn(&[EngineEvent]) -> bool,
) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while !done(&events) {
        events.push(next_event(rx).await);
    }
    events
}

fn count(events: &[EngineEvent], pred: impl Fn(&EngineEvent) -> bool) -> usize {
    events.iter().filter(|event| pred(event)).count()
}

fn is_connected(event: &EngineEvent) -> bool {
    matches!(event, EngineEvent::Connected)
}

fn is_disconnected(event: &EngineEvent) -> bool {
    matches!(event, EngineEvent::Disconnected { .. })
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    (listener, url)
}

#[tokio::test(flavor = "multi_thread")]
async fn forwards_progress_frames_in_order_and_drops_the_rest() {
    let (listener, url) = bind().await;
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        for frame in [
            r#"{"type":"hello","data":{}}"#,
            "definitely not json",
            r#"{"type":"progress","data":{"status":"downloading","percent":10}}"#,
            r#"{"type":"progress"}"#,
            r#"{"type":"progress","data":{"status":"downloading","percent":20}}"#,
            r#"{"type":"progress","data":{"status":"completed","output":"movie.mp4"}}"#,
        ] {
            ws.send(Message::Text(frame.to_string())).await.unwrap();
        }
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (sink, mut rx) = test_sink();
    let mut channel = PushChannel::new(settings(url), sink, CancellationToken::new());
    channel.connect(&tokio::runtime::Handle::current());

    let events = collect_until(&mut rx, |events| {
        count(events, |e| matches!(e, EngineEvent::Progress(_))) == 3
    })
    .await;
    channel.close();

    assert!(matches!(events[0], EngineEvent::Connecting { attempt: 1 }));
    assert!(matches!(events[1], EngineEvent::Connected));
    let statuses: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Progress(update) => Some((update.status.clone(), update.percent)),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            (Some("downloading".to_string()), Some(10.0)),
            (Some("downloading".to_string()), Some(20.0)),
            (Some("completed".to_string()), None),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn reconnects_after_each_loss_with_fixed_delay() {
    let (listener, url) = bind().await;
    tokio::spawn(async move {
        loop {
            let Ok((tcp, _)) = listener.accept().await else {
                return;
            };
            let Ok(mut ws) = accept_async(tcp).await else {
                continue;
            };
            let _ = ws
                .send(Message::Text(
                    r#"{"type":"progress","data":{"message":"hello"}}"#.to_string(),
                ))
                .await;
            let _ = ws.close(None).await;
            while let Some(Ok(_)) = ws.next().await {}
        }
    });

    let (sink, mut rx) = test_sink();
    let mut channel = PushChannel::new(settings(url), sink, CancellationToken::new());
    channel.connect(&tokio::runtime::Handle::current());

    let events = collect_until(&mut rx, |events| count(events, is_connected) == 4).await;
    channel.close();

    assert_eq!(count(&events, is_disconnected), 3);
    // Each loss is followed by a fresh dial before the next open.
    let mut open = false;
    for event in &events {
        match event {
            EngineEvent::Connected => {
                assert!(!open, "two connections open at once");
                open = true;
            }
            EngineEvent::Disconnected { retry_in, .. } => {
                assert!(open);
                assert_eq!(*retry_in, RETRY);
                open = false;
            }
            _ => {}
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_dials_are_retried_without_loss_events() {
    let (listener, url) = bind().await;
    drop(listener);

    let (sink, mut rx) = test_sink();
    let mut channel = PushChannel::new(settings(url), sink, CancellationToken::new());
    channel.connect(&tokio::runtime::Handle::current());

    let events = collect_until(&mut rx, |events| events.len() == 3).await;
    channel.close();

    let attempts: Vec<_> = events
        .iter()
        .map(|event| match event {
            EngineEvent::Connecting { attempt } => *attempt,
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(attempts, vec![1, 2, 3]);
}

#[tokio::test(flavor = "multi_thread")]
async fn reconnecting_replaces_the_previous_session() {
    let (listener, url) = bind().await;
    let active = Arc::new(AtomicUsize::new(0));
    let server_active = Arc::clone(&active);
    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let active = Arc::clone(&server_active);
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(tcp).await else {
                    return;
                };
                active.fetch_add(1, Ordering::SeqCst);
                while let Some(Ok(message)) = ws.next().await {
                    if message.is_close() {
                        break;
                    }
                }
                active.fetch_sub(1, Ordering::SeqCst);
            });
        }
    });

    let (sink, mut rx) = test_sink();
    let mut channel = PushChannel::new(settings(url), sink, CancellationToken::new());
    let handle = tokio::runtime::Handle::current();
    channel.connect(&handle);
    collect_until(&mut rx, |events| count(events, is_connected) == 1).await;

    channel.connect(&handle);
    channel.connect(&handle);
    collect_until(&mut rx, |events| count(events, is_connected) == 1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(active.load(Ordering::SeqCst), 1);
    assert!(channel.is_active());

    channel.close();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(active.load(Ordering::SeqCst), 0);
    assert!(!channel.is_active());
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_token_stops_the_retry_loop() {
    let (listener, url) = bind().await;
    drop(listener);

    let shutdown = CancellationToken::new();
    let (sink, mut rx) = test_sink();
    let mut channel = PushChannel::new(settings(url), sink, shutdown.clone());
    channel.connect(&tokio::runtime::Handle::current());
    collect_until(&mut rx, |events| !events.is_empty()).await;

    shutdown.cancel();
    tokio::time::sleep(Duration::from_millis(100)).await;
    while rx.try_recv().is_ok() {}
    tokio::time::sleep(RETRY * 4).await;

    assert!(rx.try_recv().is_err());
    assert!(!channel.is_active());
}

#[tokio::test(flavor = "multi_thread")]
async fn replacement_opens_promptly_when_the_old_peer_stops_reading() {
    let (listener, url) = bind().await;
    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(ws) = accept_async(tcp).await else {
                    return;
                };
                // Hold the socket open without ever reading from it.
                tokio::time::sleep(Duration::from_secs(30)).await;
                drop(ws);
            });
        }
    });

    let (sink, mut rx) = test_sink();
    let mut channel = PushChannel::new(
        PushSettings {
            url,
            reconnect_delay: RETRY,
            connect_timeout: Duration::from_millis(300),
        },
        sink,
        CancellationToken::new(),
    );
    let handle = tokio::runtime::Handle::current();
    channel.connect(&handle);
    collect_until(&mut rx, |events| count(events, is_connected) == 1).await;

    let started = std::time::Instant::now();
    channel.connect(&handle);
    collect_until(&mut rx, |events| count(events, is_connected) == 1).await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(channel.is_active());
    channel.close();
}
