use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use turbodl_engine::{
    CommandFailureKind, CommandRequest, CommandSettings, CommandTransport, ReqwestTransport,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport_for(server: &MockServer) -> ReqwestTransport {
    ReqwestTransport::new(CommandSettings {
        base_url: server.uri(),
        ..CommandSettings::default()
    })
    .expect("transport")
}

#[tokio::test]
async fn each_job_kind_posts_its_payload_to_its_endpoint() {
    let server = MockServer::start().await;
    let video = json!({ "title": "Clip", "url": "https://example.com/v", "formats": [] });
    let cases = vec![
        (
            CommandRequest::Download {
                video: video.clone(),
                format_idx: 2,
            },
            "/download",
            json!({ "video": video, "format_idx": 2 }),
        ),
        (
            CommandRequest::ScrapeImages {
                url: "https://example.com".into(),
            },
            "/scrape-images",
            json!({ "url": "https://example.com" }),
        ),
        (
            CommandRequest::ScrapeScripts {
                url: "https://example.com".into(),
            },
            "/scrape-scripts",
            json!({ "url": "https://example.com" }),
        ),
        (
            CommandRequest::DownloadClip {
                url: "https://youtube.com/clip/abc".into(),
            },
            "/download-clip",
            json!({ "url": "https://youtube.com/clip/abc" }),
        ),
        (
            CommandRequest::Convert {
                file_path: "/videos/movie.mkv".into(),
                quality: "ultrafast".into(),
            },
            "/convert",
            json!({ "file_path": "/videos/movie.mkv", "quality": "ultrafast" }),
        ),
    ];

    for (_, endpoint, body) in &cases {
        Mock::given(method("POST"))
            .and(path(*endpoint))
            .and(header("content-type", "application/json"))
            .and(body_json(body.clone()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "status": "started" })),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let transport = transport_for(&server);
    for (request, _, _) in &cases {
        transport.submit(request).await.expect("submit ok");
    }
    server.verify().await;
}

#[tokio::test]
async fn rejected_submission_reports_status_and_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "detail": "file_path missing" })),
        )
        .mount(&server)
        .await;

    let err = transport_for(&server)
        .submit(&CommandRequest::Convert {
            file_path: String::new(),
            quality: "high".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, CommandFailureKind::HttpStatus(422));
    assert_eq!(err.message, "file_path missing");
    assert_eq!(err.to_string(), "http status 422: file_path missing");
}

#[tokio::test]
async fn unreachable_backend_is_network_failure() {
    let transport = ReqwestTransport::new(CommandSettings {
        base_url: "http://127.0.0.1:9".to_string(),
        connect_timeout: Duration::from_millis(500),
        ..CommandSettings::default()
    })
    .unwrap();

    let err = transport
        .submit(&CommandRequest::ScrapeImages {
            url: "https://example.com".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind,
        CommandFailureKind::Network | CommandFailureKind::Timeout
    ));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download-clip"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(250)))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(CommandSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..CommandSettings::default()
    })
    .unwrap();

    let err = transport
        .submit(&CommandRequest::DownloadClip {
            url: "https://youtube.com/clip/x".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, CommandFailureKind::Timeout);
}

#[tokio::test]
async fn analyze_returns_videos_from_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .and(body_json(json!({ "url": "https://example.com/watch" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "found": true,
            "videos": [{
                "title": "Trailer",
                "url": "https://example.com/watch",
                "formats": [
                    { "format_id": "22", "ext": "mp4", "quality": "720p", "resolution": "1280x720", "filesize": 5242880 }
                ]
            }]
        })))
        .mount(&server)
        .await;

    let report = transport_for(&server)
        .analyze("https://example.com/watch")
        .await
        .expect("analysis");
    assert!(report.found);
    assert_eq!(report.videos.len(), 1);
    assert_eq!(report.videos[0].title, "Trailer");
    assert_eq!(report.videos[0].formats[0].resolution.as_deref(), Some("1280x720"));
    assert_eq!(report.videos[0].raw["formats"][0]["format_id"], "22");
}

#[tokio::test]
async fn analyze_server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "Unsupported URL" })))
        .mount(&server)
        .await;

    let err = transport_for(&server)
        .analyze("ftp://nope")
        .await
        .unwrap_err();
    assert_eq!(err.kind, CommandFailureKind::HttpStatus(500));
    assert_eq!(err.message, "Unsupported URL");
}
