use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    AnalysisReport, AnalyzedVideo, CommandError, CommandFailureKind, CommandRequest, VideoFormat,
};

const ANALYZE_ENDPOINT: &str = "/analyze";

#[derive(Debug, Clone)]
pub struct CommandSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Request path to the backend's command endpoints.
#[async_trait::async_trait]
pub trait CommandTransport: Send + Sync {
    /// Request/response analysis of a URL.
    async fn analyze(&self, url: &str) -> Result<AnalysisReport, CommandError>;

    /// Fire-and-forget job submission. `Ok` only means the backend took the
    /// request; the outcome arrives on the push channel.
    async fn submit(&self, request: &CommandRequest) -> Result<(), CommandError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    settings: CommandSettings,
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(settings: CommandSettings) -> Result<Self, CommandError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| CommandError::new(CommandFailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<reqwest::Url, CommandError> {
        let raw = format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        reqwest::Url::parse(&raw)
            .map_err(|err| CommandError::new(CommandFailureKind::InvalidUrl, err.to_string()))
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Vec<u8>, CommandError> {
        let url = self.endpoint_url(endpoint)?;
        let payload = serde_json::to_vec(body)
            .map_err(|err| CommandError::new(CommandFailureKind::Decode, err.to_string()))?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            let message = error_detail(&bytes).unwrap_or_else(|| status.to_string());
            return Err(CommandError::new(
                CommandFailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl CommandTransport for ReqwestTransport {
    async fn analyze(&self, url: &str) -> Result<AnalysisReport, CommandError> {
        let body = self
            .post_json(ANALYZE_ENDPOINT, &serde_json::json!({ "url": url }))
            .await?;
        parse_analysis(&body)
    }

    async fn submit(&self, request: &CommandRequest) -> Result<(), CommandError> {
        self.post_json(request.kind().endpoint(), &request.body())
            .await
            .map(|_| ())
    }
}

#[derive(Debug, Deserialize)]
struct WireAnalysis {
    #[serde(default)]
    found: bool,
    #[serde(default)]
    videos: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireVideo {
    title: Option<String>,
    formats: Vec<WireFormat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireFormat {
    ext: Option<String>,
    quality: Option<String>,
    resolution: Option<String>,
    filesize: Option<Value>,
}

/// Parse an `/analyze` response body. A video entry whose shape cannot be
/// read is skipped rather than failing the whole analysis.
pub fn parse_analysis(body: &[u8]) -> Result<AnalysisReport, CommandError> {
    let wire: WireAnalysis = serde_json::from_slice(body)
        .map_err(|err| CommandError::new(CommandFailureKind::Decode, err.to_string()))?;
    if !wire.found {
        return Ok(AnalysisReport::default());
    }

    let videos = wire
        .videos
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| {
            let video: WireVideo = serde_json::from_value(raw.clone()).ok()?;
            Some(AnalyzedVideo {
                title: video.title.unwrap_or_else(|| "Unknown Title".to_string()),
                formats: video.formats.into_iter().map(into_format).collect(),
                raw,
            })
        })
        .collect();

    Ok(AnalysisReport {
        found: true,
        videos,
    })
}

fn into_format(wire: WireFormat) -> VideoFormat {
    let filesize = wire.filesize.as_ref().and_then(|value| {
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
    });
    VideoFormat {
        ext: wire.ext,
        quality: wire.quality,
        resolution: wire.resolution,
        filesize,
    }
}

fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value.get("detail")?.as_str().map(str::to_string)
}

fn map_reqwest_error(err: reqwest::Error) -> CommandError {
    if err.is_timeout() {
        return CommandError::new(CommandFailureKind::Timeout, err.to_string());
    }
    CommandError::new(CommandFailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_analysis_has_no_videos() {
        let report = parse_analysis(br#"{"found": false}"#).unwrap();
        assert!(!report.found);
        assert!(report.videos.is_empty());
    }

    #[test]
    fn analysis_keeps_raw_video_and_reads_formats() {
        let body = br#"{"found": true, "videos": [{
            "title": "Clip",
            "url": "https://example.com/v",
            "duration": 12,
            "formats": [
                {"format_id": "18", "ext": "mp4", "quality": "360p", "resolution": "640x360", "filesize": 1048576.0},
                {"format_id": "140", "ext": "m4a", "quality": "(Audio Only)", "resolution": "audio only", "filesize": null}
            ]
        }]}"#;
        let report = parse_analysis(body).unwrap();

        assert_eq!(report.videos.len(), 1);
        let video = &report.videos[0];
        assert_eq!(video.title, "Clip");
        assert_eq!(video.formats[0].filesize, Some(1_048_576));
        assert_eq!(video.formats[1].filesize, None);
        assert_eq!(video.raw["duration"], 12);
        assert_eq!(video.raw["formats"][0]["format_id"], "18");
    }

    #[test]
    fn unreadable_video_entries_are_skipped() {
        let body = br#"{"found": true, "videos": ["oops", {"formats": []}]}"#;
        let report = parse_analysis(body).unwrap();
        assert_eq!(report.videos.len(), 1);
        assert_eq!(report.videos[0].title, "Unknown Title");
    }

    #[test]
    fn garbage_body_is_decode_error() {
        let err = parse_analysis(b"<html>").unwrap_err();
        assert_eq!(err.kind, CommandFailureKind::Decode);
    }
}
