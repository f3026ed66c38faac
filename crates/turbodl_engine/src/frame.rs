//! Push-channel frame decoding.
//!
//! The backend sends `{"type": "progress", "data": {...}}` text frames. Field
//! shapes vary between backend scripts (numbers vs preformatted strings,
//! `speed` vs `speed_mb`, counters instead of a percentage), so the payload is
//! read leniently and normalized into a [`ProgressUpdate`].

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{ProgressUpdate, Speed};

const PROGRESS_TYPE: &str = "progress";

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("progress frame has no data object")]
    MissingData,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireProgress {
    status: Value,
    percent: Value,
    speed: Value,
    speed_mb: Value,
    eta: Value,
    message: Value,
    output: Value,
    error: Value,
    files: Value,
    current: Value,
    total: Value,
}

/// Decode one text frame.
///
/// Returns `Ok(None)` for frames whose `type` is not `progress`; those are
/// tolerated for forward compatibility.
pub fn decode_frame(text: &str) -> Result<Option<ProgressUpdate>, FrameError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    if envelope.kind.as_deref() != Some(PROGRESS_TYPE) {
        return Ok(None);
    }
    if !envelope.data.is_object() {
        return Err(FrameError::MissingData);
    }
    let wire: WireProgress = serde_json::from_value(envelope.data)?;
    Ok(Some(normalize(wire)))
}

fn normalize(wire: WireProgress) -> ProgressUpdate {
    let percent = as_f64(&wire.percent)
        .or_else(|| ratio_percent(as_f64(&wire.current), as_f64(&wire.total)))
        .map(|value| value.clamp(0.0, 100.0));
    let speed = as_speed(&wire.speed).or_else(|| as_speed(&wire.speed_mb));

    ProgressUpdate {
        status: as_text(&wire.status),
        percent,
        speed,
        eta: as_eta(&wire.eta),
        message: as_text(&wire.message),
        output: as_text(&wire.output),
        error: as_text(&wire.error),
        files: as_files(&wire.files),
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn ratio_percent(current: Option<f64>, total: Option<f64>) -> Option<f64> {
    match (current, total) {
        (Some(current), Some(total)) if total > 0.0 => Some(current / total * 100.0),
        _ => None,
    }
}

fn as_speed(value: &Value) -> Option<Speed> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .filter(|rate| rate.is_finite())
            .map(Speed::Measured),
        Value::String(text) if !text.trim().is_empty() => Some(Speed::Preformatted(text.clone())),
        _ => None,
    }
}

fn as_eta(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|s| *s >= 0.0).map(|s| s as u64)),
        Value::String(text) => parse_eta_text(text.trim()),
        _ => None,
    }
}

/// Plain seconds, `MM:SS` or `HH:MM:SS`.
fn parse_eta_text(text: &str) -> Option<u64> {
    if let Ok(seconds) = text.parse() {
        return Some(seconds);
    }
    let parts = text
        .split(':')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [minutes, seconds] if *seconds < 60 => Some(minutes * 60 + seconds),
        [hours, minutes, seconds] if *minutes < 60 && *seconds < 60 => {
            Some(hours * 3600 + minutes * 60 + seconds)
        }
        _ => None,
    }
}

fn as_files(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
