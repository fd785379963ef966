//! Recording inspection API: download the most recent finalized artifact.

use crate::error::AppError;
use crate::relay::wav::WavHeader;
use crate::sink::LatestRecordingStore;
use actix_web::{web, HttpResponse};

/// `GET /api/v1/recordings/latest` — serves the newest WAV container with
/// its parsed format metadata in response headers.
pub async fn latest_recording(
    store: web::Data<LatestRecordingStore>,
) -> Result<HttpResponse, AppError> {
    let recording = store
        .latest()
        .ok_or_else(|| AppError::NotFound("No recording has been finalized yet".to_string()))?;

    let header = WavHeader::parse(&recording.container)?;

    Ok(HttpResponse::Ok()
        .content_type("audio/wav")
        .insert_header(("x-recording-timestamp", recording.recorded_at.to_rfc3339()))
        .insert_header(("x-recording-sample-rate", header.sample_rate.to_string()))
        .insert_header(("x-recording-channels", header.channels.to_string()))
        .insert_header(("x-recording-bit-depth", header.bit_depth.to_string()))
        .body(recording.container))
}
