//! Health and metrics endpoints.

use crate::relay::Relay;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::{Arc, Mutex};

pub async fn health_check(
    state: web::Data<AppState>,
    relay: web::Data<Arc<Mutex<Relay>>>,
) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = state.get_config();
    let uptime_seconds = state.get_uptime_seconds();
    let relay_status = relay.lock().unwrap().status();

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "service": {
            "name": "sensor-audio-relay",
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "relay": {
            "producer_connected": relay_status.producer_connected,
            "consumer_connected": relay_status.consumer_connected,
            "session_state": relay_status.session_state.as_str(),
            "buffered_chunks": relay_status.buffered_chunks,
            "buffered_bytes": relay_status.buffered_bytes
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "audio_frames_received": metrics.audio_frames_received,
            "recordings_finalized": metrics.recordings_finalized,
            "sink_failures": metrics.sink_failures
        },
        "audio_format": {
            "sample_rate": config.audio.sample_rate,
            "channels": config.audio.channels,
            "bit_depth": config.audio.bit_depth
        }
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats = Vec::new();
    for (endpoint, metric) in metrics.endpoint_metrics.iter() {
        endpoint_stats.push(json!({
            "endpoint": endpoint,
            "request_count": metric.request_count,
            "error_count": metric.error_count,
            "average_duration_ms": if metric.request_count > 0 {
                metric.total_duration_ms as f64 / metric.request_count as f64
            } else {
                0.0
            }
        }));
    }

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "http": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": if metrics.request_count > 0 {
                metrics.error_count as f64 / metrics.request_count as f64
            } else {
                0.0
            },
            "endpoints": endpoint_stats
        },
        "relay": {
            "audio_frames_received": metrics.audio_frames_received,
            "audio_bytes_received": metrics.audio_bytes_received,
            "control_messages": metrics.control_messages,
            "recordings_finalized": metrics.recordings_finalized,
            "sink_failures": metrics.sink_failures
        }
    }))
}
