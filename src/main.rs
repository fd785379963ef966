//! # Sensor Audio Relay — Entry Point
//!
//! Boots an actix-web server hosting:
//! - `GET /ws` — WebSocket endpoint for the sensor (Producer, identified by
//!   an `ESP32` marker in the URI) and the dashboard (Consumer)
//! - `GET /health` — service health, relay status, session state
//! - `GET /api/v1/metrics` — detailed counters
//! - `GET`/`PUT /api/v1/config` — live configuration
//! - `GET /api/v1/recordings/latest` — newest finalized WAV container
//!
//! The relay itself is single-session: one producer, one consumer, one
//! recording at a time. See `relay/` for the pipeline.

mod config;
mod error;
mod handlers;
mod health;
mod inference;
mod middleware;
mod relay;
mod sink;
mod state;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Result;
use config::AppConfig;
use relay::socket::relay_websocket;
use relay::Relay;
use sink::{FilesystemSink, LatestRecordingStore, MemorySink, RecordingSink};
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Set by the signal handler task; polled by the shutdown waiter.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting sensor-audio-relay v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: {}:{}, sink '{}'",
        config.server.host, config.server.port, config.sink.kind
    );

    let app_state = AppState::new(config.clone());
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    let latest = LatestRecordingStore::new();
    let recording_sink: Arc<dyn RecordingSink> = match config.sink.kind.as_str() {
        "memory" => Arc::new(MemorySink::new(latest.clone())),
        _ => Arc::new(FilesystemSink::new(&config.sink.output_dir)?),
    };
    let relay = Arc::new(Mutex::new(Relay::new(
        app_state.clone(),
        recording_sink,
        latest.clone(),
    )));

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::Data::new(relay.clone()))
            .app_data(web::Data::new(latest.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .route("/ws", web::get().to(relay_websocket))
            .route("/ws/{tail:.*}", web::get().to(relay_websocket))
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
                    .route("/config", web::get().to(handlers::get_config))
                    .route("/config", web::put().to(handlers::update_config))
                    .route("/recordings/latest", web::get().to(handlers::latest_recording)),
            )
            .route("/health", web::get().to(health::health_check))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sensor_audio_relay=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Install SIGTERM/SIGINT handlers that flip the shutdown flag.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
