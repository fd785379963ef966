//! # Configuration Management
//!
//! Loads application configuration from three layered sources, highest
//! priority last:
//! 1. Built-in defaults (the `Default` impl below)
//! 2. `config.toml` in the working directory, if present
//! 3. Environment variables with the `APP_` prefix
//!    (plus bare `HOST`/`PORT`, which deployment platforms set)
//!
//! Partial runtime updates arrive as JSON through `PUT /api/v1/config` and
//! go through `update_from_json`, which revalidates before accepting.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub audio: AudioConfig,
    pub recording: RecordingConfig,
    pub sink: SinkConfig,
}

/// HTTP/WebSocket server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Audio format parameters applied to every finalized container.
///
/// These are session-fixed configuration, not negotiated per connection;
/// the sensor firmware is flashed to match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

/// Recording session policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Finalize automatically once this many chunks have accumulated.
    /// 0 disables the chunk-count trigger.
    pub expected_chunk_count: usize,

    /// Finalize automatically once this many payload bytes have accumulated.
    /// 0 disables the byte-count trigger.
    pub expected_byte_count: usize,

    /// When the concatenated payload exceeds `expected_byte_count`, trim the
    /// trailing excess before framing. Protects against control text that
    /// slipped through as payload at the end of a capture.
    pub truncate_on_oversize: bool,

    /// Whether audio frames arriving outside the `Recording` state are
    /// buffered opportunistically (true) or dropped (false).
    pub buffer_out_of_session_frames: bool,

    /// Consumer binary frames shorter than this many bytes are interpreted
    /// as control text.
    pub control_frame_threshold: usize,
}

/// Where finalized recordings are delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// `"filesystem"` or `"memory"`.
    pub kind: String,

    /// Output directory for the filesystem sink.
    pub output_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            audio: AudioConfig {
                sample_rate: 16000, // sensor firmware records 16 kHz mono 16-bit
                channels: 1,
                bit_depth: 16,
            },
            recording: RecordingConfig {
                expected_chunk_count: 0,
                expected_byte_count: 0,
                truncate_on_oversize: true,
                buffer_out_of_session_frames: true,
                control_frame_threshold: 32,
            },
            sink: SinkConfig {
                kind: "filesystem".to_string(),
                output_dir: "recordings".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, `config.toml`, and environment.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms set bare HOST/PORT without the APP_ prefix.
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }
        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Check that the loaded values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }
        if self.audio.sample_rate == 0 {
            return Err(anyhow::anyhow!("Sample rate must be greater than 0"));
        }
        if !(1..=2).contains(&self.audio.channels) {
            return Err(anyhow::anyhow!("Channel count must be 1 or 2"));
        }
        if !matches!(self.audio.bit_depth, 8 | 16 | 24 | 32) {
            return Err(anyhow::anyhow!("Bit depth must be 8, 16, 24 or 32"));
        }
        if !(1..=256).contains(&self.recording.control_frame_threshold) {
            return Err(anyhow::anyhow!(
                "Control frame threshold must be between 1 and 256 bytes"
            ));
        }
        if self.sink.kind != "filesystem" && self.sink.kind != "memory" {
            return Err(anyhow::anyhow!(
                "Unknown sink kind '{}' (expected 'filesystem' or 'memory')",
                self.sink.kind
            ));
        }
        Ok(())
    }

    /// Apply a partial update from a JSON document, then revalidate.
    ///
    /// Only fields present in the JSON are touched, so a client can send
    /// just `{"recording": {"expected_byte_count": 163840}}`.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(server) = partial.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = port as u16;
            }
        }

        if let Some(audio) = partial.get("audio") {
            if let Some(rate) = audio.get("sample_rate").and_then(|v| v.as_u64()) {
                self.audio.sample_rate = rate as u32;
            }
            if let Some(channels) = audio.get("channels").and_then(|v| v.as_u64()) {
                self.audio.channels = channels as u16;
            }
            if let Some(depth) = audio.get("bit_depth").and_then(|v| v.as_u64()) {
                self.audio.bit_depth = depth as u16;
            }
        }

        if let Some(recording) = partial.get("recording") {
            if let Some(count) = recording.get("expected_chunk_count").and_then(|v| v.as_u64()) {
                self.recording.expected_chunk_count = count as usize;
            }
            if let Some(bytes) = recording.get("expected_byte_count").and_then(|v| v.as_u64()) {
                self.recording.expected_byte_count = bytes as usize;
            }
            if let Some(truncate) = recording.get("truncate_on_oversize").and_then(|v| v.as_bool()) {
                self.recording.truncate_on_oversize = truncate;
            }
            if let Some(buffer) = recording
                .get("buffer_out_of_session_frames")
                .and_then(|v| v.as_bool())
            {
                self.recording.buffer_out_of_session_frames = buffer;
            }
            if let Some(threshold) = recording
                .get("control_frame_threshold")
                .and_then(|v| v.as_u64())
            {
                self.recording.control_frame_threshold = threshold as usize;
            }
        }

        if let Some(sink) = partial.get("sink") {
            if let Some(kind) = sink.get("kind").and_then(|v| v.as_str()) {
                self.sink.kind = kind.to_string();
            }
            if let Some(dir) = sink.get("output_dir").and_then(|v| v.as_str()) {
                self.sink.output_dir = dir.to_string();
            }
        }

        self.validate()?;
        Ok(())
    }
}

impl RecordingConfig {
    /// Chunk-count trigger, `None` when disabled.
    pub fn chunk_count_trigger(&self) -> Option<usize> {
        (self.expected_chunk_count > 0).then_some(self.expected_chunk_count)
    }

    /// Byte-count trigger, `None` when disabled.
    pub fn byte_count_trigger(&self) -> Option<usize> {
        (self.expected_byte_count > 0).then_some(self.expected_byte_count)
    }
}
