//! # Control Token Vocabulary
//!
//! The relay speaks a tiny plain-text protocol with both peers. Tokens are
//! exact strings, case-sensitive, compared after whitespace trimming.
//!
//! ## Token Table:
//! - `START_RECORDING_REQUEST` / `START`: Consumer asks for a recording;
//!   the relay forwards `START` to the Producer.
//! - `END_RECORDING` / `STOP`: Producer signals the end of a recording.
//! - `ESP32_CONNECTED`: Producer identification handshake (acknowledged, no effect).
//! - `UPLOAD_COMPLETE`: sent to the Consumer once a recording has been finalized.

/// Consumer-side request to begin a recording session.
pub const START_RECORDING_REQUEST: &str = "START_RECORDING_REQUEST";

/// Short form of the start request; also what the relay forwards to the Producer.
pub const START: &str = "START";

/// Producer-side end-of-recording signal.
pub const END_RECORDING: &str = "END_RECORDING";

/// Short form of the end-of-recording signal.
pub const STOP: &str = "STOP";

/// Producer identification handshake token.
pub const SENSOR_CONNECTED: &str = "ESP32_CONNECTED";

/// Completion notice sent to the Consumer after finalization.
pub const UPLOAD_COMPLETE: &str = "UPLOAD_COMPLETE";

/// Error payload returned to the Consumer when no Producer is connected.
pub const ERR_NO_PRODUCER: &str = "ERROR: ESP32 not connected.";

/// A parsed control token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlSignal {
    /// Begin a new recording session.
    StartRequest,
    /// Finalize the current recording session.
    Stop,
    /// Producer identification handshake.
    Identify,
    /// Anything else; carried verbatim for logging.
    Unknown(String),
}

impl ControlSignal {
    /// Parse a trimmed control string into a signal.
    pub fn parse(token: &str) -> Self {
        match token {
            START_RECORDING_REQUEST | START => ControlSignal::StartRequest,
            END_RECORDING | STOP => ControlSignal::Stop,
            SENSOR_CONNECTED => ControlSignal::Identify,
            other => ControlSignal::Unknown(other.to_string()),
        }
    }

    /// True for the tokens a Producer may legitimately send as a binary frame.
    ///
    /// Sensor firmware often cannot emit text frames, so its control tokens
    /// arrive flagged binary and must be recognized by exact content match.
    pub fn is_producer_token(token: &str) -> bool {
        matches!(token, END_RECORDING | STOP | SENSOR_CONNECTED)
    }
}
