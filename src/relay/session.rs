//! # Recording Session State Machine
//!
//! Governs one record-to-finalize cycle:
//!
//! ```text
//! Idle --on_start--> Recording --finalize--> Finalizing --> Idle
//! ```
//!
//! Finalization is guarded: a second trigger while one is in flight, or a
//! trigger on an empty buffer, is a logged no-op. Both the explicit stop
//! signal and the configured size/count thresholds funnel into the same
//! `finalize` path, so racing triggers produce exactly one artifact.
//!
//! Out-of-session frame policy: by default audio frames are buffered
//! opportunistically regardless of state (the sensor may start pushing
//! before the start signal round-trips); with
//! `buffer_out_of_session_frames = false` frames outside `Recording` are
//! dropped.

use crate::config::{AudioConfig, RecordingConfig};
use crate::relay::buffer::{BufferSample, SessionBuffer};
use crate::relay::wav::encode_wav;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle state of the current recording cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No recording in progress.
    Idle,
    /// Accumulating audio frames.
    Recording,
    /// Concatenating, framing, and handing off the artifact.
    Finalizing,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Recording => "recording",
            SessionState::Finalizing => "finalizing",
        }
    }
}

/// A finalized recording, ready for sink delivery.
///
/// Immutable once produced: header plus payload, never touched again by the
/// session.
#[derive(Debug, Clone)]
pub struct FinalizedRecording {
    /// Unique ID for this recording cycle.
    pub recording_id: Uuid,
    /// Complete WAV container (44-byte header + PCM payload).
    pub container: Vec<u8>,
    /// PCM payload length in bytes (container length minus header).
    pub pcm_len: usize,
    /// Number of chunks that went into the payload.
    pub chunk_count: usize,
    /// When finalization happened.
    pub recorded_at: DateTime<Utc>,
}

/// State machine driving one audio recording cycle at a time.
pub struct RecordingSession {
    state: SessionState,
    buffer: SessionBuffer,
    audio: AudioConfig,
    policy: RecordingConfig,
}

impl RecordingSession {
    pub fn new(audio: AudioConfig, policy: RecordingConfig) -> Self {
        Self {
            state: SessionState::Idle,
            buffer: SessionBuffer::new(),
            audio,
            policy,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Bytes currently buffered.
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.total_len()
    }

    /// Chunks currently buffered.
    pub fn buffered_chunks(&self) -> usize {
        self.buffer.chunk_count()
    }

    /// Begin a (new) recording. Valid from any state: restarting while
    /// already `Recording` discards what was buffered so far.
    pub fn on_start(&mut self) {
        if !self.buffer.is_empty() {
            info!(
                discarded_chunks = self.buffer.chunk_count(),
                "restarting session, discarding buffered audio"
            );
        }
        self.buffer.reset();
        self.state = SessionState::Recording;
        debug!("session state -> recording");
    }

    /// Accept one audio payload. Returns a finalized recording when this
    /// frame pushed the buffer over a configured threshold.
    pub fn on_audio_frame(&mut self, payload: Vec<u8>) -> Option<FinalizedRecording> {
        if self.state != SessionState::Recording && !self.policy.buffer_out_of_session_frames {
            debug!(
                state = self.state.as_str(),
                len = payload.len(),
                "dropping audio frame outside recording state"
            );
            return None;
        }

        debug!(
            chunk = self.buffer.chunk_count(),
            sample = %BufferSample::of(&payload),
            "audio chunk received"
        );
        self.buffer.append(payload);

        if self.threshold_reached() {
            info!(
                chunks = self.buffer.chunk_count(),
                bytes = self.buffer.total_len(),
                "recording threshold reached, finalizing"
            );
            return self.finalize();
        }
        None
    }

    /// Finalize the current recording: concatenate, optionally truncate,
    /// frame as WAV, clear the buffer, return to `Idle`.
    ///
    /// No-op (with a warning) when the buffer is empty or a finalization is
    /// already in flight; this is what keeps a threshold trigger and an
    /// explicit stop signal firing back-to-back down to one artifact.
    pub fn finalize(&mut self) -> Option<FinalizedRecording> {
        if self.state == SessionState::Finalizing {
            warn!("finalization already in progress, ignoring trigger");
            return None;
        }
        if self.buffer.is_empty() {
            warn!("finalization requested with no buffered audio, ignoring");
            return None;
        }

        self.state = SessionState::Finalizing;
        let chunk_count = self.buffer.chunk_count();
        let mut pcm = self.buffer.concat();
        debug!(sample = %BufferSample::of(&pcm), "raw PCM assembled");

        if self.policy.truncate_on_oversize {
            if let Some(expected) = self.policy.byte_count_trigger() {
                if pcm.len() > expected {
                    debug!(
                        from = pcm.len(),
                        to = expected,
                        "trimming trailing bytes past expected length"
                    );
                    pcm.truncate(expected);
                }
            }
        }

        let pcm_len = pcm.len();
        let container = encode_wav(
            &pcm,
            self.audio.sample_rate,
            self.audio.channels,
            self.audio.bit_depth,
        );

        self.buffer.reset();
        self.state = SessionState::Idle;

        let recording = FinalizedRecording {
            recording_id: Uuid::new_v4(),
            container,
            pcm_len,
            chunk_count,
            recorded_at: Utc::now(),
        };
        info!(
            recording_id = %recording.recording_id,
            chunks = chunk_count,
            container_bytes = recording.container.len(),
            "recording finalized"
        );
        Some(recording)
    }

    fn threshold_reached(&self) -> bool {
        if let Some(count) = self.policy.chunk_count_trigger() {
            if self.buffer.chunk_count() >= count {
                return true;
            }
        }
        if let Some(bytes) = self.policy.byte_count_trigger() {
            if self.buffer.total_len() >= bytes {
                return true;
            }
        }
        false
    }
}
