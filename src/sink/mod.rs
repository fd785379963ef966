//! # Recording Sinks
//!
//! A sink is the external collaborator that receives a finalized container.
//! Delivery is best-effort and at-most-once: the relay dispatches one
//! delivery per recording, logs the outcome, and never retries. A failing
//! sink does not disturb session state.

mod file;
mod memory;

pub use file::FilesystemSink;
pub use memory::{LatestRecordingStore, MemorySink};

use crate::error::RelayError;
use chrono::{DateTime, Utc};

/// Where a delivered recording ended up, for logging and API responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkHandle(pub String);

/// Delivery target for finalized WAV containers.
pub trait RecordingSink: Send + Sync {
    /// Deliver one container. `recorded_at` is the finalization timestamp,
    /// used by sinks that derive artifact names from it.
    fn deliver(
        &self,
        container: &[u8],
        recorded_at: DateTime<Utc>,
    ) -> Result<SinkHandle, RelayError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
