//! Filesystem sink: writes each finalized recording as
//! `recording_<timestamp>.wav` under a configured directory.

use crate::error::RelayError;
use crate::sink::{RecordingSink, SinkHandle};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct FilesystemSink {
    output_dir: PathBuf,
}

impl FilesystemSink {
    /// Create the sink, ensuring the output directory exists.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, RelayError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    fn artifact_path(&self, recorded_at: DateTime<Utc>) -> PathBuf {
        let name = format!("recording_{}.wav", recorded_at.format("%Y%m%dT%H%M%S%3f"));
        self.output_dir.join(name)
    }
}

impl RecordingSink for FilesystemSink {
    fn deliver(
        &self,
        container: &[u8],
        recorded_at: DateTime<Utc>,
    ) -> Result<SinkHandle, RelayError> {
        let path = self.artifact_path(recorded_at);
        fs::write(&path, container)?;
        debug!(path = %path.display(), bytes = container.len(), "recording written");
        Ok(SinkHandle(path.display().to_string()))
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::wav::encode_wav;

    #[test]
    fn test_writes_container_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FilesystemSink::new(dir.path()).unwrap();
        let container = encode_wav(&[1, 2, 3, 4], 16000, 1, 16);

        let handle = sink.deliver(&container, Utc::now()).unwrap();
        let written = fs::read(&handle.0).unwrap();
        assert_eq!(written, container);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/recordings");
        let sink = FilesystemSink::new(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(sink.deliver(&[0u8; 44], Utc::now()).is_ok());
    }

    #[test]
    fn test_unwritable_target_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FilesystemSink::new(dir.path()).unwrap();
        drop(dir); // directory removed out from under the sink
        assert!(sink.deliver(&[0u8; 44], Utc::now()).is_err());
    }
}
