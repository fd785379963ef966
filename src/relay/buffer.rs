//! # Session Buffer
//!
//! An ordered, append-only collection of the binary payloads received during
//! one recording session. Append order is playback order; the buffer never
//! reorders or deduplicates. Total length is tracked incrementally so the
//! threshold check on every frame stays O(1).

use std::fmt;

/// Ordered chunk storage for the current recording session.
#[derive(Debug, Default)]
pub struct SessionBuffer {
    chunks: Vec<Vec<u8>>,
    total_len: usize,
}

impl SessionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all chunks. Safe to call at any time; calling on an empty
    /// buffer is a no-op.
    pub fn reset(&mut self) {
        self.chunks.clear();
        self.total_len = 0;
    }

    /// Append one payload in arrival order.
    pub fn append(&mut self, payload: Vec<u8>) {
        self.total_len += payload.len();
        self.chunks.push(payload);
    }

    /// Sum of all buffered payload lengths, in bytes.
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Number of buffered chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Concatenate all chunks into one contiguous byte sequence, in append
    /// order.
    pub fn concat(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }
}

/// Compact summary of a byte buffer for debug logging: length, head/tail hex
/// samples, and whether every byte is zero (a silent capture).
pub struct BufferSample<'a> {
    data: &'a [u8],
}

impl<'a> BufferSample<'a> {
    pub fn of(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn is_silent(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for BufferSample<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.data.len() < 10 {
            return write!(f, "{} bytes [{}]", self.data.len(), Self::hex(self.data));
        }
        let head = Self::hex(&self.data[..8]);
        let tail = Self::hex(&self.data[self.data.len() - 8..]);
        write!(
            f,
            "{} bytes, silent={}, head={}..., tail=...{}",
            self.data.len(),
            self.is_silent(),
            head,
            tail
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_is_idempotent() {
        let mut buffer = SessionBuffer::new();
        buffer.append(vec![1, 2, 3]);
        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.total_len(), 0);
        // Second reset on an already-empty buffer.
        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.total_len(), 0);
    }

    #[test]
    fn test_concat_preserves_append_order() {
        let mut buffer = SessionBuffer::new();
        buffer.append(vec![1, 2]);
        buffer.append(vec![]);
        buffer.append(vec![3]);
        buffer.append(vec![4, 5, 6]);
        assert_eq!(buffer.concat(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(buffer.chunk_count(), 4);
    }

    #[test]
    fn test_concat_of_empty_buffer() {
        let buffer = SessionBuffer::new();
        assert_eq!(buffer.concat(), Vec::<u8>::new());
    }

    #[test]
    fn test_total_len_tracks_appends() {
        let mut buffer = SessionBuffer::new();
        for i in 0..10 {
            buffer.append(vec![0u8; i]);
        }
        assert_eq!(buffer.total_len(), (0..10).sum::<usize>());
        assert_eq!(buffer.total_len(), buffer.concat().len());
    }

    #[test]
    fn test_buffer_sample_silence_detection() {
        let silent = vec![0u8; 64];
        assert!(BufferSample::of(&silent).is_silent());
        let mut noisy = silent.clone();
        noisy[63] = 1;
        assert!(!BufferSample::of(&noisy).is_silent());
    }

    #[test]
    fn test_buffer_sample_short_display() {
        let rendered = format!("{}", BufferSample::of(&[0xAB, 0xCD]));
        assert!(rendered.contains("abcd"));
    }
}
