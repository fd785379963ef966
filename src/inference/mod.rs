//! # Inference Collaborator Boundary
//!
//! An optional downstream classifier can be wired onto the relay to label a
//! finalized recording (e.g. keyword vs. noise). No model ships with this
//! crate; what is owned here is the numeric contract every such model needs:
//! decoding little-endian 16-bit PCM, normalizing samples to `[-1.0, 1.0]`
//! floats by dividing by 32768, and windowing them to a fixed frame length.

use crate::error::RelayError;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// A classification result from a downstream model.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

/// Downstream audio classifier.
///
/// Implementations receive normalized `f32` samples for one fixed-size
/// window and return a label with a confidence score.
pub trait AudioClassifier: Send + Sync {
    fn classify(&self, window: &[f32]) -> Result<Classification, RelayError>;

    /// Window length (in samples) this model expects.
    fn frame_len(&self) -> usize;
}

/// Decode raw little-endian 16-bit PCM bytes into samples.
///
/// The byte length must be even; a trailing odd byte means the capture was
/// corrupted.
pub fn decode_pcm_i16(data: &[u8]) -> Result<Vec<i16>, RelayError> {
    if data.len() % 2 != 0 {
        return Err(RelayError::MalformedContainer(
            "PCM byte length must be even for 16-bit samples".to_string(),
        ));
    }
    let mut cursor = Cursor::new(data);
    let mut samples = Vec::with_capacity(data.len() / 2);
    while let Ok(sample) = cursor.read_i16::<LittleEndian>() {
        samples.push(sample);
    }
    Ok(samples)
}

/// Normalize `i16` samples to `[-1.0, 1.0]` floats.
///
/// The divisor is exactly 32768.0, so `i16::MIN` maps to -1.0 and
/// `i16::MAX` to just under 1.0.
pub fn normalize_samples(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// Split normalized samples into fixed-length windows.
///
/// The last window is zero-padded to `frame_len` so a model always sees
/// full frames. An empty input yields no windows.
pub fn window_samples(samples: &[f32], frame_len: usize) -> Vec<Vec<f32>> {
    if frame_len == 0 {
        return Vec::new();
    }
    samples
        .chunks(frame_len)
        .map(|chunk| {
            let mut window = chunk.to_vec();
            window.resize(frame_len, 0.0);
            window
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_little_endian_samples() {
        // 0x0100 = 256, 0xFFFF = -1
        let samples = decode_pcm_i16(&[0x00, 0x01, 0xFF, 0xFF]).unwrap();
        assert_eq!(samples, vec![256, -1]);
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert!(decode_pcm_i16(&[0x00, 0x01, 0xFF]).is_err());
    }

    #[test]
    fn test_normalization_is_exact() {
        let normalized = normalize_samples(&[i16::MIN, 0, 16384, i16::MAX]);
        assert_eq!(normalized[0], -1.0);
        assert_eq!(normalized[1], 0.0);
        assert_eq!(normalized[2], 0.5);
        assert_eq!(normalized[3], 32767.0 / 32768.0);
    }

    #[test]
    fn test_windowing_pads_last_frame() {
        let samples = vec![0.1f32; 5];
        let windows = window_samples(&samples, 2);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], vec![0.1, 0.1]);
        assert_eq!(windows[2], vec![0.1, 0.0]);
    }

    #[test]
    fn test_windowing_empty_input() {
        assert!(window_samples(&[], 4).is_empty());
        assert!(window_samples(&[0.5], 0).is_empty());
    }
}
