//! # WAV Container Framing
//!
//! Wraps raw linear-PCM bytes in a minimal self-describing RIFF/WAVE
//! container: a fixed 44-byte header followed by the payload. All multi-byte
//! fields are little-endian. The header layout is the canonical minimal
//! variant (format chunk size 16, format code 1), so total length is always
//! `44 + payload`.

use crate::error::RelayError;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Fixed header length of the minimal PCM container.
pub const WAV_HEADER_LEN: usize = 44;

/// Linear PCM format code in the `fmt ` chunk.
const FORMAT_PCM: u16 = 1;

/// Encode raw PCM bytes as a standalone WAV file.
///
/// Deterministic and total: an empty payload yields a valid 44-byte
/// container. The input is never mutated.
pub fn encode_wav(pcm: &[u8], sample_rate: u32, channels: u16, bit_depth: u16) -> Vec<u8> {
    let byte_rate = sample_rate * u32::from(channels) * u32::from(bit_depth) / 8;
    let block_align = channels * bit_depth / 8;
    let data_len = pcm.len() as u32;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bit_depth.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm);
    out
}

/// Parsed fields of a minimal WAV header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavHeader {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub byte_rate: u32,
    pub block_align: u16,
    pub data_len: u32,
}

impl WavHeader {
    /// Parse the 44-byte minimal header from the front of a container.
    ///
    /// Only accepts the layout `encode_wav` produces; extended headers
    /// (extra chunks before `data`) are rejected.
    pub fn parse(container: &[u8]) -> Result<Self, RelayError> {
        if container.len() < WAV_HEADER_LEN {
            return Err(RelayError::MalformedContainer(format!(
                "container too short for header: {} bytes",
                container.len()
            )));
        }
        if &container[0..4] != b"RIFF" || &container[8..12] != b"WAVE" {
            return Err(RelayError::MalformedContainer(
                "missing RIFF/WAVE markers".to_string(),
            ));
        }
        if &container[12..16] != b"fmt " || &container[36..40] != b"data" {
            return Err(RelayError::MalformedContainer(
                "unexpected chunk layout".to_string(),
            ));
        }

        let mut cursor = Cursor::new(&container[16..36]);
        let fmt_chunk_len = cursor.read_u32::<LittleEndian>().map_err(RelayError::from)?;
        let format_code = cursor.read_u16::<LittleEndian>().map_err(RelayError::from)?;
        if fmt_chunk_len != 16 || format_code != FORMAT_PCM {
            return Err(RelayError::MalformedContainer(format!(
                "not a minimal PCM container (fmt len {}, code {})",
                fmt_chunk_len, format_code
            )));
        }
        let channels = cursor.read_u16::<LittleEndian>().map_err(RelayError::from)?;
        let sample_rate = cursor.read_u32::<LittleEndian>().map_err(RelayError::from)?;
        let byte_rate = cursor.read_u32::<LittleEndian>().map_err(RelayError::from)?;
        let block_align = cursor.read_u16::<LittleEndian>().map_err(RelayError::from)?;
        let bit_depth = cursor.read_u16::<LittleEndian>().map_err(RelayError::from)?;

        let mut data_cursor = Cursor::new(&container[40..44]);
        let data_len = data_cursor
            .read_u32::<LittleEndian>()
            .map_err(RelayError::from)?;

        Ok(Self {
            sample_rate,
            channels,
            bit_depth,
            byte_rate,
            block_align,
            data_len,
        })
    }
}
