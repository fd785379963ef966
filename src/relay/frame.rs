//! # Inbound Frame Classification
//!
//! Decides whether an inbound WebSocket frame is a control command or audio
//! payload. The transport-level text/binary flag alone is not trustworthy:
//! some browser clients can only send binary frames, and sensor firmware
//! sends its control tokens as binary too. Classification therefore combines
//! the flag, the peer's role, the frame length, and (where needed) the
//! decoded content.
//!
//! Classification is pure and never fails: when a control interpretation is
//! plausible but the bytes do not decode as UTF-8, the frame falls back to
//! audio payload so no recorded data is ever discarded.

use crate::relay::control::ControlSignal;
use crate::relay::relay::ConnectionRole;

/// An inbound WebSocket frame with its transport-reported type.
#[derive(Debug, Clone)]
pub enum InboundFrame {
    /// Frame the transport flagged as text.
    Text(String),
    /// Frame the transport flagged as binary.
    Binary(Vec<u8>),
}

impl InboundFrame {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        match self {
            InboundFrame::Text(s) => s.len(),
            InboundFrame::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The classifier's verdict for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// A control command, decoded and whitespace-trimmed.
    ControlText(String),
    /// Raw audio bytes for the recording session.
    AudioPayload(Vec<u8>),
}

/// Classify one inbound frame.
///
/// ## Rules:
/// - Text-flagged frames are always control text.
/// - A Consumer binary frame shorter than `control_frame_threshold` bytes is
///   decoded as control text (browser clients that cannot send text frames).
/// - A Producer binary frame is control text only if its trimmed content
///   exactly matches a known producer token; otherwise it is audio payload
///   no matter how short it is.
/// - Every other binary frame is audio payload.
/// - A failed UTF-8 decode during a control attempt classifies as audio.
pub fn classify(
    role: ConnectionRole,
    frame: InboundFrame,
    control_frame_threshold: usize,
) -> Classified {
    match frame {
        InboundFrame::Text(text) => Classified::ControlText(text.trim().to_string()),
        InboundFrame::Binary(bytes) => match role {
            ConnectionRole::Consumer if bytes.len() < control_frame_threshold => {
                match std::str::from_utf8(&bytes) {
                    Ok(text) => Classified::ControlText(text.trim().to_string()),
                    Err(_) => Classified::AudioPayload(bytes),
                }
            }
            ConnectionRole::Producer => match std::str::from_utf8(&bytes) {
                Ok(text) if ControlSignal::is_producer_token(text.trim()) => {
                    Classified::ControlText(text.trim().to_string())
                }
                _ => Classified::AudioPayload(bytes),
            },
            _ => Classified::AudioPayload(bytes),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: usize = 32;

    fn classify_with_default(role: ConnectionRole, frame: InboundFrame) -> Classified {
        classify(role, frame, THRESHOLD)
    }

    #[test]
    fn test_text_frame_is_always_control() {
        let verdict = classify_with_default(
            ConnectionRole::Producer,
            InboundFrame::Text("  END_RECORDING \n".to_string()),
        );
        assert_eq!(verdict, Classified::ControlText("END_RECORDING".to_string()));
    }

    #[test]
    fn test_short_consumer_binary_is_control() {
        // A 10-byte binary "STOP" (padded with whitespace) from a Consumer.
        let verdict = classify_with_default(
            ConnectionRole::Consumer,
            InboundFrame::Binary(b"STOP      ".to_vec()),
        );
        assert_eq!(verdict, Classified::ControlText("STOP".to_string()));
    }

    #[test]
    fn test_long_consumer_binary_is_audio() {
        let payload = vec![0x41u8; THRESHOLD];
        let verdict = classify_with_default(
            ConnectionRole::Consumer,
            InboundFrame::Binary(payload.clone()),
        );
        assert_eq!(verdict, Classified::AudioPayload(payload));
    }

    #[test]
    fn test_producer_binary_token_is_control() {
        let verdict = classify_with_default(
            ConnectionRole::Producer,
            InboundFrame::Binary(b"END_RECORDING".to_vec()),
        );
        assert_eq!(verdict, Classified::ControlText("END_RECORDING".to_string()));
    }

    #[test]
    fn test_producer_binary_nontoken_is_audio_regardless_of_length() {
        // PCM that happens to decode as text but matches no token stays audio,
        // even a large frame full of "STOP"s.
        let payload = b"STOP".repeat(2500);
        let verdict = classify_with_default(
            ConnectionRole::Producer,
            InboundFrame::Binary(payload.clone()),
        );
        assert_eq!(verdict, Classified::AudioPayload(payload));
    }

    #[test]
    fn test_short_producer_binary_nontoken_is_audio() {
        // Producer frames are never length-gated into control text.
        let payload = vec![0x00u8, 0x01, 0x02, 0x03];
        let verdict = classify_with_default(
            ConnectionRole::Producer,
            InboundFrame::Binary(payload.clone()),
        );
        assert_eq!(verdict, Classified::AudioPayload(payload));
    }

    #[test]
    fn test_invalid_utf8_falls_back_to_audio() {
        let payload = vec![0xFFu8, 0xFE, 0x00, 0x01];
        let verdict = classify_with_default(
            ConnectionRole::Consumer,
            InboundFrame::Binary(payload.clone()),
        );
        assert_eq!(verdict, Classified::AudioPayload(payload));
    }
}
