//! # Relay Core
//!
//! The audio-session aggregation and container-framing pipeline: frame
//! classification, chunk buffering, the recording state machine, WAV
//! framing, and the connection-role router that ties them to the WebSocket
//! transport.

pub mod buffer;
pub mod control;
pub mod frame;
#[allow(clippy::module_inception)]
pub mod relay;
pub mod session;
pub mod socket;
pub mod wav;

pub use relay::Relay;
