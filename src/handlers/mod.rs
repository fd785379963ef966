//! HTTP request handlers for the management API.

mod config;
mod recordings;

pub use config::{get_config, update_config};
pub use recordings::latest_recording;
