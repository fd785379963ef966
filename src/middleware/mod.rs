//! Custom actix middleware: structured request logging and per-endpoint
//! metrics collection.

mod logging;
mod metrics;

pub use logging::RequestLogging;
pub use metrics::MetricsMiddleware;
