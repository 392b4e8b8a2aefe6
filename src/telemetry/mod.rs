mod http;
mod init;
mod metrics;

pub use http::{HttpMakeSpan, HttpOnResponse, X_REQUEST_ID, track_http_metrics};
pub use init::{TelemetryGuard, init_telemetry};
pub use metrics::*;
