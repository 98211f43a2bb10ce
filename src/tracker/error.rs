use thiserror::Error;

/// Errors reported by the bar tracking engine.
///
/// Only `InvalidCalibration`, `InvalidConfig` and `SessionFinalized` ever
/// reach a session's caller. `OutOfOrderSample` is returned by the sample
/// filter and absorbed by the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    #[error("invalid calibration: pixels per meter must be positive, got {pixels_per_meter}")]
    InvalidCalibration { pixels_per_meter: f64 },
    #[error("invalid tracker config: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
    #[error("out of order sample: {timestamp_ms} ms arrived after {last_timestamp_ms} ms")]
    OutOfOrderSample {
        timestamp_ms: u64,
        last_timestamp_ms: u64,
    },
    #[error("session already finalized")]
    SessionFinalized,
}
