//! Trait for detectors that supply bar positions.

use crate::tracker::BarPosition;

/// Source of bar positions, one per processed frame.
///
/// Implement this trait to connect any detector to the tracker.
///
/// # Example
///
/// ```ignore
/// use bartrack_rs::{BarPosition, PositionSource};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl PositionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn next_position(&mut self) -> Result<Option<BarPosition>, Self::Error> {
///         // Run inference on the next frame
///         Ok(None)
///     }
/// }
/// ```
pub trait PositionSource {
    /// Error type for detection failures.
    type Error;

    /// Produce the position for the next frame.
    ///
    /// # Returns
    /// `Ok(None)` once the source is exhausted.
    fn next_position(&mut self) -> Result<Option<BarPosition>, Self::Error>;
}

/// Helper trait for converting detector-specific output to `BarPosition`.
pub trait IntoBarPosition {
    fn into_bar_position(self) -> BarPosition;
}

impl IntoBarPosition for BarPosition {
    fn into_bar_position(self) -> BarPosition {
        self
    }
}

/// `(x, y, confidence, timestamp_ms)`
impl IntoBarPosition for (f64, f64, f32, u64) {
    fn into_bar_position(self) -> BarPosition {
        BarPosition::new(self.0, self.1, self.2, self.3)
    }
}

/// Replays recorded samples, e.g. from a stored set.
impl<I> PositionSource for std::iter::Fuse<I>
where
    I: Iterator,
    I::Item: IntoBarPosition,
{
    type Error = std::convert::Infallible;

    fn next_position(&mut self) -> Result<Option<BarPosition>, Self::Error> {
        Ok(self.next().map(IntoBarPosition::into_bar_position))
    }
}
