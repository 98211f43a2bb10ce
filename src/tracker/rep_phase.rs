use serde::{Deserialize, Serialize};

/// Movement phase of the bar within a repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepPhase {
    /// Resting between reps, or waiting for the first descent
    #[default]
    Idle,
    /// Bar lowering
    Eccentric,
    /// Bar stopped at the bottom
    BottomPause,
    /// Bar rising
    Concentric,
    /// Bar stopped at the top, rep waiting to be counted
    TopPause,
}
