/// Indicates how a run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Reached the requested end date.
    Complete,

    /// Stopped early due to an observer action.
    StoppedByObserver,
}

/// The result of [`run_until`](super::run_until).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    /// How the run terminated.
    pub status: Status,

    /// Number of ticks taken.
    pub ticks: usize,

    /// Simulation date when the run stopped.
    pub date: f64,

    /// Ticks accepted with degraded accuracy.
    pub degraded: usize,
}
