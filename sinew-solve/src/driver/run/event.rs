use crate::Accuracy;

/// Event emitted by [`run_until`](super::run_until) for each tick.
///
/// Tick 0 describes the starting date before any integration, with a zero
/// step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// The tick number (0 for the start, 1..N for integration ticks).
    pub tick: usize,

    /// Simulation date after the tick.
    pub date: f64,

    /// Time advanced by the tick.
    pub step: f64,

    pub accuracy: Accuracy,
}
