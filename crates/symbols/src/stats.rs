use serde::{Deserialize, Serialize};

/// Counters for one placement pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementStats {
    /// Candidates offered to the index.
    pub candidates: u64,
    pub placed: u64,
    pub rejected: u64,
    /// Placed, but entirely outside the visible viewport.
    pub offscreen: u64,
    /// Placed into the ignored grid.
    pub ignored: u64,
    /// Candidates dropped by `max_symbols`.
    pub skipped: u64,
    /// Along-line circles that were projected and tested.
    pub circles_tested: u64,
}
