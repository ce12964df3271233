use serde::{Deserialize, Serialize};

/// Pass-wide placement settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Evaluate every along-line circle even after a collision, so debug
    /// overlays can show which circles a label uses.
    pub collision_debug: bool,
    /// When false, each symbol only collides with symbols of its own collision group.
    pub cross_source_collisions: bool,
    /// Candidates past this count are skipped.
    pub max_symbols: usize,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            collision_debug: false,
            cross_source_collisions: true,
            max_symbols: 10_000,
        }
    }
}
