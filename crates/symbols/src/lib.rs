//! Per-frame symbol placement on top of the `collision` index: ordered
//! candidates, configuration, statistics, and the JSON scene format.

pub mod config;
pub mod error;
pub mod pass;
pub mod scene;
pub mod stats;

pub use config::PlacementConfig;
pub use error::SceneError;
pub use pass::{PlacementDecision, PlacementPass, SymbolCandidate, sort_by_priority};
pub use scene::{Scene, SceneDoc};
pub use stats::PlacementStats;
