//! Label collision detection for tiled vector maps.
//!
//! A [`CollisionIndex`] lives for one frame. Candidate labels are offered in
//! priority order with [`CollisionIndex::place_feature`]; the ones that fit
//! are committed with [`CollisionIndex::insert_feature`] and block every later
//! label they overlap. After placement the same index answers screen-space
//! hit tests through [`CollisionIndex::query_rendered_symbols`].

pub mod feature;
pub mod grid;
pub mod index;
pub mod line;
pub mod projection;
mod query;
pub mod shape;

pub use feature::{CollisionBox, CollisionFeature, IndexedSubfeature, PlacedSymbol};
pub use grid::GridIndex;
pub use index::{
    CollisionGroupFilter, CollisionIndex, IntersectStatus, PlacementOutcome, PlacementParams,
};
pub use line::{PlacedGlyph, TileDistance};
pub use projection::{
    EXTENT, GRID_CELL_SIZE, MapMode, Size, TransformState, VIEWPORT_PADDING_DEFAULT,
    VIEWPORT_PADDING_FOR_STATIC_TILES, ViewportProjector,
};
pub use shape::CollisionShape;
