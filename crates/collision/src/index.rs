use foundation::bounds::{Aabb2, Circle};
use foundation::math::{Mat4, Vec2};
use tracing::{debug, trace};

use crate::feature::{CollisionBox, CollisionFeature, IndexedSubfeature, PlacedSymbol};
use crate::grid::GridIndex;
use crate::line::{place_first_and_last_glyph, project};
use crate::projection::{
    GRID_CELL_SIZE, MapMode, TransformState, ViewportProjector, viewport_padding,
};
use crate::shape::CollisionShape;

/// Which already placed labels a new label may collide with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CollisionGroupFilter {
    /// Collide with every placed label.
    #[default]
    Any,
    /// Only collide with labels inserted under this group id.
    Only(u16),
}

impl CollisionGroupFilter {
    pub fn allows(&self, feature: &IndexedSubfeature) -> bool {
        match self {
            CollisionGroupFilter::Any => true,
            CollisionGroupFilter::Only(group) => feature.collision_group_id == *group,
        }
    }
}

/// Per-symbol inputs to [`CollisionIndex::place_feature`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementParams {
    /// Pixel shift applied to point boxes (variable anchor offset).
    pub shift: Vec2,
    /// Tile units to clip space.
    pub pos_matrix: Mat4,
    /// Tile units to the plane glyphs are laid out in.
    pub label_plane_matrix: Mat4,
    pub text_pixel_ratio: f64,
    /// Tile scale at the current zoom.
    pub scale: f64,
    pub font_size: f64,
    pub allow_overlap: bool,
    pub pitch_with_map: bool,
    /// Keep evaluating along-line circles after a collision.
    pub collision_debug: bool,
    /// Grid-space tile bounds the label must stay inside.
    pub avoid_edges: Option<Aabb2>,
    pub collision_group: CollisionGroupFilter,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self {
            shift: Vec2::ZERO,
            pos_matrix: Mat4::identity(),
            label_plane_matrix: Mat4::identity(),
            text_pixel_ratio: 1.0,
            scale: 1.0,
            font_size: 24.0,
            allow_overlap: false,
            pitch_with_map: false,
            collision_debug: false,
            avoid_edges: None,
            collision_group: CollisionGroupFilter::Any,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PlacementOutcome {
    pub fits: bool,
    /// Every retained shape is outside the visible viewport.
    pub offscreen: bool,
}

impl PlacementOutcome {
    const REJECTED: Self = Self {
        fits: false,
        offscreen: false,
    };
}

/// How a projected box sits on the borders of a tile.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct IntersectStatus {
    pub vertical_borders: bool,
    pub horizontal_borders: bool,
    /// Shortest part of the box on either side of a crossed border, in whole pixels.
    pub min_section_length: i32,
}

impl IntersectStatus {
    pub fn crosses_any(&self) -> bool {
        self.vertical_borders || self.horizontal_borders
    }
}

/// Per-frame collision state: the active grid, the ignored grid, and the
/// projection that maps tile geometry into them.
///
/// Ordering contract: labels are tested and inserted one at a time; a label
/// inserted earlier always wins over a later one it overlaps.
#[derive(Debug, Clone)]
pub struct CollisionIndex {
    transform: TransformState,
    pub(crate) projector: ViewportProjector,
    pub(crate) collision_grid: GridIndex<IndexedSubfeature>,
    pub(crate) ignored_grid: GridIndex<IndexedSubfeature>,
    screen_right: f64,
    screen_bottom: f64,
    grid_right: f64,
    grid_bottom: f64,
}

impl CollisionIndex {
    pub fn new(transform: TransformState, mode: MapMode) -> Self {
        let padding = viewport_padding(&transform, mode);
        let size = transform.size;
        let grid_right = size.width + 2.0 * padding;
        let grid_bottom = size.height + 2.0 * padding;

        debug!(
            width = grid_right,
            height = grid_bottom,
            padding,
            ?mode,
            "collision grids created"
        );

        Self {
            transform,
            projector: ViewportProjector::new(&transform, padding),
            collision_grid: GridIndex::new(grid_right, grid_bottom, GRID_CELL_SIZE),
            ignored_grid: GridIndex::new(grid_right, grid_bottom, GRID_CELL_SIZE),
            screen_right: size.width + padding,
            screen_bottom: size.height + padding,
            grid_right,
            grid_bottom,
        }
    }

    pub fn viewport_padding(&self) -> f64 {
        self.projector.padding()
    }

    pub fn transform_state(&self) -> &TransformState {
        &self.transform
    }

    pub fn projector(&self) -> &ViewportProjector {
        &self.projector
    }

    /// Grid that blocks later labels.
    pub fn collision_grid(&self) -> &GridIndex<IndexedSubfeature> {
        &self.collision_grid
    }

    /// Grid of labels that were placed but never block.
    pub fn ignored_grid(&self) -> &GridIndex<IndexedSubfeature> {
        &self.ignored_grid
    }

    pub fn project_tile_boundaries(&self, pos_matrix: &Mat4) -> Aabb2 {
        self.projector.project_tile_boundaries(pos_matrix)
    }

    /// Tests `feature` against the active grid without inserting it.
    ///
    /// `out` receives one slot per retained shape: a single box for point
    /// labels, or one slot per circle for along-line labels where `None`
    /// marks a circle that was skipped or thinned. Pass the same slice to
    /// [`CollisionIndex::insert_feature`] to commit the placement.
    pub fn place_feature(
        &self,
        feature: &CollisionFeature,
        symbol: &PlacedSymbol,
        params: &PlacementParams,
        out: &mut Vec<Option<CollisionShape>>,
    ) -> PlacementOutcome {
        debug_assert!(out.is_empty(), "projected shape buffer must start empty");
        if feature.along_line {
            return self.place_line_feature(feature, symbol, params, out);
        }

        let Some(collision_box) = feature.boxes.first() else {
            trace!(
                feature = feature.indexed_feature.feature_index,
                "point label without a box"
            );
            return PlacementOutcome::REJECTED;
        };

        let bounds = self.projector.projected_collision_boundaries(
            &params.pos_matrix,
            params.shift,
            params.text_pixel_ratio,
            collision_box,
        );
        let shape = CollisionShape::Box(bounds);
        out.push(Some(shape));

        if let Some(tile) = &params.avoid_edges
            && !is_inside_tile(&bounds, tile)
        {
            trace!(
                feature = feature.indexed_feature.feature_index,
                "point label crosses tile edge"
            );
            return PlacementOutcome::REJECTED;
        }
        if !self.is_inside_grid(&bounds) {
            trace!(
                feature = feature.indexed_feature.feature_index,
                "point label outside grid"
            );
            return PlacementOutcome::REJECTED;
        }
        if !params.allow_overlap && self.hits_active(&shape, params.collision_group) {
            trace!(
                feature = feature.indexed_feature.feature_index,
                "point label collides"
            );
            return PlacementOutcome::REJECTED;
        }

        PlacementOutcome {
            fits: true,
            offscreen: self.is_offscreen(&bounds),
        }
    }

    fn place_line_feature(
        &self,
        feature: &CollisionFeature,
        symbol: &PlacedSymbol,
        params: &PlacementParams,
        out: &mut Vec<Option<CollisionShape>>,
    ) -> PlacementOutcome {
        debug_assert!(feature.along_line);
        let feature_index = feature.indexed_feature.feature_index;

        let tile_anchor = symbol.anchor_point;
        let (perspective_ratio, camera_to_anchor_distance) =
            self.projector.project_anchor(&params.pos_matrix, tile_anchor);

        let font_scale = params.font_size / 24.0;
        let line_offset_x = symbol.line_offset[0] * params.font_size;
        let line_offset_y = symbol.line_offset[1] * params.font_size;

        let (label_plane_anchor, _) = project(tile_anchor, &params.label_plane_matrix);
        let glyphs = place_first_and_last_glyph(
            font_scale,
            line_offset_x,
            line_offset_y,
            false,
            label_plane_anchor,
            symbol,
            &params.label_plane_matrix,
        );

        let tile_to_viewport = perspective_ratio * params.text_pixel_ratio;
        // Line geometry is in tile units at this zoom; perspective does not apply.
        let pixels_to_tile_units = 1.0 / (params.text_pixel_ratio * params.scale);

        let (first_tile_distance, last_tile_distance) = match &glyphs {
            Some((first, last)) => (
                self.projector.approximate_tile_distance(
                    &first.tile_distance,
                    first.angle,
                    pixels_to_tile_units,
                    camera_to_anchor_distance,
                    params.pitch_with_map,
                ),
                self.projector.approximate_tile_distance(
                    &last.tile_distance,
                    last.angle,
                    pixels_to_tile_units,
                    camera_to_anchor_distance,
                    params.pitch_with_map,
                ),
            ),
            None => {
                trace!(feature = feature_index, "label does not fit on its line");
                (0.0, 0.0)
            }
        };
        let in_glyph_range =
            |d: f64| glyphs.is_some() && d >= -first_tile_distance && d <= last_tile_distance;

        let mut collision_detected = false;
        let mut in_grid = false;
        let mut entirely_offscreen = true;
        let mut previous_circle_placed = false;

        out.resize(feature.boxes.len(), None);
        for (i, circle) in feature.boxes.iter().enumerate() {
            if !in_glyph_range(circle.signed_distance_from_anchor) {
                previous_circle_placed = false;
                continue;
            }

            let center = self.projector.project_point(&params.pos_matrix, circle.anchor);
            let radius = circle.radius() * tile_to_viewport;

            if previous_circle_placed
                && let Some(previous) = out[i - 1].as_ref().and_then(CollisionShape::as_circle)
                && is_placed_too_densely(previous, center, radius)
                && let Some(next) = feature.boxes.get(i + 1)
                && next.signed_distance_from_anchor > -first_tile_distance
                && next.signed_distance_from_anchor < last_tile_distance
            {
                // Thin out circles that nearly double up, but keep the last usable one.
                previous_circle_placed = false;
                continue;
            }

            previous_circle_placed = true;

            let projected = Circle::new(center, radius);
            let bounds = projected.bounds();
            let shape = CollisionShape::Circle(projected);
            out[i] = Some(shape);

            entirely_offscreen &= self.is_offscreen(&bounds);
            in_grid |= self.is_inside_grid(&bounds);

            let outside_tile = params
                .avoid_edges
                .as_ref()
                .is_some_and(|tile| !is_inside_tile(&bounds, tile));
            if outside_tile
                || (!params.allow_overlap && self.hits_active(&shape, params.collision_group))
            {
                if !params.collision_debug {
                    trace!(feature = feature_index, circle = i, "line label collides");
                    return PlacementOutcome::REJECTED;
                }
                collision_detected = true;
            }
        }

        PlacementOutcome {
            fits: !collision_detected && glyphs.is_some() && in_grid,
            offscreen: entirely_offscreen,
        }
    }

    /// Commits shapes produced by [`CollisionIndex::place_feature`].
    ///
    /// The stored identity is the feature's own with `bucket_instance_id` and
    /// `collision_group_id` replaced. `ignore_placement` sends the shapes to the
    /// ignored grid, where they answer queries but never block placement.
    pub fn insert_feature(
        &mut self,
        feature: &CollisionFeature,
        shapes: &[Option<CollisionShape>],
        ignore_placement: bool,
        bucket_instance_id: u32,
        collision_group_id: u16,
    ) {
        let value = IndexedSubfeature {
            bucket_instance_id,
            collision_group_id,
            ..feature.indexed_feature
        };
        let grid = if ignore_placement {
            &mut self.ignored_grid
        } else {
            &mut self.collision_grid
        };

        if feature.along_line {
            for circle in shapes.iter().flatten().filter_map(CollisionShape::as_circle) {
                grid.insert_circle(value, *circle);
            }
        } else if !shapes.is_empty() {
            debug_assert_eq!(shapes.len(), 1, "point labels carry exactly one box");
            debug_assert!(
                matches!(shapes.first(), Some(Some(CollisionShape::Box(_)))),
                "point label shape must be a box"
            );
            if let Some(Some(CollisionShape::Box(bounds))) = shapes.first() {
                grid.insert_box(value, *bounds);
            }
        }
    }

    /// Reports which tile borders the projected box straddles.
    ///
    /// Only meaningful when tile boundaries are axis aligned, which holds for
    /// [`MapMode::Tile`].
    pub fn intersects_tile_edges(
        &self,
        collision_box: &CollisionBox,
        shift: Vec2,
        pos_matrix: &Mat4,
        text_pixel_ratio: f64,
        tile_edges: &Aabb2,
    ) -> IntersectStatus {
        let b = self.projector.projected_collision_boundaries(
            pos_matrix,
            shift,
            text_pixel_ratio,
            collision_box,
        );
        let mut result = IntersectStatus::default();

        // Left border, then right.
        let mut section = (tile_edges.min.x - b.min.x).min(b.max.x - tile_edges.min.x) as i32;
        if section <= 0 {
            section = (tile_edges.max.x - b.min.x).min(b.max.x - tile_edges.max.x) as i32;
        }
        if section > 0 {
            result.vertical_borders = true;
            result.min_section_length = section;
        }

        // Top border, then bottom.
        section = (tile_edges.min.y - b.min.y).min(b.max.y - tile_edges.min.y) as i32;
        if section <= 0 {
            section = (tile_edges.max.y - b.min.y).min(b.max.y - tile_edges.max.y) as i32;
        }
        if section > 0 {
            result.horizontal_borders = true;
            // A lone horizontal crossing reports its own section, never the
            // zero the status starts from; mbgl's min(0, section) would.
            result.min_section_length = if result.vertical_borders {
                result.min_section_length.min(section)
            } else {
                section
            };
        }

        result
    }

    fn hits_active(&self, shape: &CollisionShape, group: CollisionGroupFilter) -> bool {
        match group {
            CollisionGroupFilter::Any => self.collision_grid.hit_test(shape, None),
            CollisionGroupFilter::Only(_) => {
                let accept = |f: &IndexedSubfeature| group.allows(f);
                self.collision_grid.hit_test(shape, Some(&accept))
            }
        }
    }

    fn is_offscreen(&self, b: &Aabb2) -> bool {
        let padding = self.projector.padding();
        b.max.x < padding
            || b.min.x >= self.screen_right
            || b.max.y < padding
            || b.min.y >= self.screen_bottom
    }

    fn is_inside_grid(&self, b: &Aabb2) -> bool {
        b.max.x >= 0.0 && b.min.x < self.grid_right && b.max.y >= 0.0 && b.min.y < self.grid_bottom
    }
}

fn is_inside_tile(b: &Aabb2, tile: &Aabb2) -> bool {
    b.min.x >= tile.min.x && b.min.y >= tile.min.y && b.max.x < tile.max.x && b.max.y < tile.max.y
}

/// Circles closer than `sqrt(2) * radius` overlap enough that every other one can go.
fn is_placed_too_densely(previous: &Circle, center: Vec2, radius: f64) -> bool {
    let dx = center.x - previous.center.x;
    let dy = center.y - previous.center.y;
    radius * radius * 2.0 > dx * dx + dy * dy
}
