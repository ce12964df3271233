//! Tile space to padded viewport space.
//!
//! Collision geometry lives in "grid space": viewport pixels shifted by the
//! viewport padding, so that labels just outside the screen still land at
//! non-negative coordinates.

use foundation::bounds::Aabb2;
use foundation::math::{Mat4, Vec2};

use crate::feature::CollisionBox;
use crate::line::TileDistance;

/// Tile extent in tile units.
pub const EXTENT: f64 = 8192.0;

/// Padding around the viewport in which labels still take part in collision.
///
/// Larger values push the label churn caused by symbols crossing the edge
/// further offscreen, at the cost of testing more symbols.
pub const VIEWPORT_PADDING_DEFAULT: f64 = 100.0;

/// Static tile rendering needs a much wider margin or labels get clipped at tile seams.
pub const VIEWPORT_PADDING_FOR_STATIC_TILES: f64 = 1024.0;

/// Grid cell size in pixels, shared by both collision grids.
pub const GRID_CELL_SIZE: f64 = 25.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum MapMode {
    /// Interactive rendering.
    #[default]
    Continuous,
    /// One-shot still image.
    Static,
    /// Static tile export.
    Tile,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// The camera facts collision needs from the renderer's transform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransformState {
    /// Viewport size in pixels.
    pub size: Size,
    /// Pitch in radians; `0` looks straight down.
    pub pitch: f64,
    /// Distance from the camera to the center of the viewport, in pixels.
    pub camera_to_center_distance: f64,
}

impl TransformState {
    pub fn new(size: Size, pitch: f64, camera_to_center_distance: f64) -> Self {
        Self {
            size,
            pitch,
            camera_to_center_distance,
        }
    }

    /// Derives the camera distance from a vertical field of view (radians).
    pub fn with_field_of_view(size: Size, pitch: f64, fov: f64) -> Self {
        let camera_to_center_distance = 0.5 / (fov / 2.0).tan() * size.height;
        Self::new(size, pitch, camera_to_center_distance)
    }
}

pub fn viewport_padding(transform: &TransformState, mode: MapMode) -> f64 {
    if mode == MapMode::Tile {
        return VIEWPORT_PADDING_FOR_STATIC_TILES;
    }
    if transform.pitch != 0.0 {
        VIEWPORT_PADDING_DEFAULT * 2.0
    } else {
        VIEWPORT_PADDING_DEFAULT
    }
}

/// Projects tile points into grid space for one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportProjector {
    size: Size,
    padding: f64,
    camera_to_center_distance: f64,
    pitch_factor: f64,
}

impl ViewportProjector {
    pub fn new(transform: &TransformState, padding: f64) -> Self {
        Self {
            size: transform.size,
            padding,
            camera_to_center_distance: transform.camera_to_center_distance,
            pitch_factor: transform.pitch.cos() * transform.camera_to_center_distance,
        }
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    /// `cos(pitch) * cameraToCenterDistance`.
    pub fn pitch_factor(&self) -> f64 {
        self.pitch_factor
    }

    pub fn project_point(&self, matrix: &Mat4, point: Vec2) -> Vec2 {
        let p = matrix.transform_point(point);
        Vec2::new(
            ((p.x / p.w + 1.0) / 2.0) * self.size.width + self.padding,
            ((-p.y / p.w + 1.0) / 2.0) * self.size.height + self.padding,
        )
    }

    /// Grid-space point plus the factor that shrinks collision geometry with distance.
    pub fn project_and_get_perspective_ratio(&self, matrix: &Mat4, point: Vec2) -> (Vec2, f64) {
        let p = matrix.transform_point(point);
        let projected = Vec2::new(
            ((p.x / p.w + 1.0) / 2.0) * self.size.width + self.padding,
            ((-p.y / p.w + 1.0) / 2.0) * self.size.height + self.padding,
        );
        (projected, self.perspective_ratio(p.w))
    }

    /// `(perspective ratio, camera-to-anchor distance)` without the pixel mapping.
    pub fn project_anchor(&self, matrix: &Mat4, point: Vec2) -> (f64, f64) {
        let p = matrix.transform_point(point);
        (self.perspective_ratio(p.w), p.w)
    }

    fn perspective_ratio(&self, w: f64) -> f64 {
        0.5 + 0.5 * self.camera_to_center_distance / w
    }

    /// Box edges in grid space, scaled by text pixel ratio and perspective.
    pub fn projected_collision_boundaries(
        &self,
        matrix: &Mat4,
        shift: Vec2,
        text_pixel_ratio: f64,
        collision_box: &CollisionBox,
    ) -> Aabb2 {
        let (anchor, perspective_ratio) =
            self.project_and_get_perspective_ratio(matrix, collision_box.anchor);
        let tile_to_viewport = text_pixel_ratio * perspective_ratio;
        Aabb2::from_edges(
            (collision_box.x1 + shift.x) * tile_to_viewport + anchor.x,
            (collision_box.y1 + shift.y) * tile_to_viewport + anchor.y,
            (collision_box.x2 + shift.x) * tile_to_viewport + anchor.x,
            (collision_box.y2 + shift.y) * tile_to_viewport + anchor.y,
        )
    }

    /// Grid-space corners of the tile `[0, EXTENT]^2` under `matrix`.
    pub fn project_tile_boundaries(&self, matrix: &Mat4) -> Aabb2 {
        let top_left = self.project_point(matrix, Vec2::new(0.0, 0.0));
        let bottom_right = self.project_point(matrix, Vec2::new(EXTENT, EXTENT));
        Aabb2::new(top_left, bottom_right)
    }

    /// Converts a glyph's distance along the line into tile units.
    ///
    /// Collision circles are laid out in tile units while glyphs are placed in
    /// the label plane. When labels stand up to face the viewport on a pitched
    /// map, the last segment covers more ground than it does on screen; the
    /// incidence stretch `cameraToAnchorDistance / pitchFactor` accounts for
    /// that, weighted by how much the segment runs away from the camera.
    pub fn approximate_tile_distance(
        &self,
        tile_distance: &TileDistance,
        last_segment_angle: f64,
        pixels_to_tile_units: f64,
        camera_to_anchor_distance: f64,
        pitch_with_map: bool,
    ) -> f64 {
        let incidence_stretch = if pitch_with_map {
            1.0
        } else {
            camera_to_anchor_distance / self.pitch_factor
        };
        let last_segment_tile = tile_distance.last_segment_viewport_distance * pixels_to_tile_units;
        tile_distance.prev_tile_distance
            + last_segment_tile
            + (incidence_stretch - 1.0) * last_segment_tile * last_segment_angle.sin().abs()
    }
}
