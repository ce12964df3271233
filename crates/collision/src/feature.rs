use foundation::math::Vec2;

/// Identity stored in the grid for every placed box or circle.
///
/// `bucket_instance_id` and `collision_group_id` are stamped at insert time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct IndexedSubfeature {
    /// Feature index within the owning bucket.
    pub feature_index: usize,
    /// Upstream draw order, carried through for picking.
    pub sort_index: usize,
    pub bucket_instance_id: u32,
    pub collision_group_id: u16,
}

impl IndexedSubfeature {
    pub fn new(feature_index: usize) -> Self {
        Self {
            feature_index,
            ..Self::default()
        }
    }

    pub fn with_sort_index(mut self, sort_index: usize) -> Self {
        self.sort_index = sort_index;
        self
    }
}

/// Axis-aligned box in tile units, relative to `anchor`.
///
/// Along-line labels use these as circles: the radius is half the box width
/// and `signed_distance_from_anchor` places the circle along the line.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CollisionBox {
    pub anchor: Vec2,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub signed_distance_from_anchor: f64,
}

impl CollisionBox {
    pub fn new(anchor: Vec2, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            anchor,
            x1,
            y1,
            x2,
            y2,
            signed_distance_from_anchor: 0.0,
        }
    }

    pub fn circle(center: Vec2, radius: f64, signed_distance_from_anchor: f64) -> Self {
        Self {
            anchor: center,
            x1: -radius,
            y1: -radius,
            x2: radius,
            y2: radius,
            signed_distance_from_anchor,
        }
    }

    pub fn radius(&self) -> f64 {
        (self.x2 - self.x1) / 2.0
    }
}

/// A label candidate: one box for point labels, a chain of circles for line labels.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionFeature {
    pub boxes: Vec<CollisionBox>,
    pub indexed_feature: IndexedSubfeature,
    pub along_line: bool,
}

impl CollisionFeature {
    pub fn point(collision_box: CollisionBox, indexed_feature: IndexedSubfeature) -> Self {
        Self {
            boxes: vec![collision_box],
            indexed_feature,
            along_line: false,
        }
    }

    /// Circles must be ordered along the line.
    pub fn along_line(circles: Vec<CollisionBox>, indexed_feature: IndexedSubfeature) -> Self {
        Self {
            boxes: circles,
            indexed_feature,
            along_line: true,
        }
    }
}

/// Line geometry for one symbol, as laid out upstream.
///
/// Point labels only need `anchor_point`; the rest is read by the along-line path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlacedSymbol {
    /// Anchor in tile units.
    pub anchor_point: Vec2,
    /// Index of the line segment the anchor sits on (`line[segment]..line[segment + 1]`).
    pub segment: usize,
    /// Line vertices in tile units.
    pub line: Vec<Vec2>,
    /// Tile-unit arc length from the anchor to each vertex of `line`.
    pub tile_distances: Vec<f64>,
    /// Horizontal glyph offsets in ems at 24px; only the first and last are used.
    pub glyph_offsets: Vec<f64>,
    /// `[x, y]` offset from the line in ems.
    pub line_offset: [f64; 2],
}

impl PlacedSymbol {
    pub fn at(anchor_point: Vec2) -> Self {
        Self {
            anchor_point,
            ..Self::default()
        }
    }

    /// Builds a symbol on `line`, deriving tile distances from the anchor.
    ///
    /// Returns `None` if `segment` is not a segment of `line`.
    pub fn on_line(
        anchor_point: Vec2,
        segment: usize,
        line: Vec<Vec2>,
        glyph_offsets: Vec<f64>,
    ) -> Option<Self> {
        let tile_distances = tile_distances_from_anchor(&line, anchor_point, segment)?;
        Some(Self {
            anchor_point,
            segment,
            line,
            tile_distances,
            glyph_offsets,
            line_offset: [0.0, 0.0],
        })
    }
}

/// Arc length from `anchor` to every vertex, walking outward in both directions.
pub fn tile_distances_from_anchor(line: &[Vec2], anchor: Vec2, segment: usize) -> Option<Vec<f64>> {
    if segment + 1 >= line.len() {
        return None;
    }

    let mut out = vec![0.0; line.len()];
    out[segment] = anchor.distance(line[segment]);
    for i in (1..=segment).rev() {
        out[i - 1] = out[i] + line[i].distance(line[i - 1]);
    }

    out[segment + 1] = anchor.distance(line[segment + 1]);
    for i in segment + 1..line.len() - 1 {
        out[i + 1] = out[i] + line[i].distance(line[i + 1]);
    }

    Some(out)
}
