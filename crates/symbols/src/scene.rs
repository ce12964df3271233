//! JSON scene files: one frame's camera, settings, candidates and hit-test queries.
//!
//! The `*Doc` types mirror the file layout and are converted into validated
//! [`Scene`] values with [`Scene::from_json`]. Matrices are 16 numbers in
//! column-major order; a missing matrix defaults to the pixel-space
//! orthographic matrix for the viewport, so tile units equal screen pixels.

use std::fs;
use std::path::Path;

use collision::feature::tile_distances_from_anchor;
use collision::{
    CollisionBox, CollisionFeature, CollisionGroupFilter, IndexedSubfeature, MapMode,
    PlacedSymbol, PlacementParams, Size, TransformState,
};
use foundation::bounds::Aabb2;
use foundation::math::{Mat4, Vec2};
use serde::{Deserialize, Serialize};

use crate::config::PlacementConfig;
use crate::error::SceneError;
use crate::pass::SymbolCandidate;

/// Vertical field of view used when a scene gives neither distance nor fov.
pub const DEFAULT_FOV: f64 = 0.6435011087932844;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDoc {
    pub transform: TransformDoc,
    #[serde(default)]
    pub map_mode: MapModeDoc,
    #[serde(default)]
    pub config: PlacementConfig,
    #[serde(default)]
    pub symbols: Vec<SymbolDoc>,
    /// Screen-space polygons to hit-test after placement.
    #[serde(default)]
    pub queries: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformDoc {
    pub width: f64,
    pub height: f64,
    /// Radians.
    #[serde(default)]
    pub pitch: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_to_center_distance: Option<f64>,
    /// Radians; only used when `camera_to_center_distance` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fov: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapModeDoc {
    #[default]
    Continuous,
    Static,
    Tile,
}

impl From<MapModeDoc> for MapMode {
    fn from(mode: MapModeDoc) -> Self {
        match mode {
            MapModeDoc::Continuous => MapMode::Continuous,
            MapModeDoc::Static => MapMode::Static,
            MapModeDoc::Tile => MapMode::Tile,
        }
    }
}

/// A box, or a circle when `radius` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxDoc {
    pub anchor: [f64; 2],
    #[serde(default)]
    pub x1: f64,
    #[serde(default)]
    pub y1: f64,
    #[serde(default)]
    pub x2: f64,
    #[serde(default)]
    pub y2: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    /// Signed tile distance from the label anchor along the line.
    #[serde(default)]
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolDoc {
    #[serde(default)]
    pub feature_index: usize,
    #[serde(default)]
    pub sort_index: usize,
    #[serde(default)]
    pub bucket_instance_id: u32,
    #[serde(default)]
    pub collision_group_id: u16,
    #[serde(default)]
    pub priority: f64,
    #[serde(default)]
    pub along_line: bool,
    pub boxes: Vec<BoxDoc>,
    /// Label anchor; defaults to the first box's anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<[f64; 2]>,
    #[serde(default)]
    pub segment: usize,
    #[serde(default)]
    pub line: Vec<[f64; 2]>,
    /// Derived from `line` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_distances: Option<Vec<f64>>,
    #[serde(default)]
    pub glyph_offsets: Vec<f64>,
    #[serde(default)]
    pub line_offset: [f64; 2],
    #[serde(default)]
    pub params: ParamsDoc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamsDoc {
    pub shift: [f64; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos_matrix: Option<[f64; 16]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_plane_matrix: Option<[f64; 16]>,
    pub text_pixel_ratio: f64,
    pub scale: f64,
    pub font_size: f64,
    pub allow_overlap: bool,
    pub ignore_placement: bool,
    pub pitch_with_map: bool,
    /// Grid-space `[x1, y1, x2, y2]` the label must stay inside.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avoid_edges: Option<[f64; 4]>,
    /// Restrict collisions to this group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collision_group: Option<u16>,
}

impl Default for ParamsDoc {
    fn default() -> Self {
        Self {
            shift: [0.0, 0.0],
            pos_matrix: None,
            label_plane_matrix: None,
            text_pixel_ratio: 1.0,
            scale: 1.0,
            font_size: 24.0,
            allow_overlap: false,
            ignore_placement: false,
            pitch_with_map: false,
            avoid_edges: None,
            collision_group: None,
        }
    }
}

/// A validated frame, ready for a [`crate::PlacementPass`].
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub transform: TransformState,
    pub map_mode: MapMode,
    pub config: PlacementConfig,
    /// In file order.
    pub candidates: Vec<SymbolCandidate>,
    pub queries: Vec<Vec<Vec2>>,
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let text =
            fs::read_to_string(path).map_err(|e| SceneError::Io(format!("read {path:?}: {e}")))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, SceneError> {
        let doc: SceneDoc =
            serde_json::from_str(text).map_err(|e| SceneError::Json(e.to_string()))?;
        Self::from_doc(doc)
    }

    pub fn from_doc(doc: SceneDoc) -> Result<Self, SceneError> {
        let transform = convert_transform(&doc.transform)?;
        let default_matrix = Mat4::pixel_ortho(transform.size.width, transform.size.height);

        let candidates = doc
            .symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| convert_symbol(i, symbol, &default_matrix))
            .collect::<Result<Vec<_>, _>>()?;

        let mut queries = Vec::with_capacity(doc.queries.len());
        for (i, polygon) in doc.queries.iter().enumerate() {
            let points: Vec<Vec2> = polygon.iter().map(|p| point(*p)).collect();
            if !points.iter().all(|p| p.is_finite()) {
                return Err(SceneError::invalid(
                    format!("queries[{i}]"),
                    "coordinates must be finite",
                ));
            }
            queries.push(points);
        }

        Ok(Self {
            transform,
            map_mode: doc.map_mode.into(),
            config: doc.config,
            candidates,
            queries,
        })
    }
}

fn convert_transform(doc: &TransformDoc) -> Result<TransformState, SceneError> {
    if !(doc.width.is_finite() && doc.width > 0.0) {
        return Err(SceneError::invalid("transform.width", "must be positive"));
    }
    if !(doc.height.is_finite() && doc.height > 0.0) {
        return Err(SceneError::invalid("transform.height", "must be positive"));
    }
    if !doc.pitch.is_finite() {
        return Err(SceneError::invalid("transform.pitch", "must be finite"));
    }

    let size = Size::new(doc.width, doc.height);
    match doc.camera_to_center_distance {
        Some(distance) => {
            if !(distance.is_finite() && distance >= 0.0) {
                return Err(SceneError::invalid(
                    "transform.camera_to_center_distance",
                    "must be non-negative",
                ));
            }
            Ok(TransformState::new(size, doc.pitch, distance))
        }
        None => {
            let fov = doc.fov.unwrap_or(DEFAULT_FOV);
            if !(fov.is_finite() && fov > 0.0 && fov < std::f64::consts::PI) {
                return Err(SceneError::invalid("transform.fov", "must be in (0, pi)"));
            }
            Ok(TransformState::with_field_of_view(size, doc.pitch, fov))
        }
    }
}

fn convert_symbol(
    i: usize,
    doc: &SymbolDoc,
    default_matrix: &Mat4,
) -> Result<SymbolCandidate, SceneError> {
    let field = |name: &str| format!("symbols[{i}].{name}");

    if !doc.along_line && doc.boxes.len() != 1 {
        return Err(SceneError::invalid(
            field("boxes"),
            format!("point labels need exactly one box, got {}", doc.boxes.len()),
        ));
    }
    let boxes = doc
        .boxes
        .iter()
        .map(convert_box)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| SceneError::invalid(field("boxes"), "coordinates must be finite"))?;

    let anchor = match doc.anchor {
        Some(a) => point(a),
        None => boxes.first().map(|b| b.anchor).unwrap_or(Vec2::ZERO),
    };
    if !anchor.is_finite() {
        return Err(SceneError::invalid(field("anchor"), "must be finite"));
    }

    let mut symbol = PlacedSymbol::at(anchor);
    symbol.line_offset = doc.line_offset;
    if doc.along_line {
        if doc.glyph_offsets.is_empty() {
            return Err(SceneError::invalid(
                field("glyph_offsets"),
                "along-line labels need glyph offsets",
            ));
        }
        let line: Vec<Vec2> = doc.line.iter().map(|p| point(*p)).collect();
        if doc.segment + 1 >= line.len() {
            return Err(SceneError::invalid(
                field("segment"),
                format!("no segment {} on a line of {} vertices", doc.segment, line.len()),
            ));
        }
        let tile_distances = match &doc.tile_distances {
            Some(distances) if distances.len() != line.len() => {
                return Err(SceneError::invalid(
                    field("tile_distances"),
                    format!("expected {} values, got {}", line.len(), distances.len()),
                ));
            }
            Some(distances) => distances.clone(),
            None => tile_distances_from_anchor(&line, anchor, doc.segment).unwrap_or_default(),
        };
        symbol.segment = doc.segment;
        symbol.line = line;
        symbol.tile_distances = tile_distances;
        symbol.glyph_offsets = doc.glyph_offsets.clone();
    }

    let params = convert_params(&doc.params, default_matrix, &field)?;
    let indexed = IndexedSubfeature::new(doc.feature_index).with_sort_index(doc.sort_index);
    let feature = if doc.along_line {
        CollisionFeature::along_line(boxes, indexed)
    } else {
        CollisionFeature::point(boxes[0], indexed)
    };

    Ok(SymbolCandidate {
        feature,
        symbol,
        params,
        ignore_placement: doc.params.ignore_placement,
        bucket_instance_id: doc.bucket_instance_id,
        collision_group_id: doc.collision_group_id,
        priority: doc.priority,
    })
}

fn convert_box(doc: &BoxDoc) -> Option<CollisionBox> {
    let anchor = point(doc.anchor);
    let b = match doc.radius {
        Some(radius) => CollisionBox::circle(anchor, radius, doc.distance),
        None => {
            let mut b = CollisionBox::new(anchor, doc.x1, doc.y1, doc.x2, doc.y2);
            b.signed_distance_from_anchor = doc.distance;
            b
        }
    };
    let finite = [b.x1, b.y1, b.x2, b.y2, b.signed_distance_from_anchor]
        .iter()
        .all(|v| v.is_finite());
    (finite && anchor.is_finite()).then_some(b)
}

fn convert_params(
    doc: &ParamsDoc,
    default_matrix: &Mat4,
    field: &dyn Fn(&str) -> String,
) -> Result<PlacementParams, SceneError> {
    let matrix = |m: Option<[f64; 16]>, name: &str| -> Result<Mat4, SceneError> {
        let m = m.map(Mat4::from_cols_array).unwrap_or(*default_matrix);
        if m.is_finite() {
            Ok(m)
        } else {
            Err(SceneError::invalid(field(name), "matrix must be finite"))
        }
    };
    let pos_matrix = matrix(doc.pos_matrix, "params.pos_matrix")?;
    let label_plane_matrix = matrix(doc.label_plane_matrix, "params.label_plane_matrix")?;

    for (name, v) in [
        ("params.text_pixel_ratio", doc.text_pixel_ratio),
        ("params.scale", doc.scale),
        ("params.font_size", doc.font_size),
    ] {
        if !(v.is_finite() && v > 0.0) {
            return Err(SceneError::invalid(field(name), "must be positive"));
        }
    }

    let avoid_edges = doc
        .avoid_edges
        .map(|[x1, y1, x2, y2]| Aabb2::from_edges(x1, y1, x2, y2));

    Ok(PlacementParams {
        shift: point(doc.shift),
        pos_matrix,
        label_plane_matrix,
        text_pixel_ratio: doc.text_pixel_ratio,
        scale: doc.scale,
        font_size: doc.font_size,
        allow_overlap: doc.allow_overlap,
        pitch_with_map: doc.pitch_with_map,
        collision_debug: false,
        avoid_edges,
        collision_group: doc
            .collision_group
            .map_or(CollisionGroupFilter::Any, CollisionGroupFilter::Only),
    })
}

fn point(p: [f64; 2]) -> Vec2 {
    Vec2::new(p[0], p[1])
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_FOV, Scene, SceneDoc};
    use crate::error::SceneError;
    use collision::{CollisionGroupFilter, MapMode};
    use foundation::math::{Mat4, Vec2};
    use pretty_assertions::assert_eq;

    fn assert_close(a: f64, b: f64) {
        let diff = (a - b).abs();
        assert!(diff <= 1e-9, "expected {a} ~= {b} (diff {diff})");
    }

    fn invalid_field(text: &str) -> String {
        match Scene::from_json(text) {
            Err(SceneError::Invalid { field, .. }) => field,
            other => panic!("expected invalid scene, got {other:?}"),
        }
    }

    const SCENE: &str = r#"{
        "transform": { "width": 800, "height": 600, "camera_to_center_distance": 900 },
        "map_mode": "static",
        "config": { "collision_debug": true },
        "symbols": [
            {
                "feature_index": 4,
                "bucket_instance_id": 2,
                "priority": 5,
                "boxes": [ { "anchor": [100, 100], "x1": -20, "y1": -8, "x2": 20, "y2": 8 } ],
                "params": { "ignore_placement": true, "collision_group": 3 }
            },
            {
                "feature_index": 5,
                "along_line": true,
                "anchor": [300, 300],
                "segment": 0,
                "line": [[200, 300], [400, 300]],
                "glyph_offsets": [-2, 2],
                "boxes": [
                    { "anchor": [290, 300], "radius": 6, "distance": -10 },
                    { "anchor": [310, 300], "radius": 6, "distance": 10 }
                ]
            }
        ],
        "queries": [ [[0, 0], [10, 0], [10, 10]] ]
    }"#;

    #[test]
    fn parses_a_full_scene() {
        let scene = Scene::from_json(SCENE).expect("scene");
        assert_eq!(scene.map_mode, MapMode::Static);
        assert_close(scene.transform.camera_to_center_distance, 900.0);
        assert!(scene.config.collision_debug);
        assert_eq!(scene.candidates.len(), 2);
        assert_eq!(scene.queries[0][1], Vec2::new(10.0, 0.0));

        let point = &scene.candidates[0];
        assert!(point.ignore_placement);
        assert_eq!(point.bucket_instance_id, 2);
        assert_eq!(point.feature.indexed_feature.feature_index, 4);
        assert_eq!(point.params.collision_group, CollisionGroupFilter::Only(3));
        assert_eq!(point.params.pos_matrix, Mat4::pixel_ortho(800.0, 600.0));
        assert_eq!(point.symbol.anchor_point, Vec2::new(100.0, 100.0));

        let line = &scene.candidates[1];
        assert!(line.feature.along_line);
        assert_eq!(line.feature.boxes[1].radius(), 6.0);
        assert_eq!(line.feature.boxes[0].signed_distance_from_anchor, -10.0);
        assert_eq!(line.symbol.tile_distances, vec![100.0, 100.0]);
        assert_eq!(line.params.font_size, 24.0);
    }

    #[test]
    fn missing_camera_distance_uses_the_field_of_view() {
        let scene = Scene::from_json(r#"{ "transform": { "width": 100, "height": 200 } }"#)
            .expect("scene");
        let expected = 0.5 / (DEFAULT_FOV / 2.0).tan() * 200.0;
        assert_close(scene.transform.camera_to_center_distance, expected);
        assert_close(scene.transform.camera_to_center_distance, 300.0);
        assert_eq!(scene.map_mode, MapMode::Continuous);
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        assert!(matches!(Scene::from_json("{"), Err(SceneError::Json(_))));
    }

    #[test]
    fn rejects_bad_viewports() {
        assert_eq!(
            invalid_field(r#"{ "transform": { "width": 0, "height": 10 } }"#),
            "transform.width"
        );
        assert_eq!(
            invalid_field(
                r#"{ "transform": { "width": 10, "height": 10, "camera_to_center_distance": -1 } }"#
            ),
            "transform.camera_to_center_distance"
        );
    }

    #[test]
    fn rejects_bad_symbols() {
        let point_without_box = r#"{
            "transform": { "width": 10, "height": 10 },
            "symbols": [ { "boxes": [] } ]
        }"#;
        assert_eq!(invalid_field(point_without_box), "symbols[0].boxes");

        let line_without_glyphs = r#"{
            "transform": { "width": 10, "height": 10 },
            "symbols": [ {
                "along_line": true,
                "line": [[0, 0], [5, 0]],
                "boxes": [ { "anchor": [2, 0], "radius": 1 } ]
            } ]
        }"#;
        assert_eq!(invalid_field(line_without_glyphs), "symbols[0].glyph_offsets");

        let short_distances = r#"{
            "transform": { "width": 10, "height": 10 },
            "symbols": [ {
                "along_line": true,
                "anchor": [2, 0],
                "line": [[0, 0], [5, 0]],
                "tile_distances": [2],
                "glyph_offsets": [-1, 1],
                "boxes": [ { "anchor": [2, 0], "radius": 1 } ]
            } ]
        }"#;
        assert_eq!(invalid_field(short_distances), "symbols[0].tile_distances");
    }

    #[test]
    fn rejects_non_finite_matrices() {
        // JSON cannot spell infinity, so go through the document type.
        let mut doc: SceneDoc = serde_json::from_str(
            r#"{
                "transform": { "width": 10, "height": 10 },
                "symbols": [ { "boxes": [ { "anchor": [2, 0] } ] } ]
            }"#,
        )
        .expect("doc");
        let mut m = Mat4::identity().m;
        m[15] = f64::INFINITY;
        doc.symbols[0].params.label_plane_matrix = Some(m);

        match Scene::from_doc(doc) {
            Err(SceneError::Invalid { field, .. }) => {
                assert_eq!(field, "symbols[0].params.label_plane_matrix")
            }
            other => panic!("expected invalid scene, got {other:?}"),
        }
    }
}
