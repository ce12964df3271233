//! Glyph placement along a symbol's line, in the label plane.
//!
//! Collision only needs to know how far the first and last glyph reach from
//! the anchor; the walk below finds those two glyphs and reports their
//! distances in a form [`crate::ViewportProjector::approximate_tile_distance`]
//! can convert back to tile units.

use std::f64::consts::PI;

use foundation::math::{Mat4, Vec2};

use crate::feature::PlacedSymbol;

/// Where a glyph landed relative to the line vertices.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TileDistance {
    /// Tile-unit distance from the anchor to the last vertex passed.
    pub prev_tile_distance: f64,
    /// Label-plane distance from that vertex to the glyph.
    pub last_segment_viewport_distance: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlacedGlyph {
    pub point: Vec2,
    pub angle: f64,
    pub tile_distance: TileDistance,
}

/// Projects a tile point into the label plane, returning the point and `w`.
pub fn project(point: Vec2, matrix: &Mat4) -> (Vec2, f64) {
    let p = matrix.transform_point(point);
    (Vec2::new(p.x / p.w, p.y / p.w), p.w)
}

/// Places the first and last glyph of `symbol` along its line.
///
/// `anchor_point` is the anchor already projected into the label plane.
/// Returns `None` if either glyph runs off the end of the line.
pub fn place_first_and_last_glyph(
    font_scale: f64,
    line_offset_x: f64,
    line_offset_y: f64,
    flip: bool,
    anchor_point: Vec2,
    symbol: &PlacedSymbol,
    label_plane_matrix: &Mat4,
) -> Option<(PlacedGlyph, PlacedGlyph)> {
    let first_offset = *symbol.glyph_offsets.first()?;
    let last_offset = *symbol.glyph_offsets.last()?;

    let walk = LineWalk {
        line_offset_x,
        line_offset_y,
        flip,
        anchor_point,
        symbol,
        label_plane_matrix,
    };

    let first = walk.place(font_scale * first_offset)?;
    let last = walk.place(font_scale * last_offset)?;
    Some((first, last))
}

struct LineWalk<'a> {
    line_offset_x: f64,
    line_offset_y: f64,
    flip: bool,
    anchor_point: Vec2,
    symbol: &'a PlacedSymbol,
    label_plane_matrix: &'a Mat4,
}

impl LineWalk<'_> {
    fn place(&self, offset_x: f64) -> Option<PlacedGlyph> {
        let line = &self.symbol.line;
        let combined_offset_x = if self.flip {
            offset_x - self.line_offset_x
        } else {
            offset_x + self.line_offset_x
        };

        let mut dir: isize = if combined_offset_x > 0.0 { 1 } else { -1 };
        let mut angle = 0.0;
        if self.flip {
            dir = -dir;
            angle = PI;
        }
        if dir < 0 {
            angle += PI;
        }

        let initial_index = if dir > 0 {
            self.symbol.segment as isize
        } else {
            self.symbol.segment as isize + 1
        };
        let mut current_index = initial_index;

        let mut current = self.anchor_point;
        let mut prev = self.anchor_point;
        let mut distance_to_prev = 0.0;
        let mut current_segment_distance = 0.0;
        let abs_offset_x = combined_offset_x.abs();

        while distance_to_prev + current_segment_distance <= abs_offset_x {
            current_index += dir;
            if current_index < 0 || current_index as usize >= line.len() {
                // The offset does not fit on the line.
                return None;
            }

            prev = current;
            let vertex = line[current_index as usize];
            let (projected, w) = project(vertex, self.label_plane_matrix);
            current = if w > 0.0 {
                projected
            } else {
                // Behind the camera plane: extend the previous segment far enough
                // to hold the glyph instead.
                let previous_tile_point = if distance_to_prev == 0.0 {
                    self.symbol.anchor_point
                } else {
                    line[(current_index - dir) as usize]
                };
                project_truncated_line_segment(
                    previous_tile_point,
                    vertex,
                    prev,
                    abs_offset_x - distance_to_prev + 1.0,
                    self.label_plane_matrix,
                )
            };

            distance_to_prev += current_segment_distance;
            current_segment_distance = prev.distance(current);
        }

        // The glyph is on the current segment.
        let t = (abs_offset_x - distance_to_prev) / current_segment_distance;
        let prev_to_current = current - prev;
        let mut point = prev_to_current * t + prev;
        point += prev_to_current.perp()
            * (self.line_offset_y * dir as f64 / prev_to_current.length());
        let segment_angle = angle + (current.y - prev.y).atan2(current.x - prev.x);

        let prev_index = current_index - dir;
        let prev_tile_distance = if prev_index == initial_index {
            0.0
        } else {
            self.symbol
                .tile_distances
                .get(prev_index as usize)
                .copied()
                .unwrap_or(0.0)
        };

        Some(PlacedGlyph {
            point,
            angle: segment_angle,
            tile_distance: TileDistance {
                prev_tile_distance,
                last_segment_viewport_distance: abs_offset_x - distance_to_prev,
            },
        })
    }
}

/// Projects a point `minimum_length` along the line from `previous_projected`
/// toward a vertex that cannot itself be projected.
fn project_truncated_line_segment(
    previous_tile_point: Vec2,
    current_tile_point: Vec2,
    previous_projected: Vec2,
    minimum_length: f64,
    matrix: &Mat4,
) -> Vec2 {
    // Assumes the previous point is not within one unit of the camera plane.
    let unit_vertex = previous_tile_point + (previous_tile_point - current_tile_point).unit();
    let (projected_unit_vertex, _) = project(unit_vertex, matrix);
    let projected_unit_segment = previous_projected - projected_unit_vertex;
    previous_projected + projected_unit_segment * (minimum_length / projected_unit_segment.length())
}

#[cfg(test)]
mod tests {
    use super::{place_first_and_last_glyph, project};
    use crate::feature::PlacedSymbol;
    use foundation::math::{Mat4, Vec2};

    fn assert_close(a: f64, b: f64) {
        let diff = (a - b).abs();
        assert!(diff <= 1e-9, "expected {a} ~= {b} (diff {diff})");
    }

    fn bent_symbol() -> PlacedSymbol {
        // Anchor on the middle segment of an L-ish line.
        PlacedSymbol::on_line(
            Vec2::new(150.0, 0.0),
            1,
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(100.0, 0.0),
                Vec2::new(200.0, 0.0),
                Vec2::new(200.0, 100.0),
            ],
            vec![-30.0, 80.0],
        )
        .expect("valid segment")
    }

    #[test]
    fn project_divides_by_w() {
        let mut m = Mat4::identity();
        m.m[15] = 2.0;
        let (p, w) = project(Vec2::new(4.0, 6.0), &m);
        assert_eq!(p, Vec2::new(2.0, 3.0));
        assert_eq!(w, 2.0);
    }

    #[test]
    fn glyphs_on_the_anchor_segment_report_zero_prev_distance() {
        let mut symbol = bent_symbol();
        symbol.glyph_offsets = vec![-20.0, 20.0];
        let m = Mat4::identity();
        let (first, last) =
            place_first_and_last_glyph(1.0, 0.0, 0.0, false, symbol.anchor_point, &symbol, &m)
                .expect("fits");

        assert_close(first.point.x, 130.0);
        assert_close(last.point.x, 170.0);
        assert_close(first.tile_distance.prev_tile_distance, 0.0);
        assert_close(first.tile_distance.last_segment_viewport_distance, 20.0);
        assert_close(last.tile_distance.prev_tile_distance, 0.0);
        assert_close(last.tile_distance.last_segment_viewport_distance, 20.0);
        // Walking backwards flips the segment angle by a half turn.
        assert_close(first.angle.sin().abs(), 0.0);
        assert_close(last.angle, 0.0);
    }

    #[test]
    fn glyph_past_a_vertex_carries_the_vertex_distance() {
        let symbol = bent_symbol();
        let m = Mat4::identity();
        let (first, last) =
            place_first_and_last_glyph(1.0, 0.0, 0.0, false, symbol.anchor_point, &symbol, &m)
                .expect("fits");

        // Last glyph at +80: 50 to the corner, then 30 down the vertical segment.
        assert_close(last.point.x, 200.0);
        assert_close(last.point.y, 30.0);
        assert_close(last.tile_distance.prev_tile_distance, 50.0);
        assert_close(last.tile_distance.last_segment_viewport_distance, 30.0);
        assert_close(last.angle, std::f64::consts::FRAC_PI_2);

        assert_close(first.point.x, 120.0);
    }

    #[test]
    fn font_scale_and_line_offset() {
        let mut symbol = bent_symbol();
        symbol.glyph_offsets = vec![-10.0, 10.0];
        let m = Mat4::identity();
        let (first, last) =
            place_first_and_last_glyph(2.0, 0.0, 5.0, false, symbol.anchor_point, &symbol, &m)
                .expect("fits");

        assert_close(last.point.x, 170.0);
        assert_close(last.point.y, 5.0);
        // Both walk directions push the glyph to the same side of the line.
        assert_close(first.point.x, 130.0);
        assert_close(first.point.y, 5.0);
    }

    #[test]
    fn running_off_the_line_fails() {
        let mut symbol = bent_symbol();
        symbol.glyph_offsets = vec![-151.0, 10.0];
        let m = Mat4::identity();
        assert!(
            place_first_and_last_glyph(1.0, 0.0, 0.0, false, symbol.anchor_point, &symbol, &m)
                .is_none()
        );

        symbol.glyph_offsets = vec![-10.0, 151.0];
        assert!(
            place_first_and_last_glyph(1.0, 0.0, 0.0, false, symbol.anchor_point, &symbol, &m)
                .is_none()
        );

        symbol.glyph_offsets.clear();
        assert!(
            place_first_and_last_glyph(1.0, 0.0, 0.0, false, symbol.anchor_point, &symbol, &m)
                .is_none()
        );
    }

    #[test]
    fn vertices_behind_the_camera_are_extrapolated() {
        // w = 1 - x / 180: the vertex at x = 200 is behind the camera plane.
        let mut m = Mat4::identity();
        m.m[3] = -1.0 / 180.0;
        let symbol = PlacedSymbol::on_line(
            Vec2::new(90.0, 0.0),
            0,
            vec![Vec2::new(0.0, 0.0), Vec2::new(200.0, 0.0)],
            vec![-1.0, 1.0],
        )
        .expect("valid segment");

        let (anchor, w) = project(symbol.anchor_point, &m);
        assert!(w > 0.0);
        let (_, last) = place_first_and_last_glyph(1.0, 0.0, 0.0, false, anchor, &symbol, &m)
            .expect("extrapolated segment holds the glyph");
        assert!(last.point.is_finite());
        assert!(last.point.x > anchor.x);
        assert_close(last.tile_distance.last_segment_viewport_distance, 1.0);
    }
}
