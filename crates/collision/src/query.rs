use std::collections::{BTreeMap, HashSet};

use foundation::bounds::Aabb2;
use foundation::geometry::{IntPoint, polygon_intersects_polygon};
use foundation::math::Vec2;

use crate::feature::IndexedSubfeature;
use crate::index::CollisionIndex;

impl CollisionIndex {
    /// Placed labels under a screen-space polygon, grouped by bucket instance.
    ///
    /// Both grids are searched, active first. Each `(bucket_instance_id,
    /// feature_index)` pair is reported once, in grid scan order.
    pub fn query_rendered_symbols(&self, polygon: &[Vec2]) -> BTreeMap<u32, Vec<IndexedSubfeature>> {
        let mut result: BTreeMap<u32, Vec<IndexedSubfeature>> = BTreeMap::new();
        if polygon.is_empty() || (self.collision_grid.is_empty() && self.ignored_grid.is_empty()) {
            return result;
        }

        let padding = self.projector.padding();
        let grid_query: Vec<Vec2> = polygon
            .iter()
            .map(|p| Vec2::new(p.x + padding, p.y + padding))
            .collect();
        let Some(envelope) = Aabb2::envelope(&grid_query) else {
            return result;
        };
        let int_query: Vec<IntPoint> = grid_query.iter().copied().map(IntPoint::from_vec2).collect();

        let mut candidates = self.collision_grid.query_with_boxes(&envelope);
        candidates.extend(self.ignored_grid.query_with_boxes(&envelope));

        let mut seen: HashSet<(u32, usize)> = HashSet::new();
        for (feature, bounds) in candidates {
            let key = (feature.bucket_instance_id, feature.feature_index);
            if seen.contains(&key) {
                continue;
            }
            if !polygon_intersects_box(&int_query, &bounds) {
                continue;
            }
            seen.insert(key);
            result
                .entry(feature.bucket_instance_id)
                .or_default()
                .push(feature);
        }

        result
    }
}

/// Single-pixel resolution test of a truncated polygon against a stored box.
fn polygon_intersects_box(polygon: &[IntPoint], bounds: &Aabb2) -> bool {
    let min = IntPoint::from_vec2(bounds.min);
    let max = IntPoint::from_vec2(bounds.max);
    let corners = [
        IntPoint::new(min.x, min.y),
        IntPoint::new(max.x, min.y),
        IntPoint::new(max.x, max.y),
        IntPoint::new(min.x, max.y),
    ];
    polygon_intersects_polygon(polygon, &corners)
}

#[cfg(test)]
mod tests {
    use crate::feature::{CollisionBox, CollisionFeature, IndexedSubfeature, PlacedSymbol};
    use crate::index::{CollisionIndex, PlacementParams};
    use crate::projection::{MapMode, Size, TransformState};
    use foundation::math::{Mat4, Vec2};
    use pretty_assertions::assert_eq;

    fn flat_index() -> CollisionIndex {
        CollisionIndex::new(
            TransformState::new(Size::new(1000.0, 1000.0), 0.0, 1.0),
            MapMode::Continuous,
        )
    }

    fn params() -> PlacementParams {
        PlacementParams {
            pos_matrix: Mat4::pixel_ortho(1000.0, 1000.0),
            allow_overlap: true,
            pitch_with_map: true,
            ..PlacementParams::default()
        }
    }

    fn rect(x1: f64, y1: f64, x2: f64, y2: f64) -> Vec<Vec2> {
        vec![
            Vec2::new(x1, y1),
            Vec2::new(x2, y1),
            Vec2::new(x2, y2),
            Vec2::new(x1, y2),
        ]
    }

    fn insert_point(
        index: &mut CollisionIndex,
        feature_index: usize,
        at: Vec2,
        ignore: bool,
        bucket: u32,
    ) {
        let feature = CollisionFeature::point(
            CollisionBox::new(at, -10.0, -10.0, 10.0, 10.0),
            IndexedSubfeature::new(feature_index),
        );
        let mut out = Vec::new();
        let outcome = index.place_feature(&feature, &PlacedSymbol::at(at), &params(), &mut out);
        assert!(outcome.fits);
        index.insert_feature(&feature, &out, ignore, bucket, 0);
    }

    fn ids(found: &[IndexedSubfeature]) -> Vec<usize> {
        found.iter().map(|f| f.feature_index).collect()
    }

    #[test]
    fn empty_grids_or_polygon_return_nothing() {
        let mut index = flat_index();
        assert!(index.query_rendered_symbols(&rect(0.0, 0.0, 1000.0, 1000.0)).is_empty());

        insert_point(&mut index, 1, Vec2::new(200.0, 200.0), false, 1);
        assert!(index.query_rendered_symbols(&[]).is_empty());
    }

    #[test]
    fn hit_is_grouped_by_bucket() {
        let mut index = flat_index();
        insert_point(&mut index, 1, Vec2::new(200.0, 200.0), false, 3);
        insert_point(&mut index, 2, Vec2::new(600.0, 600.0), false, 4);

        let found = index.query_rendered_symbols(&rect(195.0, 195.0, 205.0, 205.0));
        assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(ids(&found[&3]), vec![1]);
        assert_eq!(found[&3][0].bucket_instance_id, 3);

        let all = index.query_rendered_symbols(&rect(0.0, 0.0, 1000.0, 1000.0));
        assert_eq!(all.keys().copied().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn envelope_overlap_alone_is_not_a_hit() {
        let mut index = flat_index();
        insert_point(&mut index, 1, Vec2::new(200.0, 200.0), false, 1);

        // The triangle's envelope reaches the box, the triangle itself does not.
        let triangle = vec![
            Vec2::new(300.0, 200.0),
            Vec2::new(300.0, 300.0),
            Vec2::new(200.0, 300.0),
        ];
        assert!(index.query_rendered_symbols(&triangle).is_empty());
    }

    #[test]
    fn drag_region_beyond_integer_range() {
        let mut index = flat_index();
        insert_point(&mut index, 1, Vec2::new(200.0, 200.0), false, 1);
        insert_point(&mut index, 2, Vec2::new(200.0, 490.0), false, 1);

        // Vertices saturate to the i32 range once truncated.
        let wedge = vec![
            Vec2::new(-3e9, 0.0),
            Vec2::new(3e9, 500.0),
            Vec2::new(-3e9, 1000.0),
        ];
        let found = index.query_rendered_symbols(&wedge);
        assert_eq!(ids(&found[&1]), vec![2]);
    }

    #[test]
    fn ignored_grid_is_searched_after_the_active_grid() {
        let mut index = flat_index();
        insert_point(&mut index, 2, Vec2::new(200.0, 200.0), true, 1);
        insert_point(&mut index, 1, Vec2::new(210.0, 200.0), false, 1);

        let found = index.query_rendered_symbols(&rect(150.0, 150.0, 250.0, 250.0));
        assert_eq!(ids(&found[&1]), vec![1, 2]);
    }

    #[test]
    fn feature_is_reported_once_per_bucket() {
        let mut index = flat_index();
        let anchor = Vec2::new(500.0, 500.0);
        let circles = (0..11)
            .map(|i| {
                let d = -100.0 + 20.0 * i as f64;
                CollisionBox::circle(Vec2::new(anchor.x + d, anchor.y), 10.0, d)
            })
            .collect();
        let feature = CollisionFeature::along_line(circles, IndexedSubfeature::new(9));
        let symbol = PlacedSymbol::on_line(
            anchor,
            0,
            vec![Vec2::new(0.0, 500.0), Vec2::new(1000.0, 500.0)],
            vec![-100.0, 100.0],
        )
        .expect("segment");

        let mut out = Vec::new();
        assert!(index.place_feature(&feature, &symbol, &params(), &mut out).fits);
        index.insert_feature(&feature, &out, false, 2, 0);
        // Same feature index in another bucket is a different feature.
        index.insert_feature(&feature, &out, true, 5, 0);

        let found = index.query_rendered_symbols(&rect(350.0, 450.0, 650.0, 550.0));
        assert_eq!(ids(&found[&2]), vec![9]);
        assert_eq!(ids(&found[&5]), vec![9]);
    }
}
