use std::collections::HashSet;

use foundation::bounds::{Aabb2, Circle};
use foundation::math::Vec2;

use crate::shape::CollisionShape;

/// Uniform-cell spatial index over boxes and circles.
///
/// Every element is registered in each cell its bounding box touches; cell
/// coordinates outside the grid are clamped to the border cells. There is no
/// removal: the owner builds a fresh grid for every placement pass.
///
/// Ordering contract:
/// - Queries scan cells column by column (x outer, y inner), boxes before
///   circles within a cell, elements in insertion order within a cell list.
/// - Each stored element is reported at most once per query. A value stored
///   under several elements (e.g. a chain of circles) can be reported several times.
#[derive(Debug, Clone)]
pub struct GridIndex<T> {
    width: f64,
    height: f64,
    x_cell_count: usize,
    y_cell_count: usize,
    x_scale: f64,
    y_scale: f64,
    box_elements: Vec<(T, Aabb2)>,
    circle_elements: Vec<(T, Circle)>,
    box_cells: Vec<Vec<usize>>,
    circle_cells: Vec<Vec<usize>>,
}

impl<T> GridIndex<T> {
    pub fn new(width: f64, height: f64, cell_size: f64) -> Self {
        debug_assert!(width > 0.0 && height > 0.0, "grid must have an area");
        debug_assert!(cell_size > 0.0, "cell size must be positive");

        let x_cell_count = ((width / cell_size).ceil() as usize).max(1);
        let y_cell_count = ((height / cell_size).ceil() as usize).max(1);
        let cell_count = x_cell_count * y_cell_count;

        Self {
            width,
            height,
            x_cell_count,
            y_cell_count,
            x_scale: x_cell_count as f64 / width,
            y_scale: y_cell_count as f64 / height,
            box_elements: Vec::new(),
            circle_elements: Vec::new(),
            box_cells: vec![Vec::new(); cell_count],
            circle_cells: vec![Vec::new(); cell_count],
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn cell_counts(&self) -> (usize, usize) {
        (self.x_cell_count, self.y_cell_count)
    }

    /// True until the first insert.
    pub fn is_empty(&self) -> bool {
        self.box_elements.is_empty() && self.circle_elements.is_empty()
    }

    /// Number of stored elements (boxes plus circles).
    pub fn len(&self) -> usize {
        self.box_elements.len() + self.circle_elements.len()
    }

    pub fn insert(&mut self, value: T, shape: CollisionShape) {
        match shape {
            CollisionShape::Box(b) => self.insert_box(value, b),
            CollisionShape::Circle(c) => self.insert_circle(value, c),
        }
    }

    pub fn insert_box(&mut self, value: T, bounds: Aabb2) {
        let uid = self.box_elements.len();
        self.box_elements.push((value, bounds));

        let (cx1, cy1) = self.cell_of(bounds.min);
        let (cx2, cy2) = self.cell_of(bounds.max);
        for x in cx1..=cx2 {
            for y in cy1..=cy2 {
                let cell = self.x_cell_count * y + x;
                self.box_cells[cell].push(uid);
            }
        }
    }

    pub fn insert_circle(&mut self, value: T, circle: Circle) {
        let uid = self.circle_elements.len();
        self.circle_elements.push((value, circle));

        let bounds = circle.bounds();
        let (cx1, cy1) = self.cell_of(bounds.min);
        let (cx2, cy2) = self.cell_of(bounds.max);
        for x in cx1..=cx2 {
            for y in cy1..=cy2 {
                let cell = self.x_cell_count * y + x;
                self.circle_cells[cell].push(uid);
            }
        }
    }

    /// Returns `true` if `shape` overlaps any stored element accepted by `predicate`.
    ///
    /// A missing predicate accepts everything.
    pub fn hit_test(&self, shape: &CollisionShape, predicate: Option<&dyn Fn(&T) -> bool>) -> bool {
        let mut hit = false;
        self.visit(shape, |value, _| {
            if predicate.is_none_or(|accept| accept(value)) {
                hit = true;
                return true;
            }
            false
        });
        hit
    }

    /// Every stored element overlapping `query`, with its stored bounds.
    ///
    /// Circles are reported by their bounding box. Callers that need one entry
    /// per value must deduplicate.
    pub fn query_with_boxes(&self, query: &Aabb2) -> Vec<(T, Aabb2)>
    where
        T: Clone,
    {
        let mut out = Vec::new();
        self.visit(&CollisionShape::Box(*query), |value, bounds| {
            out.push((value.clone(), bounds));
            false
        });
        out
    }

    /// Calls `f` for each overlapping element until it returns `true`.
    fn visit<F>(&self, shape: &CollisionShape, mut f: F)
    where
        F: FnMut(&T, Aabb2) -> bool,
    {
        let query_bounds = shape.bounds();
        if self.no_intersection(&query_bounds) {
            return;
        }

        if self.complete_intersection(shape) {
            for (value, bounds) in &self.box_elements {
                if shape.intersects_box(bounds) && f(value, *bounds) {
                    return;
                }
            }
            for (value, circle) in &self.circle_elements {
                if shape.intersects_circle(circle) && f(value, circle.bounds()) {
                    return;
                }
            }
            return;
        }

        let mut seen_boxes: HashSet<usize> = HashSet::new();
        let mut seen_circles: HashSet<usize> = HashSet::new();

        let (cx1, cy1) = self.cell_of(query_bounds.min);
        let (cx2, cy2) = self.cell_of(query_bounds.max);
        for x in cx1..=cx2 {
            for y in cy1..=cy2 {
                let cell = self.x_cell_count * y + x;

                for &uid in &self.box_cells[cell] {
                    if !seen_boxes.insert(uid) {
                        continue;
                    }
                    let (value, bounds) = &self.box_elements[uid];
                    if shape.intersects_box(bounds) && f(value, *bounds) {
                        return;
                    }
                }

                for &uid in &self.circle_cells[cell] {
                    if !seen_circles.insert(uid) {
                        continue;
                    }
                    let (value, circle) = &self.circle_elements[uid];
                    if shape.intersects_circle(circle) && f(value, circle.bounds()) {
                        return;
                    }
                }
            }
        }
    }

    fn cell_of(&self, p: Vec2) -> (usize, usize) {
        (
            clamp_cell(p.x * self.x_scale, self.x_cell_count),
            clamp_cell(p.y * self.y_scale, self.y_cell_count),
        )
    }

    fn no_intersection(&self, query: &Aabb2) -> bool {
        query.max.x < 0.0 || query.min.x >= self.width || query.max.y < 0.0 || query.min.y >= self.height
    }

    fn complete_intersection(&self, shape: &CollisionShape) -> bool {
        match shape {
            CollisionShape::Box(b) => {
                b.min.x <= 0.0 && b.min.y <= 0.0 && self.width <= b.max.x && self.height <= b.max.y
            }
            CollisionShape::Circle(c) => {
                let r2 = c.radius * c.radius;
                [
                    Vec2::new(0.0, 0.0),
                    Vec2::new(self.width, 0.0),
                    Vec2::new(0.0, self.height),
                    Vec2::new(self.width, self.height),
                ]
                .iter()
                .all(|corner| {
                    let dx = corner.x - c.center.x;
                    let dy = corner.y - c.center.y;
                    dx * dx + dy * dy <= r2
                })
            }
        }
    }
}

fn clamp_cell(scaled: f64, count: usize) -> usize {
    let cell = scaled.floor();
    if cell.is_nan() || cell <= 0.0 {
        0
    } else {
        (cell as usize).min(count - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::GridIndex;
    use crate::shape::CollisionShape;
    use foundation::bounds::{Aabb2, Circle};
    use foundation::math::Vec2;

    fn boxed(x1: f64, y1: f64, x2: f64, y2: f64) -> CollisionShape {
        CollisionShape::Box(Aabb2::from_edges(x1, y1, x2, y2))
    }

    fn circle(x: f64, y: f64, r: f64) -> CollisionShape {
        CollisionShape::Circle(Circle::new(Vec2::new(x, y), r))
    }

    #[test]
    fn starts_empty() {
        let mut grid: GridIndex<u32> = GridIndex::new(100.0, 100.0, 25.0);
        assert!(grid.is_empty());
        assert_eq!(grid.cell_counts(), (4, 4));
        assert!(!grid.hit_test(&boxed(0.0, 0.0, 100.0, 100.0), None));

        grid.insert(1, boxed(10.0, 10.0, 20.0, 20.0));
        assert!(!grid.is_empty());
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn partial_cells_round_up() {
        let grid: GridIndex<u32> = GridIndex::new(260.0, 10.0, 25.0);
        assert_eq!(grid.cell_counts(), (11, 1));
    }

    #[test]
    fn hit_test_uses_exact_geometry_not_cells() {
        let mut grid = GridIndex::new(100.0, 100.0, 25.0);
        grid.insert(1u32, boxed(0.0, 0.0, 10.0, 10.0));

        // Same cell, no overlap.
        assert!(!grid.hit_test(&boxed(12.0, 12.0, 20.0, 20.0), None));
        assert!(grid.hit_test(&boxed(5.0, 5.0, 20.0, 20.0), None));

        // Circle reaching into the box corner region.
        assert!(!grid.hit_test(&circle(14.0, 14.0, 5.0), None));
        assert!(grid.hit_test(&circle(13.0, 13.0, 5.0), None));
    }

    #[test]
    fn circles_against_circles() {
        let mut grid = GridIndex::new(200.0, 200.0, 25.0);
        grid.insert(7u32, circle(100.0, 100.0, 10.0));

        assert!(grid.hit_test(&circle(115.0, 100.0, 5.0), None));
        assert!(!grid.hit_test(&circle(116.0, 100.0, 5.0), None));
        assert!(grid.hit_test(&boxed(108.0, 95.0, 120.0, 105.0), None));
    }

    #[test]
    fn predicate_filters_hits() {
        let mut grid = GridIndex::new(100.0, 100.0, 25.0);
        grid.insert(1u32, boxed(0.0, 0.0, 50.0, 50.0));
        grid.insert(2u32, circle(75.0, 75.0, 10.0));

        let only_two = |v: &u32| *v == 2;
        assert!(!grid.hit_test(&boxed(10.0, 10.0, 20.0, 20.0), Some(&only_two)));
        assert!(grid.hit_test(&boxed(70.0, 70.0, 80.0, 80.0), Some(&only_two)));
        assert!(grid.hit_test(&boxed(10.0, 10.0, 20.0, 20.0), None));
    }

    #[test]
    fn queries_outside_grid_never_hit() {
        let mut grid = GridIndex::new(100.0, 100.0, 25.0);
        // Clamped into the border cells, but still stored with its real bounds.
        grid.insert(1u32, boxed(-50.0, -50.0, -10.0, -10.0));
        assert!(!grid.hit_test(&boxed(-40.0, -40.0, -20.0, -20.0), None));
        assert!(!grid.hit_test(&boxed(100.0, 0.0, 120.0, 20.0), None));
    }

    #[test]
    fn query_covering_whole_grid_still_checks_geometry() {
        let mut grid = GridIndex::new(100.0, 100.0, 25.0);
        grid.insert(1u32, boxed(10.0, 10.0, 20.0, 20.0));
        grid.insert(2u32, boxed(-80.0, -80.0, -60.0, -60.0));
        grid.insert(3u32, circle(50.0, 50.0, 5.0));

        let hits = grid.query_with_boxes(&Aabb2::from_edges(-5.0, -5.0, 150.0, 150.0));
        let values: Vec<u32> = hits.iter().map(|(v, _)| *v).collect();
        assert_eq!(values, vec![1, 3]);
        assert_eq!(hits[1].1, Aabb2::from_edges(45.0, 45.0, 55.0, 55.0));
    }

    #[test]
    fn element_spanning_cells_is_reported_once_per_query() {
        let mut grid = GridIndex::new(100.0, 100.0, 25.0);
        // Spans 3x2 cells.
        grid.insert(9u32, boxed(10.0, 10.0, 60.0, 30.0));
        let hits = grid.query_with_boxes(&Aabb2::from_edges(0.0, 0.0, 99.0, 99.0));
        assert_eq!(hits.len(), 1);

        // Two circles with the same value are two elements.
        grid.insert(4u32, circle(80.0, 80.0, 3.0));
        grid.insert(4u32, circle(85.0, 80.0, 3.0));
        let hits = grid.query_with_boxes(&Aabb2::from_edges(70.0, 70.0, 99.0, 99.0));
        assert_eq!(hits.iter().filter(|(v, _)| *v == 4).count(), 2);
    }

    #[test]
    fn results_follow_cell_scan_order() {
        let mut grid = GridIndex::new(100.0, 100.0, 25.0);
        grid.insert(1u32, boxed(80.0, 5.0, 90.0, 10.0)); // cell (3, 0)
        grid.insert(2u32, boxed(5.0, 80.0, 10.0, 90.0)); // cell (0, 3)
        let hits = grid.query_with_boxes(&Aabb2::from_edges(1.0, 1.0, 95.0, 95.0));
        let values: Vec<u32> = hits.iter().map(|(v, _)| *v).collect();
        assert_eq!(values, vec![2, 1]);
    }
}
