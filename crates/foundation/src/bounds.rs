use crate::math::Vec2;

/// Axis-aligned bounding box. Edges are inclusive for intersection tests.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb2 {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Aabb2 { min, max }
    }

    /// Builds from `[x1, y1, x2, y2]` edges.
    pub fn from_edges(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Aabb2::new(Vec2::new(x1, y1), Vec2::new(x2, y2))
    }

    /// Smallest box containing every point, or `None` for an empty slice.
    pub fn envelope(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut out = Aabb2::new(*first, *first);
        for p in rest {
            out.min.x = out.min.x.min(p.x);
            out.min.y = out.min.y.min(p.y);
            out.max.x = out.max.x.max(p.x);
            out.max.y = out.max.y.max(p.y);
        }
        Some(out)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    pub fn intersects(&self, other: &Aabb2) -> bool {
        self.min.x <= other.max.x
            && self.min.y <= other.max.y
            && self.max.x >= other.min.x
            && self.max.y >= other.min.y
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Vec2, radius: f64) -> Self {
        Circle { center, radius }
    }

    pub fn bounds(&self) -> Aabb2 {
        Aabb2::from_edges(
            self.center.x - self.radius,
            self.center.y - self.radius,
            self.center.x + self.radius,
            self.center.y + self.radius,
        )
    }

    pub fn intersects_circle(&self, other: &Circle) -> bool {
        let dx = other.center.x - self.center.x;
        let dy = other.center.y - self.center.y;
        let both = self.radius + other.radius;
        both * both >= dx * dx + dy * dy
    }

    pub fn intersects_aabb(&self, rect: &Aabb2) -> bool {
        let half_w = rect.width() * 0.5;
        let dist_x = (self.center.x - (rect.min.x + half_w)).abs();
        if dist_x > half_w + self.radius {
            return false;
        }

        let half_h = rect.height() * 0.5;
        let dist_y = (self.center.y - (rect.min.y + half_h)).abs();
        if dist_y > half_h + self.radius {
            return false;
        }

        if dist_x <= half_w || dist_y <= half_h {
            return true;
        }

        // Corner region.
        let dx = dist_x - half_w;
        let dy = dist_y - half_h;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}
