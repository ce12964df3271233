use foundation::bounds::{Aabb2, Circle};

/// A collision shape in grid (padded viewport) pixel space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CollisionShape {
    Box(Aabb2),
    Circle(Circle),
}

impl CollisionShape {
    pub fn bounds(&self) -> Aabb2 {
        match self {
            CollisionShape::Box(b) => *b,
            CollisionShape::Circle(c) => c.bounds(),
        }
    }

    pub fn as_circle(&self) -> Option<&Circle> {
        match self {
            CollisionShape::Circle(c) => Some(c),
            CollisionShape::Box(_) => None,
        }
    }

    pub fn intersects_box(&self, other: &Aabb2) -> bool {
        match self {
            CollisionShape::Box(b) => b.intersects(other),
            CollisionShape::Circle(c) => c.intersects_aabb(other),
        }
    }

    pub fn intersects_circle(&self, other: &Circle) -> bool {
        match self {
            CollisionShape::Box(b) => other.intersects_aabb(b),
            CollisionShape::Circle(c) => c.intersects_circle(other),
        }
    }
}
