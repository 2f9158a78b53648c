//! World-space collision shapes.
//!
//! Colliders carry no geometry of their own. The shape is derived on demand
//! from the entity's [`Transform`](crate::Transform): its local bounds
//! translated to the world position.

use arcade_math::{Rect, Vec2};

/// Which shape a collider derives from its transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Centred on the bounds' centre, radius half the bounds' width.
    Circle,
    /// The bounds themselves.
    Rect,
}

impl ShapeKind {
    /// Build the world-space shape for local `bounds` at `position`.
    #[must_use]
    pub fn shape(self, bounds: Rect, position: Vec2) -> Shape {
        match self {
            Self::Circle => Shape::Circle {
                center: position + bounds.center(),
                radius: bounds.width / 2.0,
            },
            Self::Rect => Shape::Rect(bounds.translated(position)),
        }
    }
}

/// A temporary world-space shape used for a single overlap test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { center: Vec2, radius: f32 },
    Rect(Rect),
}

impl Shape {
    /// Strict overlap: shapes that merely touch do not intersect.
    #[must_use]
    pub fn intersects(&self, other: &Shape) -> bool {
        match (self, other) {
            (Self::Circle { center: a, radius: ra }, Self::Circle { center: b, radius: rb }) => {
                a.distance(*b) < ra + rb
            }
            (Self::Circle { center, radius }, Self::Rect(rect))
            | (Self::Rect(rect), Self::Circle { center, radius }) => {
                rect.closest_point(*center).distance(*center) < *radius
            }
            (Self::Rect(a), Self::Rect(b)) => a.intersects(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(x: f32, y: f32, radius: f32) -> Shape {
        Shape::Circle {
            center: Vec2::new(x, y),
            radius,
        }
    }

    #[test]
    fn test_circle_circle() {
        assert!(circle(0.0, 0.0, 10.0).intersects(&circle(15.0, 0.0, 10.0)));
        assert!(!circle(0.0, 0.0, 10.0).intersects(&circle(20.0, 0.0, 10.0)));
        assert!(!circle(0.0, 0.0, 10.0).intersects(&circle(30.0, 0.0, 10.0)));
    }

    #[test]
    fn test_circle_rect_is_symmetric() {
        let rect = Shape::Rect(Rect::new(10.0, -5.0, 10.0, 10.0));
        let near = circle(5.0, 0.0, 6.0);
        let far = circle(5.0, 0.0, 4.0);
        assert!(near.intersects(&rect));
        assert!(rect.intersects(&near));
        assert!(!far.intersects(&rect));
        assert!(!rect.intersects(&far));
    }

    #[test]
    fn test_circle_inside_rect() {
        let rect = Shape::Rect(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(circle(50.0, 50.0, 1.0).intersects(&rect));
    }

    #[test]
    fn test_rect_rect() {
        let a = Shape::Rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(a.intersects(&Shape::Rect(Rect::new(5.0, 5.0, 10.0, 10.0))));
        assert!(!a.intersects(&Shape::Rect(Rect::new(10.0, 0.0, 10.0, 10.0))));
    }

    #[test]
    fn test_kind_builds_world_shape() {
        let bounds = Rect::centered(20.0, 10.0);
        let position = Vec2::new(100.0, 50.0);
        assert_eq!(
            ShapeKind::Circle.shape(bounds, position),
            circle(100.0, 50.0, 10.0)
        );
        assert_eq!(
            ShapeKind::Rect.shape(bounds, position),
            Shape::Rect(Rect::new(90.0, 45.0, 20.0, 10.0))
        );
    }
}
