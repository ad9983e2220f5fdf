//! Mathematical structs and functions.

use cgmath::{Point2, Vector2};

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;

/// Tolerance used by the orientation tests.
const EPSILON: f64 = 1e-9;

/// A straight line segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSegment2d {
    pub start: Point2d,
    pub end: Point2d,
}

/// Rotates a vector 90 degrees clockwise, giving the right hand side of a heading.
pub fn rot90_cw(vec: Vector2d) -> Vector2d {
    Vector2d::new(vec.y, -vec.x)
}

/// Computes the z component of the cross product of two vectors.
pub fn cross(a: Vector2d, b: Vector2d) -> f64 {
    a.x * b.y - a.y * b.x
}

impl LineSegment2d {
    /// Creates a line segment between two points.
    pub fn from_ends(start: Point2d, end: Point2d) -> Self {
        Self { start, end }
    }

    /// Checks whether two segments touch or cross, including at their end points.
    pub fn intersects(&self, other: &Self) -> bool {
        let d1 = orientation(other.start, other.end, self.start);
        let d2 = orientation(other.start, other.end, self.end);
        let d3 = orientation(self.start, self.end, other.start);
        let d4 = orientation(self.start, self.end, other.end);

        if d1 * d2 < 0.0 && d3 * d4 < 0.0 {
            return true;
        }

        // Collinear or touching cases
        (d1 == 0.0 && other.bounds_contain(self.start))
            || (d2 == 0.0 && other.bounds_contain(self.end))
            || (d3 == 0.0 && self.bounds_contain(other.start))
            || (d4 == 0.0 && self.bounds_contain(other.end))
    }

    /// Checks whether a point lies within the axis-aligned bounds of the segment.
    fn bounds_contain(&self, point: Point2d) -> bool {
        let (min_x, max_x) = min_max(self.start.x, self.end.x);
        let (min_y, max_y) = min_max(self.start.y, self.end.y);
        point.x >= min_x - EPSILON
            && point.x <= max_x + EPSILON
            && point.y >= min_y - EPSILON
            && point.y <= max_y + EPSILON
    }
}

/// Returns the sign of the turn from `a -> b` to `a -> c`, snapped to zero within tolerance.
fn orientation(a: Point2d, b: Point2d, c: Point2d) -> f64 {
    let value = cross(b - a, c - a);
    if value.abs() < EPSILON {
        0.0
    } else {
        value.signum()
    }
}

fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(a: (f64, f64), b: (f64, f64)) -> LineSegment2d {
        LineSegment2d::from_ends(Point2d::new(a.0, a.1), Point2d::new(b.0, b.1))
    }

    #[test]
    fn crossing_segments_intersect() {
        let a = segment((-1.0, 0.0), (1.0, 0.0));
        let b = segment((0.0, -1.0), (0.0, 1.0));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        let a = segment((-0.5, 1.0), (-0.5, -1.0));
        let b = segment((0.5, -1.0), (0.5, 1.0));
        assert!(!a.intersects(&b));
    }

    #[test]
    fn shared_end_point_counts_as_intersection() {
        let a = segment((-0.5, 1.0), (-1.0, 0.5));
        let b = segment((1.0, 0.5), (-1.0, 0.5));
        assert!(a.intersects(&b));
    }

    #[test]
    fn collinear_disjoint_segments_do_not_intersect() {
        let a = segment((0.0, 0.0), (1.0, 0.0));
        let b = segment((2.0, 0.0), (3.0, 0.0));
        assert!(!a.intersects(&b));
    }

    #[test]
    fn right_hand_side_of_heading() {
        let right = rot90_cw(Vector2d::new(0.0, -1.0));
        assert_eq!(right, Vector2d::new(-1.0, 0.0));
    }
}
