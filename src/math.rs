//! Mathematical structs and functions.

use cgmath::{Point2, Vector2};

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;

/// Rotates a vector 90 degrees clockwise.
pub fn rot90(vec: Vector2d) -> Vector2d {
    Vector2d::new(-vec.y, vec.x)
}

/// Linearly interpolates between two scalars.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// The 2D cross product.
fn cross(a: Vector2d, b: Vector2d) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Computes the intersection of the segments `a1..a2` and `b1..b2`.
///
/// Returns the parameters of the intersection point along each segment,
/// both in `[0, 1]`. Parallel or collinear segments yield `None`.
pub fn seg_intersect(a1: Point2d, a2: Point2d, b1: Point2d, b2: Point2d) -> Option<(f64, f64)> {
    let r = a2 - a1;
    let s = b2 - b1;
    let denom = cross(r, s);
    if denom.abs() < 1e-9 {
        return None;
    }
    let qp = b1 - a1;
    let t = cross(qp, s) / denom;
    let u = cross(qp, r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some((t, u))
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn crossing_segments() {
        let (t, u) = seg_intersect(
            Point2d::new(0.0, 0.0),
            Point2d::new(2.0, 2.0),
            Point2d::new(0.0, 2.0),
            Point2d::new(2.0, 0.0),
        )
        .unwrap();
        assert_approx_eq!(t, 0.5);
        assert_approx_eq!(u, 0.5);
    }

    #[test]
    fn parallel_segments() {
        let hit = seg_intersect(
            Point2d::new(0.0, 0.0),
            Point2d::new(1.0, 0.0),
            Point2d::new(0.0, 1.0),
            Point2d::new(1.0, 1.0),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn disjoint_segments() {
        let hit = seg_intersect(
            Point2d::new(0.0, 0.0),
            Point2d::new(1.0, 1.0),
            Point2d::new(3.0, 0.0),
            Point2d::new(4.0, 1.0),
        );
        assert!(hit.is_none());
    }
}
