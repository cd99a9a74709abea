use crate::math::{lerp, rot90, seg_intersect, Point2d, Vector2d};
use crate::quadtree::Rect;
use cgmath::prelude::*;
use itertools::Itertools;

/// Number of samples used to discretize a straight path.
const STRAIGHT_SAMPLES: usize = 64;

/// Number of samples used to discretize an arc path.
const ARC_SAMPLES: usize = 160;

/// Number of trailing segments of the outgoing path scanned for a merge point.
const MERGE_TAIL_WINDOW: usize = 24;

/// Number of leading segments of the incoming path scanned for a merge point.
const MERGE_HEAD_WINDOW: usize = 48;

/// Merge points are clamped to lie within this leading fraction of the
/// incoming path.
const MERGE_MAX_S: f64 = 0.25;

/// An immutable polyline with arclength parameterization.
///
/// Positions along the path are expressed as a normalized progress
/// `s ∈ [0, 1]`; out-of-range values are clamped to the nearest endpoint.
#[derive(Clone, Debug)]
pub struct RoadPath {
    /// The node sequence.
    nodes: Vec<Point2d>,
    /// Prefix sums of segment lengths; `cum[i]` is the arclength up to node `i`.
    cum: Vec<f64>,
    /// The total arclength, clamped to at least 1 px.
    length: f64,
    /// Whether the path is a straight segment. Lane changes are only
    /// permitted between straight paths.
    straight: bool,
}

impl RoadPath {
    /// Creates a path from a node sequence.
    pub fn new(nodes: Vec<Point2d>, straight: bool) -> Self {
        assert!(!nodes.is_empty(), "Path must contain atleast one node");
        let mut cum = Vec::with_capacity(nodes.len());
        cum.push(0.0);
        let mut sum = 0.0;
        for (a, b) in nodes.iter().tuple_windows() {
            sum += (b - a).magnitude();
            cum.push(sum);
        }
        // Minimum length guards the divisions in `point_at` and `advance`
        let length = f64::max(1.0, sum);
        Self {
            nodes,
            cum,
            length,
            straight,
        }
    }

    /// Creates a straight path between two points.
    pub fn straight(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let n = STRAIGHT_SAMPLES;
        let nodes = (0..=n)
            .map(|i| {
                let t = i as f64 / n as f64;
                Point2d::new(lerp(x1, x2, t), lerp(y1, y2, t))
            })
            .collect();
        Self::new(nodes, true)
    }

    /// Creates a circular arc around `(cx, cy)` with radius `r`,
    /// sweeping from `deg_start` to `deg_end` (degrees).
    pub fn arc(cx: f64, cy: f64, r: f64, deg_start: f64, deg_end: f64) -> Self {
        let (a0, a1) = (deg_start.to_radians(), deg_end.to_radians());
        let n = ARC_SAMPLES;
        let nodes = (0..=n)
            .map(|i| {
                let a = lerp(a0, a1, i as f64 / n as f64);
                Point2d::new(cx + r * a.cos(), cy + r * a.sin())
            })
            .collect();
        Self::new(nodes, false)
    }

    /// Produces an approximate parallel path, shifting each node along its
    /// local left-normal by `distance`. This is a node-based approximation
    /// rather than a true geometric offset, which is acceptable for
    /// lane-width-scale shifts.
    pub fn offset(&self, distance: f64) -> Self {
        let last = self.nodes.len() - 1;
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let t0 = self.nodes[i.saturating_sub(1)];
                let t1 = self.nodes[usize::min(i + 1, last)];
                let mut tan = t1 - t0;
                let mag = tan.magnitude();
                if mag < 1e-6 {
                    tan = Vector2d::new(1.0, 0.0);
                } else {
                    tan /= mag;
                }
                // Left normal
                p + rot90(tan) * distance
            })
            .collect();
        Self::new(nodes, self.straight)
    }

    /// The total arclength of the path in px (at least 1).
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Whether the path is a straight segment.
    pub fn is_straight(&self) -> bool {
        self.straight
    }

    /// The underlying node sequence, for rendering road geometry.
    pub fn nodes(&self) -> &[Point2d] {
        &self.nodes
    }

    /// The axis-aligned bounding box of the path.
    pub fn bounds(&self) -> Rect {
        let mut min = self.nodes[0];
        let mut max = self.nodes[0];
        for p in &self.nodes {
            min = Point2d::new(f64::min(min.x, p.x), f64::min(min.y, p.y));
            max = Point2d::new(f64::max(max.x, p.x), f64::max(max.y, p.y));
        }
        Rect::new(min, max)
    }

    /// Samples the position at progress `s`, binary-searching the arclength
    /// table and interpolating within the containing segment.
    pub fn point_at(&self, s: f64) -> Point2d {
        let target = s.clamp(0.0, 1.0) * self.length;
        let hi = self.cum.partition_point(|&c| c < target);
        if hi == 0 {
            return self.nodes[0];
        }
        if hi >= self.nodes.len() {
            return self.nodes[self.nodes.len() - 1];
        }
        let lo = hi - 1;
        let seg = self.cum[hi] - self.cum[lo];
        let t = if seg > 1e-9 {
            (target - self.cum[lo]) / seg
        } else {
            0.0
        };
        let (a, b) = (self.nodes[lo], self.nodes[hi]);
        Point2d::new(lerp(a.x, b.x, t), lerp(a.y, b.y, t))
    }

    /// Estimates the tangent heading at progress `s` in radians,
    /// by central difference.
    pub fn heading_at(&self, s: f64) -> f64 {
        let eps = 1e-3;
        let p1 = self.point_at(f64::max(0.0, s - eps));
        let p2 = self.point_at(f64::min(1.0, s + eps));
        (p2.y - p1.y).atan2(p2.x - p1.x)
    }

    /// Estimates the curvature at progress `s` using the three-point
    /// (circumscribed circle) approximation. Returns 0 for nearly collinear
    /// or coincident sample points.
    ///
    /// The sampling spacing is wider than `heading_at`'s: curvature is a
    /// second-order quantity, and samples closer together than the
    /// polyline's own chord length all land on one straight chord.
    pub fn curvature_at(&self, s: f64) -> f64 {
        let eps = 1e-2;
        let p1 = self.point_at(f64::max(0.0, s - eps));
        let p2 = self.point_at(s);
        let p3 = self.point_at(f64::min(1.0, s + eps));
        let a = (p2 - p1).magnitude();
        let b = (p3 - p2).magnitude();
        let c = (p3 - p1).magnitude();
        let denom = a * b * c;
        if denom < 1e-6 {
            return 0.0;
        }
        let area2 = ((p2.x - p1.x) * (p3.y - p1.y) - (p2.y - p1.y) * (p3.x - p1.x)).abs();
        2.0 * area2 / denom
    }

    /// Orthogonally projects a point onto the path,
    /// returning the progress of the closest point.
    pub fn project(&self, point: Point2d) -> f64 {
        let mut best_d2 = f64::INFINITY;
        let mut best_len = 0.0;
        for (i, (a, b)) in self.nodes.iter().tuple_windows().enumerate() {
            let v = b - a;
            let w = point - a;
            let vv = v.magnitude2();
            let t = if vv < 1e-9 { 0.0 } else { (v.dot(w) / vv).clamp(0.0, 1.0) };
            let d2 = (w - v * t).magnitude2();
            if d2 < best_d2 {
                best_d2 = d2;
                let seg = self.cum[i + 1] - self.cum[i];
                best_len = self.cum[i] + t * f64::max(1e-9, seg);
            }
        }
        (best_len / self.length).clamp(0.0, 1.0)
    }
}

/// Finds the merge progress on `to` for traffic leaving the end of `from`.
///
/// Scans the tail window of `from` against the head window of `to` for the
/// first intersecting segment pair. When the paths do not intersect, falls
/// back to projecting `from`'s terminal point onto `to`. Either way the
/// result is clamped to the leading portion of `to`.
pub(crate) fn merge_target(from: &RoadPath, to: &RoadPath) -> f64 {
    let na = from.nodes.len();
    let i_start = na.saturating_sub(MERGE_TAIL_WINDOW + 1);
    let j_end = usize::min(to.nodes.len() - 1, MERGE_HEAD_WINDOW);
    for i in i_start..na - 1 {
        for j in 1..=j_end {
            let hit = seg_intersect(from.nodes[i], from.nodes[i + 1], to.nodes[j - 1], to.nodes[j]);
            if let Some((_, u)) = hit {
                let seg = to.cum[j] - to.cum[j - 1];
                let s_len = to.cum[j - 1] + u * f64::max(1e-9, seg);
                return (s_len / to.length).clamp(0.0, MERGE_MAX_S);
            }
        }
    }
    f64::min(to.project(from.nodes[na - 1]), MERGE_MAX_S)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn point_at_endpoints() {
        let path = RoadPath::straight(10.0, 20.0, 110.0, 20.0);
        let p0 = path.point_at(0.0);
        let p1 = path.point_at(1.0);
        assert_approx_eq!(p0.x, 10.0);
        assert_approx_eq!(p0.y, 20.0);
        assert_approx_eq!(p1.x, 110.0);
        assert_approx_eq!(p1.y, 20.0);
        // Out-of-range progress clamps to the nearest endpoint
        assert_approx_eq!(path.point_at(-0.5).x, 10.0);
        assert_approx_eq!(path.point_at(1.5).x, 110.0);
    }

    #[test]
    fn point_at_stays_in_bounds() {
        let path = RoadPath::arc(50.0, 50.0, 40.0, 30.0, 240.0);
        let bounds = path.bounds();
        for i in 0..=100 {
            let p = path.point_at(i as f64 / 100.0);
            assert!(bounds.contains_closed(p), "{:?} outside {:?}", p, bounds);
        }
    }

    #[test]
    fn straight_heading_is_constant() {
        let path = RoadPath::straight(0.0, 0.0, 100.0, 100.0);
        let expected = std::f64::consts::FRAC_PI_4;
        for i in 1..100 {
            assert_approx_eq!(path.heading_at(i as f64 / 100.0), expected, 1e-6);
        }
    }

    #[test]
    fn arc_curvature_matches_radius() {
        let r = 100.0;
        let path = RoadPath::arc(0.0, 0.0, r, 0.0, 90.0);
        for s in [0.2, 0.5, 0.8] {
            assert_approx_eq!(path.curvature_at(s), 1.0 / r, 0.1 / r);
        }
        let line = RoadPath::straight(0.0, 0.0, 200.0, 50.0);
        assert_approx_eq!(line.curvature_at(0.5), 0.0, 1e-6);
    }

    #[test]
    fn degenerate_path_has_unit_length() {
        let path = RoadPath::new(vec![Point2d::new(5.0, 5.0), Point2d::new(5.0, 5.0)], true);
        assert_approx_eq!(path.length(), 1.0);
        let p = path.point_at(0.7);
        assert_approx_eq!(p.x, 5.0);
    }

    #[test]
    fn offset_preserves_distance() {
        let path = RoadPath::straight(0.0, 0.0, 100.0, 0.0);
        let shifted = path.offset(9.0);
        for i in 0..=10 {
            let s = i as f64 / 10.0;
            let d = shifted.point_at(s).y - path.point_at(s).y;
            assert_approx_eq!(d.abs(), 9.0, 1e-6);
        }
    }

    #[test]
    fn projection_recovers_progress() {
        let path = RoadPath::straight(0.0, 0.0, 100.0, 0.0);
        assert_approx_eq!(path.project(Point2d::new(25.0, 3.0)), 0.25, 1e-6);
        assert_approx_eq!(path.project(Point2d::new(-10.0, 0.0)), 0.0, 1e-6);
        assert_approx_eq!(path.project(Point2d::new(400.0, 2.0)), 1.0, 1e-6);
    }

    #[test]
    fn merge_target_at_intersection() {
        // `from` ends crossing `to` one quarter of the way along it
        let from = RoadPath::straight(0.0, 50.0, 30.0, -10.0);
        let to = RoadPath::straight(0.0, 0.0, 100.0, 0.0);
        let s = merge_target(&from, &to);
        assert_approx_eq!(s, 0.25, 0.01);
    }

    #[test]
    fn merge_target_falls_back_to_projection() {
        // Paths never intersect; terminal point projects onto `to`
        let from = RoadPath::straight(0.0, 30.0, 10.0, 30.0);
        let to = RoadPath::straight(0.0, 0.0, 100.0, 0.0);
        let s = merge_target(&from, &to);
        assert_approx_eq!(s, 0.1, 0.01);
    }
}
