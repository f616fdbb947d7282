//! 2D line segments and the open-interval intersection test.

use crate::Vec2;

/// A line segment between two points.
///
/// Zero-length segments are legal; a freshly opened trail dash starts as one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vec2,
    pub end: Vec2,
}

impl Segment {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    /// Direction vector `end - start`.
    pub fn direction(&self) -> Vec2 {
        [self.end[0] - self.start[0], self.end[1] - self.start[1]]
    }

    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(&self) -> f64 {
        let [dx, dy] = self.direction();
        dx * dx + dy * dy
    }

    /// Test whether two segments cross strictly inside both of them.
    ///
    /// Writes the segments as `x + mu * a` and `y + lambda * b` and solves the
    /// 2x2 system by Cramer's rule. Both parameters must lie in the open
    /// interval `(0, 1)`, so segments that only touch at an endpoint do not
    /// intersect.
    ///
    /// Parallel segments (zero determinant) never intersect, including
    /// collinear overlapping ones. Callers rely on this: a cycle's body is
    /// collinear with the dash it is currently drawing.
    pub fn intersects(first: &Segment, second: &Segment) -> bool {
        let x = first.start;
        let a = first.direction();
        let y = second.start;
        let b = second.direction();

        let denominator = a[1] * b[0] - a[0] * b[1];
        if denominator == 0.0 {
            return false;
        }

        let dx = y[0] - x[0];
        let dy = y[1] - x[1];

        let mu = (dy * b[0] - dx * b[1]) / denominator;
        let lambda = (a[0] * dy - a[1] * dx) / denominator;

        0.0 < mu && mu < 1.0 && 0.0 < lambda && lambda < 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(sx: f64, sy: f64, ex: f64, ey: f64) -> Segment {
        Segment::new([sx, sy], [ex, ey])
    }

    #[test]
    fn test_length() {
        let s = seg(0.0, 0.0, 3.0, 4.0);
        assert_eq!(s.length(), 5.0);
        assert_eq!(s.length_squared(), 25.0);
        assert_eq!(seg(1.0, 1.0, 1.0, 1.0).length(), 0.0);
    }

    #[test]
    fn test_interior_crossing_intersects() {
        let a = seg(-1.0, 0.0, 1.0, 0.0);
        let b = seg(0.0, -1.0, 0.0, 1.0);
        assert!(Segment::intersects(&a, &b));
        assert!(Segment::intersects(&b, &a));
    }

    #[test]
    fn test_vertical_segment_intersects() {
        // First segment has a zero x-component in its direction.
        let a = seg(0.5, -1.0, 0.5, 1.0);
        let b = seg(0.0, 0.0, 2.0, 0.5);
        assert!(Segment::intersects(&a, &b));
    }

    #[test]
    fn test_shared_endpoint_does_not_intersect() {
        let a = seg(0.0, 0.0, 1.0, 0.0);
        let b = seg(1.0, 0.0, 1.0, 1.0);
        assert!(!Segment::intersects(&a, &b));

        // Touching at the start point (t = 0)
        let c = seg(0.0, 0.0, -1.0, 1.0);
        assert!(!Segment::intersects(&a, &c));
    }

    #[test]
    fn test_t_junction_does_not_intersect() {
        // b ends exactly on the interior of a (lambda == 1)
        let a = seg(-1.0, 0.0, 1.0, 0.0);
        let b = seg(0.0, 1.0, 0.0, 0.0);
        assert!(!Segment::intersects(&a, &b));
    }

    #[test]
    fn test_parallel_never_intersects() {
        let a = seg(0.0, 0.0, 1.0, 0.0);
        let b = seg(0.0, 1.0, 1.0, 1.0);
        assert!(!Segment::intersects(&a, &b));

        // Collinear and overlapping: still reported as no intersection.
        let c = seg(0.5, 0.0, 2.0, 0.0);
        assert!(!Segment::intersects(&a, &c));
    }

    #[test]
    fn test_degenerate_segment_never_intersects() {
        let a = seg(-1.0, 0.0, 1.0, 0.0);
        let point = seg(0.0, 0.0, 0.0, 0.0);
        assert!(!Segment::intersects(&a, &point));
    }

    #[test]
    fn test_disjoint_non_parallel() {
        let a = seg(0.0, 0.0, 1.0, 0.0);
        let b = seg(2.0, -1.0, 2.0, 1.0);
        assert!(!Segment::intersects(&a, &b));
    }
}
