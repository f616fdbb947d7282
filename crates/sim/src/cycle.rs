//! Cycles: constant-speed agents with a fixed-length collidable body.

use std::f64::consts::PI;

use crate::segment::Segment;
use crate::{BODY_LENGTH, SPEED, Vec2};

/// One tick of steering intent for a cycle.
///
/// `turn` is -1.0 for left, +1.0 for right, 0.0 for straight. Values outside
/// that range are the caller's responsibility to clamp.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CycleInput {
    pub turn: f64,
}

impl CycleInput {
    pub const STRAIGHT: Self = Self { turn: 0.0 };
    pub const LEFT: Self = Self { turn: -1.0 };
    pub const RIGHT: Self = Self { turn: 1.0 };
}

/// A positioned, oriented cycle.
///
/// Speed and body length are simulation constants, not per-instance state, so
/// identical inputs move every cycle identically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cycle {
    position: Vec2,
    /// Radians. Only reduced modulo 2π when rotating.
    orientation: f64,
}

impl Cycle {
    pub fn new(position: Vec2, orientation: f64) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    /// Unit heading vector `(cos θ, sin θ)`.
    pub fn heading(&self) -> Vec2 {
        [self.orientation.cos(), self.orientation.sin()]
    }

    /// Move forward for `secs` seconds at `SPEED`.
    pub fn advance(&mut self, secs: f64) {
        let distance = secs * SPEED;
        let [hx, hy] = self.heading();
        self.position[0] += distance * hx;
        self.position[1] += distance * hy;
    }

    /// Rotate counter-clockwise by the given number of degrees.
    ///
    /// The result is reduced with a sign-preserving remainder by 2π, so a
    /// negative orientation stays negative.
    pub fn rotate(&mut self, degrees_ccw: f64) {
        let rotated = self.orientation + degrees_ccw * PI / 180.0;
        self.orientation = rotated % (2.0 * PI);
    }

    /// The collidable body: `BODY_LENGTH` long, centered on the position,
    /// running from tail (`start`) to nose (`end`) along the heading.
    pub fn body(&self) -> Segment {
        let half = BODY_LENGTH / 2.0;
        let [hx, hy] = self.heading();
        Segment::new(
            [self.position[0] - half * hx, self.position[1] - half * hy],
            [self.position[0] + half * hx, self.position[1] + half * hy],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_along_x() {
        let mut cycle = Cycle::new([0.0, 0.0], 0.0);
        cycle.advance(0.5);
        assert_eq!(cycle.position(), [0.5 * SPEED, 0.0]);
    }

    #[test]
    fn test_advance_zero_is_noop() {
        let mut cycle = Cycle::new([1.25, -3.0], 1.0);
        cycle.advance(0.0);
        assert_eq!(cycle.position(), [1.25, -3.0]);
    }

    #[test]
    fn test_rotate_degrees() {
        let mut cycle = Cycle::new([0.0, 0.0], 0.0);
        cycle.rotate(180.0);
        assert!((cycle.orientation() - PI).abs() < 1e-12);
    }

    #[test]
    fn test_rotate_wraps_full_turn() {
        let mut cycle = Cycle::new([0.0, 0.0], 0.0);
        cycle.rotate(450.0);
        assert!((cycle.orientation() - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotate_negative_keeps_sign() {
        let mut cycle = Cycle::new([0.0, 0.0], 0.0);
        cycle.rotate(-90.0);
        assert!((cycle.orientation() + PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_body_centered_on_position() {
        let cycle = Cycle::new([2.0, 1.0], 0.0);
        let body = cycle.body();
        assert_eq!(body.start, [2.0 - BODY_LENGTH / 2.0, 1.0]);
        assert_eq!(body.end, [2.0 + BODY_LENGTH / 2.0, 1.0]);
        assert!((body.length() - BODY_LENGTH).abs() < 1e-12);
    }

    #[test]
    fn test_body_follows_heading() {
        let cycle = Cycle::new([0.0, 0.0], PI);
        let body = cycle.body();
        // Tail is behind the cycle, nose points toward -x.
        assert!(body.start[0] > 0.0);
        assert!(body.end[0] < 0.0);
    }
}
