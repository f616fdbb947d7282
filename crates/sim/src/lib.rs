//! Light Cycle Simulation Core
//!
//! This crate contains the deterministic, fixed-timestep arena simulation:
//! cycles moving at constant speed, the light trails they leave behind, the
//! collision and death rules, and a bounded snapshot history that can be
//! rewound and re-advanced.
//!
//! # Architecture Constraints
//!
//! The Simulation Core MUST NOT:
//! - Perform I/O operations (file, network, etc.)
//! - Read wall-clock time
//! - Use randomness
//! - Depend on frame rate; `RollbackWorld::advance` always steps `FIXED_DT`
//!
//! Given an identical initial `World` and an identical sequence of
//! `(dt, inputs)` calls, `World::run_for` produces bit-for-bit identical
//! state. Replay verification depends on this.

#![deny(unsafe_code)]

mod cycle;
mod ring;
mod rollback;
mod segment;
mod trail;
mod world;

pub use cycle::{Cycle, CycleInput};
pub use ring::CircularBuffer;
pub use rollback::RollbackWorld;
pub use segment::Segment;
pub use trail::Trail;
pub use world::{Player, PlayerInputs, World};

// ============================================================================
// Type Aliases
// ============================================================================

/// A single discrete simulation timestep.
pub type Tick = u64;

/// Stable player identity, assigned once at world construction.
///
/// Distinct from a player's index in `World::players()`, which shifts as
/// players die.
pub type PlayerId = u8;

/// A 2D point or vector.
pub type Vec2 = [f64; 2];

/// RGBA display color. Never read by the simulation itself.
pub type Color = [f32; 4];

pub const WHITE: Color = [1.0, 1.0, 1.0, 1.0];

// ============================================================================
// Simulation Constants (Normative)
// ============================================================================

/// Cycle speed in arena units per second.
pub const SPEED: f64 = 6.0;

/// Length of a cycle's collidable body.
pub const BODY_LENGTH: f64 = 0.9;

/// Turn rate in degrees per second at a full turn command (90 × 3.14159).
pub const TURN_RATE: f64 = 282.7431;

/// Timestep used by `RollbackWorld::advance`.
pub const FIXED_DT: f64 = 1.0 / 60.0;

/// Number of World snapshots retained by `RollbackWorld`.
pub const HISTORY_FRAMES: usize = 64;

/// Default arena side length.
pub const DEFAULT_ARENA_SIZE: f64 = 50.0;

/// Default length of each drawing and each gap phase of the dash cycle.
pub const DEFAULT_DASH_TIME: f64 = 0.2;

// ============================================================================
// StateDigest
// ============================================================================

/// StateDigest algorithm identifier.
pub const STATE_DIGEST_ALGO_ID: &str = "lcdigest-v2-fnv1a64-le-f64canon-slot-order";

/// FNV-1a 64-bit offset basis.
const FNV1A_OFFSET_BASIS: u64 = 0xcbf29ce484222325;

/// FNV-1a 64-bit prime.
const FNV1A_PRIME: u64 = 0x100000001b3;

/// FNV-1a 64-bit hasher for StateDigest computation.
#[derive(Debug, Clone)]
struct Fnv1a64 {
    state: u64,
}

impl Fnv1a64 {
    fn new() -> Self {
        Self {
            state: FNV1A_OFFSET_BASIS,
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(FNV1A_PRIME);
        }
    }

    fn update_f64(&mut self, value: f64) {
        self.update(&canonicalize_f64(value).to_le_bytes());
    }

    fn update_vec2(&mut self, value: Vec2) {
        self.update_f64(value[0]);
        self.update_f64(value[1]);
    }

    fn finish(self) -> u64 {
        self.state
    }
}

/// Canonicalize an f64 value for deterministic hashing.
///
/// Rules:
/// - `-0.0` → `+0.0`
/// - Any NaN → quiet NaN bit pattern `0x7ff8000000000000`
fn canonicalize_f64(value: f64) -> u64 {
    const QUIET_NAN_BITS: u64 = 0x7ff8000000000000;

    if value.is_nan() {
        QUIET_NAN_BITS
    } else if value == 0.0 {
        0u64
    } else {
        value.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f64_canonicalization() {
        assert_eq!(canonicalize_f64(-0.0), canonicalize_f64(0.0));
        assert_eq!(canonicalize_f64(-0.0), 0u64);

        let nan1 = f64::NAN;
        let nan2 = f64::from_bits(0x7ff0000000000001);
        assert_eq!(canonicalize_f64(nan1), canonicalize_f64(nan2));
        assert_eq!(canonicalize_f64(nan1), 0x7ff8000000000000);

        assert_eq!(canonicalize_f64(1.0), 1.0f64.to_bits());
        assert_eq!(canonicalize_f64(-1.0), (-1.0f64).to_bits());
    }

    #[test]
    fn test_fnv1a_known_vector() {
        // FNV-1a 64 of the empty input is the offset basis; of "a" is fixed.
        assert_eq!(Fnv1a64::new().finish(), FNV1A_OFFSET_BASIS);

        let mut hasher = Fnv1a64::new();
        hasher.update(b"a");
        assert_eq!(hasher.finish(), 0xaf63dc4c8601ec8c);
    }
}
