//! Scripted steering for headless matches.
//!
//! Each bot probes straight ahead, then diagonally right and left, and takes
//! the first direction whose probe stays clear of walls and trails. The
//! decision reads only the world, so a match between bots is fully
//! determined by its initial world.

use std::f64::consts::FRAC_PI_4;

use lightcycle_sim::{CycleInput, Player, PlayerInputs, Segment, Trail, Vec2, World};

/// How far ahead of the nose a probe reaches.
pub const LOOKAHEAD: f64 = 4.0;

/// Distance from the walls that probes treat as blocked.
pub const WALL_MARGIN: f64 = 1.0;

/// Steering for every living player.
pub fn steer(world: &World) -> PlayerInputs {
    world
        .players()
        .iter()
        .map(|player| (player.id, steer_one(world, player)))
        .collect()
}

fn steer_one(world: &World, player: &Player) -> CycleInput {
    let nose = player.cycle.body().end;
    let orientation = player.cycle.orientation();

    // A right turn rotates clockwise.
    if !blocked(world, nose, orientation) {
        CycleInput::STRAIGHT
    } else if !blocked(world, nose, orientation - FRAC_PI_4) {
        CycleInput::RIGHT
    } else {
        CycleInput::LEFT
    }
}

fn blocked(world: &World, from: Vec2, angle: f64) -> bool {
    let to = [
        from[0] + LOOKAHEAD * angle.cos(),
        from[1] + LOOKAHEAD * angle.sin(),
    ];

    let limit = world.size() / 2.0 - WALL_MARGIN;
    if to[0].abs() > limit || to[1].abs() > limit {
        return true;
    }

    let probe = Segment::new(from, to);
    world
        .trails()
        .iter()
        .flat_map(Trail::segments)
        .any(|segment| Segment::intersects(&probe, segment))
}
