//! The authoritative per-tick arena state and its collision rules.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::cycle::{Cycle, CycleInput};
use crate::segment::Segment;
use crate::trail::Trail;
use crate::{
    Color, DEFAULT_ARENA_SIZE, DEFAULT_DASH_TIME, Fnv1a64, PlayerId, TURN_RATE, Vec2, WHITE,
};

/// Per-tick steering, keyed by stable player identity.
///
/// Pairs for identities that are not alive are ignored. When an identity
/// appears more than once the last pair wins.
pub type PlayerInputs = Vec<(PlayerId, CycleInput)>;

/// A living participant.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub cycle: Cycle,
    pub id: PlayerId,
    pub name: Arc<str>,
    pub color: Color,
    pub trail_color: Color,
}

impl Player {
    pub fn new(id: PlayerId, name: &str, cycle: Cycle) -> Self {
        Self {
            cycle,
            id,
            name: Arc::from(name),
            color: WHITE,
            trail_color: WHITE,
        }
    }

    pub fn with_colors(mut self, color: Color, trail_color: Color) -> Self {
        self.color = color;
        self.trail_color = trail_color;
        self
    }
}

/// The authoritative simulation state container.
///
/// `trails[..players.len()]` belong to the living players, index for index.
/// `trails[players.len()..]` belong to dead players; they are kept for the
/// rest of the world's life and stay lethal.
#[derive(Debug, PartialEq)]
pub struct World {
    /// Arena side length; the arena spans `[-size/2, size/2]` on both axes.
    size: f64,
    /// Length of each drawing phase and each gap phase.
    dash_time: f64,
    /// Time into the current dash cycle, in `[0, 2 * dash_time)`.
    cur_time: f64,
    drawing: bool,
    /// Number of dashes opened so far; identifies the current one.
    dash: u64,
    players: Vec<Player>,
    trails: Vec<Trail>,
}

impl World {
    /// Create a world with one trail per player slot.
    ///
    /// # Panics
    /// If `dash_time` is not strictly positive.
    pub fn new(size: f64, dash_time: f64, players: Vec<Player>) -> Self {
        assert!(dash_time > 0.0, "dash_time must be positive");

        let trails = players
            .iter()
            .map(|player| Trail::new(player.trail_color))
            .collect();

        Self {
            size,
            dash_time,
            cur_time: 0.0,
            drawing: false,
            dash: 0,
            players,
            trails,
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn trails(&self) -> &[Trail] {
        &self.trails
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn dash_time(&self) -> f64 {
        self.dash_time
    }

    /// Whether the current dash phase is laying down trail.
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Find a living player by identity.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.player(id).is_some()
    }

    /// The trail of a living player.
    pub fn trail_of(&self, id: PlayerId) -> Option<&Trail> {
        let idx = self.players.iter().position(|p| p.id == id)?;
        self.trails.get(idx)
    }

    /// Advance the whole world by exactly `secs` seconds.
    ///
    /// Order: resolve inputs, move, grow trails, detect collisions, remove the
    /// dead. Collisions are checked once, against post-movement positions.
    /// Players without an input this tick neither move nor draw.
    pub fn run_for(&mut self, secs: f64, inputs: &[(PlayerId, CycleInput)]) {
        let resolved = self.resolve_inputs(inputs);

        for (player, input) in self.players.iter_mut().zip(&resolved) {
            if let Some(input) = input {
                player.cycle.rotate(-input.turn * TURN_RATE * secs);
                player.cycle.advance(secs);
            }
        }

        self.grow_trails(secs, &resolved);

        let kill = self.collisions();
        self.remove_dead(&kill);
    }

    /// Compute the StateDigest for the current world state.
    ///
    /// FNV-1a 64-bit over canonicalized little-endian f64 bits. Players are
    /// hashed in array order, trails in slot order. Names and colors are
    /// display-only and are not hashed.
    pub fn state_digest(&self) -> u64 {
        let mut hasher = Fnv1a64::new();

        hasher.update_f64(self.size);
        hasher.update_f64(self.dash_time);
        hasher.update_f64(self.cur_time);
        hasher.update(&[u8::from(self.drawing)]);
        hasher.update(&self.dash.to_le_bytes());

        hasher.update(&(self.players.len() as u64).to_le_bytes());
        for player in &self.players {
            hasher.update(&[player.id]);
            hasher.update_vec2(player.cycle.position());
            hasher.update_f64(player.cycle.orientation());
        }

        hasher.update(&(self.trails.len() as u64).to_le_bytes());
        for trail in &self.trails {
            hasher.update(&(trail.len() as u64).to_le_bytes());
            hasher.update(&trail.dash().map_or(0, |dash| dash + 1).to_le_bytes());
            for segment in trail.segments() {
                hasher.update_vec2(segment.start);
                hasher.update_vec2(segment.end);
            }
        }

        hasher.finish()
    }

    // ========================================================================
    // Internal Methods
    // ========================================================================

    /// Map inputs onto current array positions.
    ///
    /// The id → index lookup is rebuilt every call because positions shift as
    /// players are swap-removed.
    fn resolve_inputs(&self, inputs: &[(PlayerId, CycleInput)]) -> Vec<Option<CycleInput>> {
        let index_of: HashMap<PlayerId, usize> = self
            .players
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.id, idx))
            .collect();

        let mut resolved = vec![None; self.players.len()];
        for (id, input) in inputs {
            if let Some(&idx) = index_of.get(id) {
                resolved[idx] = Some(*input);
            }
        }
        resolved
    }

    /// Advance the dash timer and stretch or open trail segments.
    ///
    /// The cycle alternates a drawing phase and a gap phase, each `dash_time`
    /// long. The tick that ends a drawing phase leaves trails untouched.
    fn grow_trails(&mut self, secs: f64, resolved: &[Option<CycleInput>]) {
        let period = 2.0 * self.dash_time;
        self.cur_time += secs;

        if self.drawing && self.cur_time > period {
            self.drawing = false;
        } else if self.drawing {
            // Players idle on the opening tick join the dash late.
            self.draw_trails(resolved);
        } else if self.cur_time > self.dash_time {
            self.dash += 1;
            self.draw_trails(resolved);
            self.drawing = true;
        }

        self.cur_time %= period;
    }

    fn draw_trails(&mut self, resolved: &[Option<CycleInput>]) {
        for (idx, input) in resolved.iter().enumerate() {
            if input.is_some() {
                let tail = self.players[idx].cycle.body().start;
                self.trails[idx].draw(self.dash, tail);
            }
        }
    }

    /// Indices into `players` that die this tick.
    fn collisions(&self) -> BTreeSet<usize> {
        let bodies: Vec<Segment> = self.players.iter().map(|p| p.cycle.body()).collect();
        let mut kill = BTreeSet::new();

        let half = self.size / 2.0;
        for (idx, body) in bodies.iter().enumerate() {
            if !in_arena(body.start, half) || !in_arena(body.end, half) {
                kill.insert(idx);
            }
        }

        for (i, first) in bodies.iter().enumerate() {
            for (j, second) in bodies.iter().enumerate().skip(i + 1) {
                if Segment::intersects(first, second) {
                    kill.insert(i);
                    kill.insert(j);
                }
            }
        }

        // Every trail is lethal, including the player's own and the dead's.
        for (idx, body) in bodies.iter().enumerate() {
            let hit = self
                .trails
                .iter()
                .flat_map(Trail::segments)
                .any(|segment| Segment::intersects(body, segment));
            if hit {
                kill.insert(idx);
            }
        }

        kill
    }

    /// Swap-remove killed players, highest index first.
    ///
    /// Each killed player is swapped with the last living player, in both
    /// `players` and `trails`, then `players` shrinks. Descending order keeps
    /// every pending index valid. Trails are never removed.
    fn remove_dead(&mut self, kill: &BTreeSet<usize>) {
        for &idx in kill.iter().rev() {
            let last = self.players.len() - 1;
            self.players.swap(idx, last);
            self.trails.swap(idx, last);
            self.players.pop();
        }
    }
}

/// Closed-range containment: a point exactly on the wall is inside.
fn in_arena(point: Vec2, half: f64) -> bool {
    (-half..=half).contains(&point[0]) && (-half..=half).contains(&point[1])
}

impl Default for World {
    fn default() -> Self {
        Self::new(DEFAULT_ARENA_SIZE, DEFAULT_DASH_TIME, Vec::new())
    }
}

impl Clone for World {
    fn clone(&self) -> Self {
        Self {
            size: self.size,
            dash_time: self.dash_time,
            cur_time: self.cur_time,
            drawing: self.drawing,
            dash: self.dash,
            players: self.players.clone(),
            trails: self.trails.clone(),
        }
    }

    /// Reuses the player and trail allocations already held by `self`.
    fn clone_from(&mut self, source: &Self) {
        self.size = source.size;
        self.dash_time = source.dash_time;
        self.cur_time = source.cur_time;
        self.drawing = source.drawing;
        self.dash = source.dash;
        self.players.clone_from(&source.players);
        self.trails.clone_from(&source.trails);
    }
}
