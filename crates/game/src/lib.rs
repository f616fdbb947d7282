//! Light Cycle Game Edge
//!
//! The edge mediates between the outside world (keyboards, bots, peers,
//! files) and the Simulation Core. It owns:
//! - Input sanitization
//! - Seating players into an initial World
//! - The fixed-timestep accumulator that turns wall-clock time into ticks
//! - The RollbackWorld history and rewinds
//! - Replay recording
//! - The datagram transport collaborator
//!
//! # Architecture
//!
//! All I/O, timing and logging happen here. The Simulation Core is invoked
//! only through `RollbackWorld::advance` with sanitized inputs.

#![deny(unsafe_code)]

pub mod bot;
pub mod peer;
pub mod validation;

use std::collections::HashSet;
use std::f64::consts::{PI, TAU};

use lightcycle_replay::{BuildFingerprintData, ReplayRecorder};
use lightcycle_sim::{
    BODY_LENGTH, Color, Cycle, CycleInput, DEFAULT_ARENA_SIZE, DEFAULT_DASH_TIME, FIXED_DT, Player,
    PlayerId, PlayerInputs, RollbackWorld, Tick, World,
};
use lightcycle_wire::ReplayArtifact;
use tracing::{debug, info, warn};
use validation::{InputVerdict, sanitize_inputs};

// ============================================================================
// Parameters
// ============================================================================

/// Most ticks a single `pump` may run before dropping the remaining time.
pub const MAX_CATCH_UP_TICKS: u32 = 8;

/// Match duration in ticks (one minute at 60 Hz).
pub const MATCH_DURATION_TICKS: Tick = 3600;

/// Distance of each seat from the arena center.
pub const SPAWN_RADIUS: f64 = 1.0;

/// Body and trail colors handed out by seat id.
pub const PALETTE: [(Color, Color); 4] = [
    ([1.0, 0.0, 0.0, 1.0], [1.0, 0.4, 0.4, 1.0]),
    ([0.0, 0.0, 1.0, 1.0], [0.0, 0.75, 1.0, 1.0]),
    ([0.0, 0.8, 0.0, 1.0], [0.4, 1.0, 0.4, 1.0]),
    ([1.0, 0.8, 0.0, 1.0], [1.0, 1.0, 0.5, 1.0]),
];

// ============================================================================
// Match End Reason
// ============================================================================

/// Reason for match termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// At most one cycle is left.
    Complete,
    /// `match_duration_ticks` elapsed with several cycles alive.
    TickLimit,
    /// Stopped from outside.
    Aborted,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::TickLimit => "tick_limit",
            Self::Aborted => "aborted",
        }
    }
}

/// Who, if anyone, has won.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Running,
    Winner(PlayerId),
    /// Every cycle died, the last ones on the same tick.
    Draw,
}

// ============================================================================
// Errors
// ============================================================================

/// Reasons a game cannot be set up.
#[derive(Debug, Clone, PartialEq)]
pub enum GameError {
    /// No seats were supplied.
    NoSeats,
    /// Two seats share an id.
    DuplicateSeat { id: PlayerId },
    /// A configuration value is out of range.
    InvalidConfig { reason: &'static str },
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSeats => write!(f, "A game needs at least one seat"),
            Self::DuplicateSeat { id } => write!(f, "Seat id {id} is used more than once"),
            Self::InvalidConfig { reason } => write!(f, "Invalid game config: {reason}"),
        }
    }
}

impl std::error::Error for GameError {}

// ============================================================================
// Configuration
// ============================================================================

/// Game configuration.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub arena_size: f64,
    pub dash_time: f64,
    pub spawn_radius: f64,
    pub max_catch_up_ticks: u32,
    pub match_duration_ticks: Tick,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            arena_size: DEFAULT_ARENA_SIZE,
            dash_time: DEFAULT_DASH_TIME,
            spawn_radius: SPAWN_RADIUS,
            max_catch_up_ticks: MAX_CATCH_UP_TICKS,
            match_duration_ticks: MATCH_DURATION_TICKS,
        }
    }
}

impl GameConfig {
    fn validate(&self) -> Result<(), GameError> {
        if !self.arena_size.is_finite() || self.arena_size <= 0.0 {
            return Err(GameError::InvalidConfig {
                reason: "arena size must be positive and finite",
            });
        }
        if !self.dash_time.is_finite() || self.dash_time <= 0.0 {
            return Err(GameError::InvalidConfig {
                reason: "dash time must be positive and finite",
            });
        }
        if !self.spawn_radius.is_finite() || self.spawn_radius < 0.0 {
            return Err(GameError::InvalidConfig {
                reason: "spawn radius must be non-negative and finite",
            });
        }
        if self.spawn_radius + BODY_LENGTH / 2.0 >= self.arena_size / 2.0 {
            return Err(GameError::InvalidConfig {
                reason: "spawn radius places cycles outside the arena",
            });
        }
        Ok(())
    }
}

/// A player waiting to be placed in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Seat {
    pub id: PlayerId,
    pub name: String,
    pub color: Color,
    pub trail_color: Color,
    /// Overrides the seating layout for this seat.
    pub spawn: Option<Cycle>,
}

impl Seat {
    /// A seat colored from `PALETTE` by id.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        let (color, trail_color) = PALETTE[usize::from(id) % PALETTE.len()];
        Self {
            id,
            name: name.into(),
            color,
            trail_color,
            spawn: None,
        }
    }

    pub fn with_colors(mut self, color: Color, trail_color: Color) -> Self {
        self.color = color;
        self.trail_color = trail_color;
        self
    }

    pub fn at(mut self, spawn: Cycle) -> Self {
        self.spawn = Some(spawn);
        self
    }
}

/// Spread `count` cycles evenly on a circle, each facing away from the
/// center. Seat 0 sits on the negative x axis.
pub fn seating(count: usize, radius: f64) -> Vec<Cycle> {
    (0..count)
        .map(|slot| {
            let orientation = (PI + TAU * slot as f64 / count as f64) % TAU;
            let position = [radius * orientation.cos(), radius * orientation.sin()];
            Cycle::new(position, orientation)
        })
        .collect()
}

// ============================================================================
// Game State
// ============================================================================

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Tick reached by this step.
    pub tick: Tick,
    /// Living players after the step, in array order.
    pub survivors: Vec<PlayerId>,
    /// Players that died on this step.
    pub eliminated: Vec<PlayerId>,
    /// One verdict per raw input, in input order.
    pub verdicts: Vec<(PlayerId, InputVerdict)>,
}

/// A local match: one RollbackWorld plus everything around it.
pub struct Game {
    config: GameConfig,
    history: RollbackWorld,
    recorder: ReplayRecorder,
    seat_count: usize,
    tick: Tick,
    /// Wall-clock time not yet consumed by ticks.
    accumulator: f64,
    paused: bool,
}

impl Game {
    /// Seat the players and build the initial world.
    pub fn new(config: GameConfig, seats: Vec<Seat>) -> Result<Self, GameError> {
        config.validate()?;
        if seats.is_empty() {
            return Err(GameError::NoSeats);
        }
        let mut seen = HashSet::new();
        for seat in &seats {
            if !seen.insert(seat.id) {
                return Err(GameError::DuplicateSeat { id: seat.id });
            }
        }

        let layout = seating(seats.len(), config.spawn_radius);
        let players: Vec<Player> = seats
            .iter()
            .zip(layout)
            .map(|(seat, seated)| {
                Player::new(seat.id, &seat.name, seat.spawn.unwrap_or(seated))
                    .with_colors(seat.color, seat.trail_color)
            })
            .collect();

        let world = World::new(config.arena_size, config.dash_time, players);
        info!(
            players = seats.len(),
            arena_size = config.arena_size,
            dash_time = config.dash_time,
            "match started"
        );

        Ok(Self {
            history: RollbackWorld::new(&world),
            recorder: ReplayRecorder::new(&world),
            seat_count: seats.len(),
            tick: 0,
            accumulator: 0.0,
            paused: false,
            config,
        })
    }

    /// Set the build fingerprint.
    pub fn set_build_fingerprint(&mut self, fingerprint: BuildFingerprintData) {
        self.recorder.set_build_fingerprint(fingerprint);
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Get current tick.
    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    /// The current world.
    pub fn world(&self) -> &World {
        self.history.latest()
    }

    pub fn history(&self) -> &RollbackWorld {
        &self.history
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Flip the pause state and return the new one.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        info!(tick = self.tick, paused = self.paused, "pause toggled");
        self.paused
    }

    /// Process a single tick.
    ///
    /// Inputs are sanitized, recorded, then fed to the history. Stepping
    /// ignores the pause flag; only `pump` honors it.
    pub fn step(&mut self, raw_inputs: &[(PlayerId, CycleInput)]) -> StepReport {
        let (inputs, verdicts) = sanitize_inputs(raw_inputs);
        let before: Vec<PlayerId> = self.world().players().iter().map(|p| p.id).collect();

        self.recorder.record_frame(self.tick, &inputs);
        self.history.advance(&inputs);
        self.tick += 1;

        let survivors: Vec<PlayerId> = self.world().players().iter().map(|p| p.id).collect();
        let eliminated: Vec<PlayerId> = before
            .into_iter()
            .filter(|id| !survivors.contains(id))
            .collect();

        for &player_id in &eliminated {
            info!(tick = self.tick, player_id, "cycle eliminated");
        }

        StepReport {
            tick: self.tick,
            survivors,
            eliminated,
            verdicts,
        }
    }

    /// Feed elapsed wall-clock time and run every tick it pays for.
    ///
    /// `sampler` is asked for inputs once per tick, against the world about
    /// to be stepped. At most `max_catch_up_ticks` run per call; time beyond
    /// that is dropped. While paused, elapsed time is discarded.
    pub fn pump<F>(&mut self, elapsed_secs: f64, mut sampler: F) -> Vec<StepReport>
    where
        F: FnMut(&World) -> PlayerInputs,
    {
        if self.paused {
            return Vec::new();
        }
        if !elapsed_secs.is_finite() || elapsed_secs < 0.0 {
            warn!(elapsed_secs, "ignoring invalid elapsed time");
            return Vec::new();
        }

        self.accumulator += elapsed_secs;

        let max_ticks = self.config.max_catch_up_ticks as usize;
        let mut reports = Vec::new();
        while self.accumulator >= FIXED_DT {
            if reports.len() == max_ticks {
                debug!(
                    dropped_secs = self.accumulator,
                    "catch-up limit reached, dropping time"
                );
                self.accumulator = 0.0;
                break;
            }
            let inputs = sampler(self.world());
            reports.push(self.step(&inputs));
            self.accumulator -= FIXED_DT;
        }
        reports
    }

    /// Rewind the history by `frames` ticks.
    ///
    /// Recorded frames past the rewound tick are discarded so the replay
    /// keeps describing the world that `world()` returns.
    pub fn rollback(&mut self, frames: usize) -> bool {
        if !self.history.rollback(frames) {
            warn!(
                tick = self.tick,
                frames,
                retained = self.history.len(),
                "rollback refused"
            );
            return false;
        }

        let rewound = Tick::try_from(frames).unwrap_or(Tick::MAX);
        self.tick = self.tick.saturating_sub(rewound);
        self.recorder.truncate(self.tick);
        info!(tick = self.tick, frames, "rolled back");
        true
    }

    pub fn outcome(&self) -> Outcome {
        match self.world().players() {
            [] => Outcome::Draw,
            [last] if self.seat_count > 1 => Outcome::Winner(last.id),
            _ => Outcome::Running,
        }
    }

    /// Check if match should end.
    pub fn should_end_match(&self) -> Option<EndReason> {
        if self.outcome() != Outcome::Running {
            return Some(EndReason::Complete);
        }
        if self.tick >= self.config.match_duration_ticks {
            return Some(EndReason::TickLimit);
        }
        None
    }

    /// Finalize the match and produce a replay artifact.
    pub fn finalize(self, end_reason: EndReason) -> ReplayArtifact {
        info!(
            tick = self.tick,
            end_reason = end_reason.as_str(),
            outcome = ?self.outcome(),
            "match finalized"
        );
        self.recorder.finalize(self.history.latest(), end_reason.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use lightcycle_replay::{VerifyOptions, verify_replay};

    use super::*;

    /// Two cycles heading east on parallel lanes.
    fn lanes(a_x: f64, b_x: f64) -> Vec<Seat> {
        vec![
            Seat::new(0, "red").at(Cycle::new([a_x, 0.0], 0.0)),
            Seat::new(1, "blue").at(Cycle::new([b_x, 5.0], 0.0)),
        ]
    }

    fn straight(world: &World) -> PlayerInputs {
        world
            .players()
            .iter()
            .map(|p| (p.id, CycleInput::STRAIGHT))
            .collect()
    }

    fn lenient() -> VerifyOptions {
        VerifyOptions {
            strict_build_check: false,
            current_build: None,
        }
    }

    #[test]
    fn test_seating_layout() {
        let two = seating(2, 1.0);
        assert_eq!(two[0].orientation(), PI);
        assert_eq!(two[1].orientation(), 0.0);
        assert_eq!(two[1].position(), [1.0, 0.0]);
        assert!((two[0].position()[0] + 1.0).abs() < 1e-12);
        assert!(two[0].position()[1].abs() < 1e-12);

        let four = seating(4, 2.0);
        for cycle in &four {
            let [x, y] = cycle.position();
            assert!(((x * x + y * y).sqrt() - 2.0).abs() < 1e-12);
            let [hx, hy] = cycle.heading();
            // Facing away from the center.
            assert!(x * hx + y * hy > 0.0);
        }
    }

    #[test]
    fn test_new_game_seats_players() {
        let game = Game::new(
            GameConfig::default(),
            vec![Seat::new(0, "red"), Seat::new(1, "blue")],
        )
        .unwrap();

        assert_eq!(game.current_tick(), 0);
        assert_eq!(game.world().players().len(), 2);
        assert_eq!(game.world().trails()[1].color(), PALETTE[1].1);
        assert_eq!(game.world().size(), DEFAULT_ARENA_SIZE);
        assert_eq!(game.outcome(), Outcome::Running);
        assert_eq!(game.should_end_match(), None);
    }

    #[test]
    fn test_new_game_rejects_bad_setup() {
        assert_eq!(
            Game::new(GameConfig::default(), Vec::new()).err(),
            Some(GameError::NoSeats)
        );
        assert_eq!(
            Game::new(
                GameConfig::default(),
                vec![Seat::new(4, "a"), Seat::new(4, "b")]
            )
            .err(),
            Some(GameError::DuplicateSeat { id: 4 })
        );

        let config = GameConfig {
            dash_time: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            Game::new(config, vec![Seat::new(0, "a")]),
            Err(GameError::InvalidConfig { .. })
        ));

        let config = GameConfig {
            spawn_radius: 30.0,
            ..Default::default()
        };
        assert!(matches!(
            Game::new(config, vec![Seat::new(0, "a")]),
            Err(GameError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_step_sanitizes_and_reports() {
        let mut game = Game::new(GameConfig::default(), lanes(0.0, 0.0)).unwrap();
        let report = game.step(&[
            (0, CycleInput { turn: f64::NAN }),
            (1, CycleInput { turn: 0.0 }),
        ]);

        assert_eq!(report.tick, 1);
        assert_eq!(report.survivors, vec![0, 1]);
        assert!(report.eliminated.is_empty());
        assert_eq!(report.verdicts[0], (0, InputVerdict::DroppedNonFinite));

        // Player 0's input was dropped, so it did not move.
        assert_eq!(game.world().players()[0].cycle.position(), [0.0, 0.0]);
        assert!(game.world().players()[1].cycle.position()[0] > 0.0);
    }

    #[test]
    fn test_simultaneous_wall_hit_is_draw() {
        let mut game = Game::new(GameConfig::default(), lanes(0.0, 0.0)).unwrap();

        let mut last = None;
        for _ in 0..400 {
            let inputs = straight(game.world());
            let report = game.step(&inputs);
            if !report.eliminated.is_empty() {
                last = Some(report);
                break;
            }
        }

        let report = last.expect("both cycles reach the wall");
        assert_eq!(report.eliminated, vec![0, 1]);
        assert!(report.survivors.is_empty());
        assert_eq!(game.outcome(), Outcome::Draw);
        assert_eq!(game.should_end_match(), Some(EndReason::Complete));
    }

    #[test]
    fn test_last_cycle_standing_wins() {
        let mut game = Game::new(GameConfig::default(), lanes(0.0, -20.0)).unwrap();

        let mut eliminated = Vec::new();
        for _ in 0..400 {
            let inputs = straight(game.world());
            eliminated.extend(game.step(&inputs).eliminated);
            if game.outcome() != Outcome::Running {
                break;
            }
        }

        assert_eq!(eliminated, vec![0]);
        assert_eq!(game.outcome(), Outcome::Winner(1));
        assert!(game.world().is_alive(1));
    }

    #[test]
    fn test_single_seat_keeps_running() {
        let mut game = Game::new(GameConfig::default(), vec![Seat::new(0, "solo")]).unwrap();
        game.step(&[(0, CycleInput::STRAIGHT)]);
        assert_eq!(game.outcome(), Outcome::Running);
    }

    #[test]
    fn test_tick_limit() {
        let config = GameConfig {
            match_duration_ticks: 10,
            ..Default::default()
        };
        let mut game = Game::new(config, lanes(0.0, 0.0)).unwrap();

        for _ in 0..10 {
            assert!(game.should_end_match().is_none());
            let inputs = straight(game.world());
            game.step(&inputs);
        }

        assert_eq!(game.should_end_match(), Some(EndReason::TickLimit));
    }

    #[test]
    fn test_pump_runs_fixed_ticks() {
        let mut game = Game::new(GameConfig::default(), lanes(0.0, 0.0)).unwrap();

        assert_eq!(game.pump(FIXED_DT, straight).len(), 1);
        assert_eq!(game.pump(FIXED_DT / 2.0, straight).len(), 0);
        assert_eq!(game.pump(FIXED_DT / 2.0, straight).len(), 1);
        assert_eq!(game.current_tick(), 2);
    }

    #[test]
    fn test_pump_caps_catch_up() {
        let mut game = Game::new(GameConfig::default(), lanes(0.0, 0.0)).unwrap();

        let reports = game.pump(1.0, straight);
        assert_eq!(reports.len(), MAX_CATCH_UP_TICKS as usize);
        assert_eq!(reports.last().map(|r| r.tick), Some(8));

        // The rest of the second was dropped.
        assert_eq!(game.pump(0.0, straight).len(), 0);
    }

    #[test]
    fn test_pump_samples_once_per_tick() {
        let mut game = Game::new(GameConfig::default(), lanes(0.0, 0.0)).unwrap();
        let mut calls = 0;
        game.pump(FIXED_DT * 4.0 + FIXED_DT / 2.0, |world| {
            calls += 1;
            straight(world)
        });
        assert_eq!(calls, game.current_tick());
    }

    #[test]
    fn test_pause_discards_time() {
        let mut game = Game::new(GameConfig::default(), lanes(0.0, 0.0)).unwrap();

        assert!(game.toggle_pause());
        assert!(game.pump(1.0, straight).is_empty());
        assert_eq!(game.current_tick(), 0);

        assert!(!game.toggle_pause());
        assert_eq!(game.pump(FIXED_DT, straight).len(), 1);
    }

    #[test]
    fn test_invalid_elapsed_ignored() {
        let mut game = Game::new(GameConfig::default(), lanes(0.0, 0.0)).unwrap();
        assert!(game.pump(f64::NAN, straight).is_empty());
        assert!(game.pump(-1.0, straight).is_empty());
        assert_eq!(game.pump(FIXED_DT, straight).len(), 1);
    }

    #[test]
    fn test_rollback_rewinds_tick_and_world() {
        let mut game = Game::new(GameConfig::default(), lanes(0.0, 0.0)).unwrap();

        let mut digests = vec![game.world().state_digest()];
        for _ in 0..10 {
            let inputs = straight(game.world());
            game.step(&inputs);
            digests.push(game.world().state_digest());
        }

        assert!(game.rollback(4));
        assert_eq!(game.current_tick(), 6);
        assert_eq!(game.world().state_digest(), digests[6]);

        assert!(!game.rollback(1000));
        assert_eq!(game.current_tick(), 6);
    }

    #[test]
    fn test_replay_survives_rollback() {
        let mut game = Game::new(GameConfig::default(), lanes(0.0, -3.0)).unwrap();

        for tick in 0..30u64 {
            let turn = if tick % 10 < 5 { 1.0 } else { -1.0 };
            game.step(&[(0, CycleInput { turn }), (1, CycleInput::STRAIGHT)]);
        }
        assert!(game.rollback(12));
        for _ in 0..20 {
            game.step(&[(0, CycleInput::LEFT), (1, CycleInput::RIGHT)]);
        }

        let final_digest = game.world().state_digest();
        let artifact = game.finalize(EndReason::Aborted);

        assert_eq!(artifact.checkpoint_tick, 38);
        assert_eq!(artifact.final_digest, final_digest);
        assert_eq!(artifact.end_reason, "aborted");
        let verified = verify_replay(&artifact, &lenient()).unwrap();
        assert_eq!(verified.final_digest, final_digest);
    }

    #[test]
    fn test_rollback_into_initial_world() {
        let mut game = Game::new(GameConfig::default(), lanes(0.0, 0.0)).unwrap();
        let initial = game.world().clone();
        for _ in 0..5 {
            let inputs = straight(game.world());
            game.step(&inputs);
        }

        assert!(game.rollback(20));
        assert_eq!(game.current_tick(), 0);
        assert_eq!(*game.world(), initial);

        let artifact = game.finalize(EndReason::Aborted);
        assert!(artifact.frames.is_empty());
        assert!(verify_replay(&artifact, &lenient()).is_ok());
    }
}
