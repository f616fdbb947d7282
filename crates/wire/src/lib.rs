//! Light Cycle Wire Types
//!
//! This crate defines the Protobuf message types (via `prost`) that carry
//! simulation data outside the process: the setup of a world, the per-tick
//! input frames fed to `RollbackWorld::advance`, and the replay artifact that
//! bundles both with verification anchors.
//!
//! Simulation types never depend on this crate; conversions live here.

#![deny(unsafe_code)]

use lightcycle_sim::{Color, Cycle, CycleInput, Player, PlayerId, World};
use prost::Message;

// ============================================================================
// Type Aliases (matching simulation crate)
// ============================================================================

/// Tick type alias for wire protocol.
pub type Tick = u64;

// ============================================================================
// Input Messages
// ============================================================================

/// One player's turn command for one tick.
#[derive(Clone, PartialEq, Message)]
pub struct TurnInputProto {
    /// Stable player identity (wire as u32 for protobuf compatibility).
    #[prost(uint32, tag = "1")]
    pub player_id: u32,

    /// Turn command: -1 left, 0 straight, +1 right.
    #[prost(double, tag = "2")]
    pub turn: f64,
}

/// The exact input mapping passed to one `advance` call.
#[derive(Clone, PartialEq, Message)]
pub struct InputFrameProto {
    /// Zero-based index of the advance this frame was fed to.
    #[prost(uint64, tag = "1")]
    pub tick: Tick,

    /// Inputs in the order they were passed to the simulation.
    #[prost(message, repeated, tag = "2")]
    pub inputs: Vec<TurnInputProto>,
}

// ============================================================================
// World Setup Messages
// ============================================================================

/// Initial state of one player.
#[derive(Clone, PartialEq, Message)]
pub struct PlayerSetupProto {
    #[prost(uint32, tag = "1")]
    pub id: u32,

    #[prost(string, tag = "2")]
    pub name: String,

    /// Position [x, y].
    #[prost(double, repeated, tag = "3")]
    pub position: Vec<f64>,

    /// Heading in radians.
    #[prost(double, tag = "4")]
    pub orientation: f64,

    /// Body color [r, g, b, a].
    #[prost(float, repeated, tag = "5")]
    pub color: Vec<f32>,

    /// Trail color [r, g, b, a].
    #[prost(float, repeated, tag = "6")]
    pub trail_color: Vec<f32>,
}

/// Everything needed to construct the initial `World`.
#[derive(Clone, PartialEq, Message)]
pub struct WorldSetupProto {
    #[prost(double, tag = "1")]
    pub size: f64,

    #[prost(double, tag = "2")]
    pub dash_time: f64,

    /// Players in slot order; slot order fixes trail order.
    #[prost(message, repeated, tag = "3")]
    pub players: Vec<PlayerSetupProto>,
}

// ============================================================================
// Replay Artifact Types
// ============================================================================

/// Tuning parameter key-value pair.
#[derive(Clone, PartialEq, Message)]
pub struct TuningParameter {
    #[prost(string, tag = "1")]
    pub key: String,

    #[prost(double, tag = "2")]
    pub value: f64,
}

/// Build fingerprint for replay scope verification.
#[derive(Clone, PartialEq, Message)]
pub struct BuildFingerprint {
    /// SHA-256 of the recording executable's bytes.
    #[prost(string, tag = "1")]
    pub binary_sha256: String,

    /// Target triple (e.g., "x86_64-unknown-linux-gnu").
    #[prost(string, tag = "2")]
    pub target_triple: String,

    /// Build profile ("release" or "dev").
    #[prost(string, tag = "3")]
    pub profile: String,

    /// Git commit hash (metadata/traceability).
    #[prost(string, tag = "4")]
    pub git_commit: String,
}

/// Complete replay artifact.
#[derive(Clone, PartialEq, Message)]
pub struct ReplayArtifact {
    /// Schema version (starts at 1).
    #[prost(uint32, tag = "1")]
    pub replay_format_version: u32,

    /// Initial world.
    #[prost(message, optional, tag = "2")]
    pub world_setup: Option<WorldSetupProto>,

    /// StateDigest algorithm identifier.
    #[prost(string, tag = "3")]
    pub state_digest_algo_id: String,

    /// Tuning parameters (sorted by key).
    #[prost(message, repeated, tag = "4")]
    pub tuning_parameters: Vec<TuningParameter>,

    /// One frame per advance, ticks 0..checkpoint_tick.
    #[prost(message, repeated, tag = "5")]
    pub frames: Vec<InputFrameProto>,

    /// Build fingerprint for verification scope.
    #[prost(message, optional, tag = "6")]
    pub build_fingerprint: Option<BuildFingerprint>,

    /// StateDigest of the initial world.
    #[prost(uint64, tag = "7")]
    pub initial_digest: u64,

    /// StateDigest at checkpoint_tick.
    #[prost(uint64, tag = "8")]
    pub final_digest: u64,

    /// Number of advances replayed to reach final_digest.
    #[prost(uint64, tag = "9")]
    pub checkpoint_tick: Tick,

    /// Match termination reason.
    #[prost(string, tag = "10")]
    pub end_reason: String,
}

// ============================================================================
// Conversion Traits
// ============================================================================

impl From<(PlayerId, CycleInput)> for TurnInputProto {
    fn from((player_id, input): (PlayerId, CycleInput)) -> Self {
        Self {
            player_id: u32::from(player_id),
            turn: input.turn,
        }
    }
}

impl TryFrom<TurnInputProto> for (PlayerId, CycleInput) {
    type Error = &'static str;

    fn try_from(proto: TurnInputProto) -> Result<Self, Self::Error> {
        let player_id =
            PlayerId::try_from(proto.player_id).map_err(|_| "player_id out of range")?;
        Ok((player_id, CycleInput { turn: proto.turn }))
    }
}

impl InputFrameProto {
    pub fn new(tick: Tick, inputs: &[(PlayerId, CycleInput)]) -> Self {
        Self {
            tick,
            inputs: inputs.iter().copied().map(Into::into).collect(),
        }
    }

    /// Decode the frame's inputs in their recorded order.
    pub fn to_inputs(&self) -> Result<Vec<(PlayerId, CycleInput)>, &'static str> {
        self.inputs.iter().cloned().map(TryInto::try_into).collect()
    }
}

impl From<&Player> for PlayerSetupProto {
    fn from(p: &Player) -> Self {
        Self {
            id: u32::from(p.id),
            name: p.name.to_string(),
            position: p.cycle.position().to_vec(),
            orientation: p.cycle.orientation(),
            color: p.color.to_vec(),
            trail_color: p.trail_color.to_vec(),
        }
    }
}

fn color_from(values: &[f32]) -> Result<Color, &'static str> {
    values
        .try_into()
        .map_err(|_| "color must have exactly 4 elements")
}

impl TryFrom<PlayerSetupProto> for Player {
    type Error = &'static str;

    fn try_from(p: PlayerSetupProto) -> Result<Self, Self::Error> {
        if p.position.len() != 2 {
            return Err("position must have exactly 2 elements");
        }
        let id = PlayerId::try_from(p.id).map_err(|_| "player id out of range")?;
        let cycle = Cycle::new([p.position[0], p.position[1]], p.orientation);
        Ok(Player::new(id, &p.name, cycle)
            .with_colors(color_from(&p.color)?, color_from(&p.trail_color)?))
    }
}

impl WorldSetupProto {
    /// Capture a world's parameters and living players.
    ///
    /// Trails and dash progress are not captured, so this describes a world
    /// exactly only before its first tick.
    pub fn from_initial(world: &World) -> Self {
        Self {
            size: world.size(),
            dash_time: world.dash_time(),
            players: world.players().iter().map(Into::into).collect(),
        }
    }
}

impl TryFrom<WorldSetupProto> for World {
    type Error = &'static str;

    fn try_from(setup: WorldSetupProto) -> Result<Self, Self::Error> {
        // World::new panics on a non-positive dash time; reject it here instead.
        if setup.dash_time.is_nan() || setup.dash_time <= 0.0 {
            return Err("dash_time must be positive");
        }
        if !setup.size.is_finite() {
            return Err("size must be finite");
        }
        let players = setup
            .players
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<Player>, _>>()?;
        Ok(World::new(setup.size, setup.dash_time, players))
    }
}

// ============================================================================
// Tests
// ============================================================================
