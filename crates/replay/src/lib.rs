//! Light Cycle Replay System
//!
//! This crate provides replay artifact generation and verification.
//!
//! # Architecture
//!
//! The replay system consists of:
//! - `ReplayRecorder`: Collects the exact input frame of every `advance`
//! - `verify_replay`: Re-feeds those frames into `World::run_for` from the
//!   recorded initial world and checks the final StateDigest
//! - Build fingerprint acquisition for same-build verification scope
//!
//! Replays rely on the simulation's determinism contract: the same initial
//! world and the same ordered input frames, stepped at `FIXED_DT`, reproduce
//! the original trajectory bit for bit.

#![deny(unsafe_code)]

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use lightcycle_sim::{
    BODY_LENGTH, CycleInput, FIXED_DT, PlayerId, SPEED, STATE_DIGEST_ALGO_ID, TURN_RATE, Tick,
    World,
};
use lightcycle_wire::{
    BuildFingerprint, InputFrameProto, ReplayArtifact, TuningParameter, WorldSetupProto,
};
use prost::Message;
use sha2::{Digest, Sha256};

/// Current replay schema version.
pub const REPLAY_FORMAT_VERSION: u32 = 1;

/// Simulation constants recorded in every artifact, sorted by key.
pub fn tuning_parameters() -> Vec<TuningParameter> {
    [
        ("cycle_length", BODY_LENGTH),
        ("cycle_speed", SPEED),
        ("fixed_dt", FIXED_DT),
        ("turn_rate", TURN_RATE),
    ]
    .into_iter()
    .map(|(key, value)| TuningParameter {
        key: key.to_string(),
        value,
    })
    .collect()
}

// ============================================================================
// Replay Recorder
// ============================================================================

/// Records match data for replay artifact generation.
pub struct ReplayRecorder {
    world_setup: WorldSetupProto,
    initial_digest: u64,
    frames: Vec<InputFrameProto>,
    build_fingerprint: Option<BuildFingerprintData>,
}

/// Build fingerprint data.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildFingerprintData {
    pub binary_sha256: String,
    pub target_triple: String,
    pub profile: String,
    pub git_commit: String,
}

impl From<BuildFingerprintData> for BuildFingerprint {
    fn from(f: BuildFingerprintData) -> Self {
        Self {
            binary_sha256: f.binary_sha256,
            target_triple: f.target_triple,
            profile: f.profile,
            git_commit: f.git_commit,
        }
    }
}

impl ReplayRecorder {
    /// Create a recorder for a world that has not been stepped yet.
    pub fn new(initial: &World) -> Self {
        Self {
            world_setup: WorldSetupProto::from_initial(initial),
            initial_digest: initial.state_digest(),
            frames: Vec::new(),
            build_fingerprint: None,
        }
    }

    /// Number of frames recorded so far; also the tick of the next frame.
    pub fn frame_count(&self) -> Tick {
        self.frames.len() as Tick
    }

    /// Record the inputs passed to the `advance` that produced `tick + 1`.
    ///
    /// Frames are expected in tick order; `verify_replay` rejects gaps and
    /// duplicates.
    pub fn record_frame(&mut self, tick: Tick, inputs: &[(PlayerId, CycleInput)]) {
        self.frames.push(InputFrameProto::new(tick, inputs));
    }

    /// Drop every frame at or after `tick`, after the history was rewound.
    pub fn truncate(&mut self, tick: Tick) {
        let keep = usize::try_from(tick).unwrap_or(usize::MAX);
        self.frames.truncate(keep);
    }

    /// Set the build fingerprint.
    pub fn set_build_fingerprint(&mut self, fingerprint: BuildFingerprintData) {
        self.build_fingerprint = Some(fingerprint);
    }

    /// Finalize the replay artifact against the world reached by the
    /// recorded frames.
    pub fn finalize(self, final_world: &World, end_reason: &str) -> ReplayArtifact {
        ReplayArtifact {
            replay_format_version: REPLAY_FORMAT_VERSION,
            world_setup: Some(self.world_setup),
            state_digest_algo_id: STATE_DIGEST_ALGO_ID.to_string(),
            tuning_parameters: tuning_parameters(),
            checkpoint_tick: self.frames.len() as Tick,
            frames: self.frames,
            build_fingerprint: self.build_fingerprint.map(Into::into),
            initial_digest: self.initial_digest,
            final_digest: final_world.state_digest(),
            end_reason: end_reason.to_string(),
        }
    }
}

// ============================================================================
// Replay Verification
// ============================================================================

/// Replay verification error.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyError {
    /// Build fingerprint mismatch.
    BuildMismatch { expected: String, actual: String },
    /// Missing world setup.
    MissingWorldSetup,
    /// Unsupported schema version.
    UnsupportedVersion { version: u32 },
    /// Recorded with a different digest algorithm.
    DigestAlgorithmMismatch { expected: String, actual: String },
    /// Recorded with different simulation constants.
    TuningMismatch { key: String },
    /// Initialization anchor (initial digest) mismatch.
    InitializationAnchorMismatch { expected: u64, actual: u64 },
    /// Frame stream validation failed.
    InputStreamInvalid { reason: String },
    /// Final digest mismatch.
    FinalDigestMismatch { expected: u64, actual: u64 },
    /// Invalid replay artifact format.
    InvalidFormat { reason: String },
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BuildMismatch { expected, actual } => {
                write!(
                    f,
                    "Build fingerprint mismatch: expected {expected}, got {actual}"
                )
            }
            Self::MissingWorldSetup => write!(f, "Missing world setup in replay artifact"),
            Self::UnsupportedVersion { version } => {
                write!(f, "Unsupported replay format version {version}")
            }
            Self::DigestAlgorithmMismatch { expected, actual } => {
                write!(
                    f,
                    "StateDigest algorithm mismatch: expected {expected}, got {actual}"
                )
            }
            Self::TuningMismatch { key } => {
                write!(f, "Tuning parameter {key} differs from this build")
            }
            Self::InitializationAnchorMismatch { expected, actual } => {
                write!(
                    f,
                    "Initialization anchor mismatch: expected {expected:#x}, got {actual:#x}"
                )
            }
            Self::InputStreamInvalid { reason } => {
                write!(f, "Input stream invalid: {reason}")
            }
            Self::FinalDigestMismatch { expected, actual } => {
                write!(
                    f,
                    "Final digest mismatch: expected {expected:#x}, got {actual:#x}"
                )
            }
            Self::InvalidFormat { reason } => {
                write!(f, "Invalid replay format: {reason}")
            }
        }
    }
}

impl std::error::Error for VerifyError {}

/// Options for replay verification.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Whether to strictly enforce build fingerprint matching.
    /// - true: fail on mismatch
    /// - false: continue (the caller may warn)
    pub strict_build_check: bool,
    /// Current build fingerprint for comparison.
    pub current_build: Option<BuildFingerprintData>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            strict_build_check: true,
            current_build: None,
        }
    }
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedReplay {
    pub checkpoint_tick: Tick,
    pub final_digest: u64,
    /// Players alive at the checkpoint, in array order.
    pub survivors: Vec<PlayerId>,
    /// A different build recorded the artifact and the check was lenient.
    pub build_mismatch: bool,
}

/// Verify a replay artifact produces the recorded outcome.
///
/// # Verification Steps
/// 1. Check the build fingerprint (strict mode: fail)
/// 2. Check schema version, digest algorithm and tuning parameters
/// 3. Validate the frame stream: ticks `0..checkpoint_tick`, one frame each
/// 4. Rebuild the initial world and check the initial digest
/// 5. Re-feed every frame into `World::run_for(FIXED_DT, ..)`
/// 6. Check the final digest
pub fn verify_replay(
    artifact: &ReplayArtifact,
    options: &VerifyOptions,
) -> Result<VerifiedReplay, VerifyError> {
    // Step 1: Verify build fingerprint
    let mut build_mismatch = false;
    if let (Some(recorded), Some(current)) = (&artifact.build_fingerprint, &options.current_build) {
        build_mismatch = recorded.binary_sha256 != current.binary_sha256
            || recorded.target_triple != current.target_triple
            || recorded.profile != current.profile;
        if build_mismatch && options.strict_build_check {
            return Err(VerifyError::BuildMismatch {
                expected: format!(
                    "{} ({} {})",
                    recorded.binary_sha256, recorded.target_triple, recorded.profile
                ),
                actual: format!(
                    "{} ({} {})",
                    current.binary_sha256, current.target_triple, current.profile
                ),
            });
        }
    }

    // Step 2: Verify the artifact was produced by a compatible simulation
    if artifact.replay_format_version != REPLAY_FORMAT_VERSION {
        return Err(VerifyError::UnsupportedVersion {
            version: artifact.replay_format_version,
        });
    }
    if artifact.state_digest_algo_id != STATE_DIGEST_ALGO_ID {
        return Err(VerifyError::DigestAlgorithmMismatch {
            expected: STATE_DIGEST_ALGO_ID.to_string(),
            actual: artifact.state_digest_algo_id.clone(),
        });
    }
    validate_tuning(artifact)?;

    // Step 3: Validate frame stream integrity
    validate_frame_stream(artifact)?;

    // Step 4: Rebuild the initial world
    let setup = artifact
        .world_setup
        .clone()
        .ok_or(VerifyError::MissingWorldSetup)?;
    let mut world = World::try_from(setup).map_err(|e| VerifyError::InvalidFormat {
        reason: e.to_string(),
    })?;

    let initial_digest = world.state_digest();
    if initial_digest != artifact.initial_digest {
        return Err(VerifyError::InitializationAnchorMismatch {
            expected: artifact.initial_digest,
            actual: initial_digest,
        });
    }

    // Step 5: Replay frames in tick order
    let mut frames: Vec<&InputFrameProto> = artifact.frames.iter().collect();
    frames.sort_by_key(|frame| frame.tick);

    for frame in frames {
        let inputs = frame.to_inputs().map_err(|e| VerifyError::InvalidFormat {
            reason: format!("frame {}: {e}", frame.tick),
        })?;
        world.run_for(FIXED_DT, &inputs);
    }

    // Step 6: Verify final digest
    let final_digest = world.state_digest();
    if final_digest != artifact.final_digest {
        return Err(VerifyError::FinalDigestMismatch {
            expected: artifact.final_digest,
            actual: final_digest,
        });
    }

    Ok(VerifiedReplay {
        checkpoint_tick: artifact.checkpoint_tick,
        final_digest,
        survivors: world.players().iter().map(|p| p.id).collect(),
        build_mismatch,
    })
}

/// Every simulation constant this build uses must match the recorded value.
fn validate_tuning(artifact: &ReplayArtifact) -> Result<(), VerifyError> {
    let recorded: HashMap<&str, f64> = artifact
        .tuning_parameters
        .iter()
        .map(|p| (p.key.as_str(), p.value))
        .collect();

    for expected in tuning_parameters() {
        match recorded.get(expected.key.as_str()) {
            Some(&value) if value.to_bits() == expected.value.to_bits() => {}
            _ => return Err(VerifyError::TuningMismatch { key: expected.key }),
        }
    }
    Ok(())
}

/// Validate the frame stream integrity.
///
/// Frames may be stored in any order, but together they must cover ticks
/// `0..checkpoint_tick` exactly once each.
fn validate_frame_stream(artifact: &ReplayArtifact) -> Result<(), VerifyError> {
    let checkpoint_tick = artifact.checkpoint_tick;

    let mut counts: HashMap<Tick, usize> = HashMap::new();
    for frame in &artifact.frames {
        if frame.tick >= checkpoint_tick {
            return Err(VerifyError::InputStreamInvalid {
                reason: format!(
                    "Frame at tick {} is outside valid range [0, {checkpoint_tick})",
                    frame.tick
                ),
            });
        }
        *counts.entry(frame.tick).or_insert(0) += 1;
    }

    for tick in 0..checkpoint_tick {
        match counts.get(&tick) {
            None => {
                return Err(VerifyError::InputStreamInvalid {
                    reason: format!("Missing frame at tick {tick}"),
                });
            }
            Some(&count) if count > 1 => {
                return Err(VerifyError::InputStreamInvalid {
                    reason: format!("Duplicate frame at tick {tick}"),
                });
            }
            Some(_) => {}
        }
    }

    Ok(())
}

// ============================================================================
// Build Fingerprint Acquisition
// ============================================================================

/// Acquire the current build fingerprint.
///
/// # Returns
/// - `Ok(fingerprint)` on success
/// - `Err(io::Error)` if the executable cannot be read
pub fn acquire_build_fingerprint() -> io::Result<BuildFingerprintData> {
    let exe_path = std::env::current_exe()?;

    let mut file = fs::File::open(&exe_path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    let binary_sha256 = format!("{:x}", hasher.finalize());

    let profile = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };

    Ok(BuildFingerprintData {
        binary_sha256,
        target_triple: target_triple(),
        profile: profile.to_string(),
        git_commit: std::env::var("LIGHTCYCLE_GIT_COMMIT").unwrap_or_else(|_| "unknown".to_string()),
    })
}

/// Best-effort target triple from compile-time configuration.
fn target_triple() -> String {
    let os = if cfg!(target_os = "windows") {
        "pc-windows-msvc"
    } else if cfg!(target_os = "linux") {
        "unknown-linux-gnu"
    } else if cfg!(target_os = "macos") {
        "apple-darwin"
    } else {
        "unknown-unknown"
    };
    format!("{}-{os}", std::env::consts::ARCH)
}

// ============================================================================
// Replay I/O
// ============================================================================

/// Write a replay artifact to a file. Refuses to overwrite.
pub fn write_replay(artifact: &ReplayArtifact, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Replay artifact already exists at {}", path.display()),
                )
            } else {
                e
            }
        })?;
    file.write_all(&artifact.encode_to_vec())?;

    Ok(())
}

/// Read a replay artifact from a file.
pub fn read_replay(path: &Path) -> io::Result<ReplayArtifact> {
    let data = fs::read(path)?;
    ReplayArtifact::decode(data.as_slice()).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to decode replay: {e}"),
        )
    })
}

// ============================================================================
// Tests
// ============================================================================
