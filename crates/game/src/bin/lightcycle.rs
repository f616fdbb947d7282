//! Headless light cycle matches and replay verification.
//!
//! ```text
//! lightcycle simulate --players 4 --replay-out match.replay --summary-out match.json
//! lightcycle verify match.replay
//! ```
//!
//! Log verbosity follows `RUST_LOG`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lightcycle_game::{EndReason, Game, GameConfig, Outcome, Seat, bot};
use lightcycle_replay::{
    VerifyError, VerifyOptions, acquire_build_fingerprint, read_replay, verify_replay,
    write_replay,
};
use lightcycle_sim::{PlayerId, Tick};
use prost::Message;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a bot-only match.
    Simulate(SimulateArgs),
    /// Re-run a replay file and check its digests.
    Verify(VerifyArgs),
}

#[derive(clap::Args, Debug)]
struct SimulateArgs {
    #[arg(long, default_value_t = 2)]
    players: u8,
    #[arg(long)]
    max_ticks: Option<Tick>,
    #[arg(long)]
    arena_size: Option<f64>,
    #[arg(long)]
    dash_time: Option<f64>,
    #[arg(long)]
    replay_out: Option<PathBuf>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
    /// Stamp the replay with this executable's fingerprint.
    #[arg(long)]
    fingerprint: bool,
}

#[derive(clap::Args, Debug)]
struct VerifyArgs {
    path: PathBuf,
    /// Continue when the replay was recorded by a different build.
    #[arg(long)]
    lenient_build: bool,
}

#[derive(Clone, Debug, Serialize)]
struct Elimination {
    tick: Tick,
    #[serde(rename = "playerId")]
    player_id: PlayerId,
}

#[derive(Clone, Debug, Serialize)]
struct MatchSummary {
    players: u8,
    ticks: Tick,
    #[serde(rename = "endReason")]
    end_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    winner: Option<PlayerId>,
    draw: bool,
    eliminations: Vec<Elimination>,
    #[serde(rename = "finalDigest")]
    final_digest: String,
    #[serde(rename = "replayBytes")]
    replay_bytes: usize,
}

#[derive(Clone, Debug, Serialize)]
struct VerifySummary {
    path: String,
    #[serde(rename = "checkpointTick")]
    checkpoint_tick: Tick,
    #[serde(rename = "finalDigest")]
    final_digest: String,
    survivors: Vec<PlayerId>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Simulate(args) => simulate(&args),
        Command::Verify(args) => verify(&args),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn simulate(args: &SimulateArgs) -> Result<()> {
    let defaults = GameConfig::default();
    let config = GameConfig {
        arena_size: args.arena_size.unwrap_or(defaults.arena_size),
        dash_time: args.dash_time.unwrap_or(defaults.dash_time),
        match_duration_ticks: args.max_ticks.unwrap_or(defaults.match_duration_ticks),
        ..defaults
    };
    let seats = (0..args.players)
        .map(|id| Seat::new(id, format!("bot-{id}")))
        .collect();

    let mut game = Game::new(config, seats).context("failed to set up match")?;
    if args.fingerprint {
        game.set_build_fingerprint(
            acquire_build_fingerprint().context("failed to fingerprint executable")?,
        );
    }

    let mut eliminations = Vec::new();
    let end_reason = loop {
        if let Some(reason) = game.should_end_match() {
            break reason;
        }
        let inputs = bot::steer(game.world());
        let report = game.step(&inputs);
        eliminations.extend(report.eliminated.iter().map(|&player_id| Elimination {
            tick: report.tick,
            player_id,
        }));
    };

    let outcome = game.outcome();
    let ticks = game.current_tick();
    let artifact = game.finalize(end_reason);

    if let Some(path) = &args.replay_out {
        write_replay(&artifact, path)
            .with_context(|| format!("failed to write replay to {}", path.display()))?;
        info!(path = %path.display(), "replay written");
    }

    let summary = MatchSummary {
        players: args.players,
        ticks,
        end_reason: end_reason.as_str().to_string(),
        winner: match outcome {
            Outcome::Winner(id) => Some(id),
            _ => None,
        },
        draw: outcome == Outcome::Draw,
        eliminations,
        final_digest: format!("{:#018x}", artifact.final_digest),
        replay_bytes: artifact.encoded_len(),
    };

    println!("{}", serde_json::to_string(&summary)?);
    if let Some(path) = &args.summary_out {
        write_summary(path, &summary)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
    }

    if end_reason == EndReason::TickLimit {
        info!(ticks, "match hit the tick limit");
    }
    Ok(())
}

fn verify(args: &VerifyArgs) -> Result<()> {
    let artifact = read_replay(&args.path)
        .with_context(|| format!("failed to read replay {}", args.path.display()))?;

    let current_build = match acquire_build_fingerprint() {
        Ok(fingerprint) => Some(fingerprint),
        Err(error) => {
            warn!(%error, "could not fingerprint this build, skipping build check");
            None
        }
    };

    let options = VerifyOptions {
        strict_build_check: !args.lenient_build,
        current_build,
    };
    let verified = verify_replay(&artifact, &options)
        .map_err(|error| match error {
            VerifyError::BuildMismatch { .. } => {
                anyhow::Error::new(error).context("pass --lenient-build to try anyway")
            }
            other => anyhow::Error::new(other),
        })
        .with_context(|| format!("replay {} failed verification", args.path.display()))?;
    if verified.build_mismatch {
        warn!(path = %args.path.display(), "replay was recorded by a different build");
    }

    let summary = VerifySummary {
        path: args.path.display().to_string(),
        checkpoint_tick: verified.checkpoint_tick,
        final_digest: format!("{:#018x}", verified.final_digest),
        survivors: verified.survivors,
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn write_summary(path: &Path, summary: &MatchSummary) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}
