//! Input sanitization at the edge.
//!
//! Turn commands come from keyboards, bots and (eventually) remote peers.
//! Before they reach the simulation:
//! - NaN/Inf turn: DROP + LOG
//! - Magnitude > 1.0: CLAMP + LOG

use lightcycle_sim::{CycleInput, PlayerId, PlayerInputs};
use tracing::{debug, warn};

/// Largest accepted turn magnitude.
pub const MAX_TURN: f64 = 1.0;

/// Result of validating one turn command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputVerdict {
    /// Input passed through unchanged.
    Accepted,
    /// Input accepted with magnitude clamped.
    AcceptedWithClamp { original: f64 },
    /// Dropped: NaN or Inf turn.
    DroppedNonFinite,
}

impl InputVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted | Self::AcceptedWithClamp { .. })
    }
}

/// Validate a single turn command.
///
/// Returns the input to feed the simulation, if any.
pub fn validate_input(input: CycleInput) -> (InputVerdict, Option<CycleInput>) {
    let turn = input.turn;
    if !turn.is_finite() {
        return (InputVerdict::DroppedNonFinite, None);
    }
    if turn.abs() > MAX_TURN {
        let clamped = CycleInput {
            turn: turn.clamp(-MAX_TURN, MAX_TURN),
        };
        return (
            InputVerdict::AcceptedWithClamp { original: turn },
            Some(clamped),
        );
    }
    (InputVerdict::Accepted, Some(input))
}

/// Validate a whole input frame, keeping the order of accepted pairs.
pub fn sanitize_inputs(
    raw: &[(PlayerId, CycleInput)],
) -> (PlayerInputs, Vec<(PlayerId, InputVerdict)>) {
    let mut inputs = Vec::with_capacity(raw.len());
    let mut verdicts = Vec::with_capacity(raw.len());

    for &(player_id, input) in raw {
        let (verdict, accepted) = validate_input(input);
        match verdict {
            InputVerdict::Accepted => {}
            InputVerdict::AcceptedWithClamp { original } => {
                debug!(player_id, original, "clamped turn command");
            }
            InputVerdict::DroppedNonFinite => {
                warn!(player_id, "dropped non-finite turn command");
            }
        }
        if let Some(accepted) = accepted {
            inputs.push((player_id, accepted));
        }
        verdicts.push((player_id, verdict));
    }

    (inputs, verdicts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_rejection() {
        let (verdict, input) = validate_input(CycleInput { turn: f64::NAN });
        assert_eq!(verdict, InputVerdict::DroppedNonFinite);
        assert!(input.is_none());
    }

    #[test]
    fn test_inf_rejection() {
        for turn in [f64::INFINITY, f64::NEG_INFINITY] {
            let (verdict, input) = validate_input(CycleInput { turn });
            assert_eq!(verdict, InputVerdict::DroppedNonFinite);
            assert!(!verdict.is_accepted());
            assert!(input.is_none());
        }
    }

    #[test]
    fn test_magnitude_clamp() {
        let (verdict, input) = validate_input(CycleInput { turn: 3.5 });
        assert_eq!(verdict, InputVerdict::AcceptedWithClamp { original: 3.5 });
        assert_eq!(input, Some(CycleInput::RIGHT));

        let (_, input) = validate_input(CycleInput { turn: -1e308 });
        assert_eq!(input, Some(CycleInput::LEFT));
    }

    #[test]
    fn test_valid_input_accepted() {
        for turn in [-1.0, -0.25, 0.0, 0.5, 1.0] {
            let (verdict, input) = validate_input(CycleInput { turn });
            assert_eq!(verdict, InputVerdict::Accepted);
            assert_eq!(input, Some(CycleInput { turn }));
        }
    }

    #[test]
    fn test_sanitize_keeps_order_and_drops() {
        let raw = vec![
            (2, CycleInput { turn: 0.5 }),
            (0, CycleInput { turn: f64::NAN }),
            (1, CycleInput { turn: -4.0 }),
            (2, CycleInput::LEFT),
        ];
        let (inputs, verdicts) = sanitize_inputs(&raw);

        assert_eq!(
            inputs,
            vec![
                (2, CycleInput { turn: 0.5 }),
                (1, CycleInput::LEFT),
                (2, CycleInput::LEFT),
            ]
        );
        assert_eq!(verdicts.len(), 4);
        assert_eq!(verdicts[1], (0, InputVerdict::DroppedNonFinite));
        assert!(verdicts[2].1.is_accepted());
    }
}
