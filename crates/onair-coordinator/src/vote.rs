//! Shared vote meter
//!
//! Viewers drag a single process-wide slider. Reaching the top rewards the
//! broadcaster and makes the next climb harder; reaching the bottom votes
//! the broadcaster off the air. Concurrent voters overwrite each other.

use onair_core::config::VoteConfig;
use onair_core::CoordinatorError;

/// Upper threshold
pub const VOTE_MAX: f64 = 100.0;
/// Lower threshold
pub const VOTE_MIN: f64 = 0.0;

/// Result of applying a vote
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoteOutcome {
    /// Position changed, no threshold crossed
    Moved,
    /// Upper threshold reached; step halved and position reset
    Rewarded,
    /// Lower threshold reached; step reset
    VotedOut,
}

/// Position and step of the shared meter
#[derive(Debug, Clone)]
pub struct VoteMeter {
    position: f64,
    step: f64,
    config: VoteConfig,
}

impl VoteMeter {
    /// Create a meter at its resting position
    pub fn new(config: VoteConfig) -> Self {
        Self {
            position: config.initial_position,
            step: config.initial_step,
            config,
        }
    }

    /// Current position in `[0, 100]`
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Current step size, always positive
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Overwrite the position without evaluating thresholds
    pub fn set_initial(&mut self, position: f64) -> Result<f64, CoordinatorError> {
        self.position = clamp(position)?;
        Ok(self.position)
    }

    /// Overwrite the position and evaluate thresholds
    pub fn apply_vote(&mut self, position: f64) -> Result<VoteOutcome, CoordinatorError> {
        let position = clamp(position)?;

        if position >= VOTE_MAX {
            self.step = (self.step / 2.0).max(self.config.min_step);
            self.position = self.config.initial_position;
            Ok(VoteOutcome::Rewarded)
        } else if position <= VOTE_MIN {
            self.step = self.config.initial_step;
            self.position = position;
            Ok(VoteOutcome::VotedOut)
        } else {
            self.position = position;
            Ok(VoteOutcome::Moved)
        }
    }

    /// Restore both position and step, on session start
    pub fn reset(&mut self) {
        self.position = self.config.initial_position;
        self.step = self.config.initial_step;
    }

    /// Restore the step only, on session end
    pub fn reset_step(&mut self) {
        self.step = self.config.initial_step;
    }
}

impl Default for VoteMeter {
    fn default() -> Self {
        Self::new(VoteConfig::default())
    }
}

fn clamp(position: f64) -> Result<f64, CoordinatorError> {
    if !position.is_finite() {
        return Err(CoordinatorError::Malformed(format!(
            "vote position must be a finite number, got {}",
            position
        )));
    }
    Ok(position.clamp(VOTE_MIN, VOTE_MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_rest() {
        let meter = VoteMeter::default();
        assert_eq!(meter.position(), 50.0);
        assert_eq!(meter.step(), 5.0);
    }

    #[test]
    fn test_between_thresholds_passes_through() {
        let mut meter = VoteMeter::default();
        assert_eq!(meter.apply_vote(73.5), Ok(VoteOutcome::Moved));
        assert_eq!(meter.position(), 73.5);
        assert_eq!(meter.step(), 5.0);

        assert_eq!(meter.apply_vote(0.001), Ok(VoteOutcome::Moved));
        assert_eq!(meter.apply_vote(99.999), Ok(VoteOutcome::Moved));
    }

    #[test]
    fn test_exactly_100_rewards() {
        let mut meter = VoteMeter::default();
        assert_eq!(meter.apply_vote(100.0), Ok(VoteOutcome::Rewarded));
        assert_eq!(meter.position(), 50.0);
        assert_eq!(meter.step(), 2.5);

        assert_eq!(meter.apply_vote(100.0), Ok(VoteOutcome::Rewarded));
        assert_eq!(meter.step(), 1.25);
    }

    #[test]
    fn test_exactly_0_votes_out() {
        let mut meter = VoteMeter::default();
        meter.apply_vote(100.0).unwrap();
        assert_eq!(meter.apply_vote(0.0), Ok(VoteOutcome::VotedOut));
        assert_eq!(meter.step(), 5.0);
        assert_eq!(meter.position(), 0.0);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let mut meter = VoteMeter::default();
        assert_eq!(meter.apply_vote(250.0), Ok(VoteOutcome::Rewarded));
        assert_eq!(meter.apply_vote(-3.0), Ok(VoteOutcome::VotedOut));
        assert_eq!(meter.set_initial(120.0), Ok(100.0));
        assert_eq!(meter.position(), 100.0);
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut meter = VoteMeter::default();
        assert!(matches!(
            meter.apply_vote(f64::NAN),
            Err(CoordinatorError::Malformed(_))
        ));
        assert!(meter.set_initial(f64::INFINITY).is_err());
        assert_eq!(meter.position(), 50.0);
    }

    #[test]
    fn test_step_never_reaches_zero() {
        let mut meter = VoteMeter::default();
        for _ in 0..2_000 {
            meter.apply_vote(100.0).unwrap();
        }
        assert!(meter.step() > 0.0);
        assert_eq!(meter.step(), VoteConfig::default().min_step);
    }

    #[test]
    fn test_set_initial_skips_thresholds() {
        let mut meter = VoteMeter::default();
        meter.set_initial(0.0).unwrap();
        assert_eq!(meter.position(), 0.0);
        assert_eq!(meter.step(), 5.0);
    }

    #[test]
    fn test_resets() {
        let mut meter = VoteMeter::default();
        meter.apply_vote(100.0).unwrap();
        meter.apply_vote(30.0).unwrap();

        meter.reset_step();
        assert_eq!(meter.step(), 5.0);
        assert_eq!(meter.position(), 30.0);

        meter.apply_vote(100.0).unwrap();
        meter.apply_vote(80.0).unwrap();
        meter.reset();
        assert_eq!((meter.position(), meter.step()), (50.0, 5.0));
    }
}
