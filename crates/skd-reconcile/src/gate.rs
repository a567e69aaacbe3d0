//! Epoch gate.
//!
//! Decides whether the epoch has progressed far enough for a run to act.
//! Pure decision logic; reading and writing the last-run marker file is
//! the gateway's job.

use skd_schemas::EpochInfo;

/// Gate verdict for one run. Anything but `Proceed` halts the run
/// cleanly: exit code 0, no actions, marker untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Proceed,
    /// Epoch completion is below the configured minimum.
    TooEarly { completed_percent: f64 },
    /// This epoch was already processed. Only produced when the
    /// repeat-epoch switch is enabled.
    AlreadyRan { epoch: u64 },
}

impl GateDecision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, GateDecision::Proceed)
    }
}

/// Run gate. `skip_repeat_epoch` defaults to off: the original tool
/// computed the repeat check but never enforced it, so enforcement is an
/// explicit opt-in rather than dead code.
#[derive(Debug, Clone)]
pub struct EpochGate {
    pub min_completed_percent: f64,
    pub skip_repeat_epoch: bool,
}

impl Default for EpochGate {
    fn default() -> Self {
        Self {
            min_completed_percent: 1.0,
            skip_repeat_epoch: false,
        }
    }
}

impl EpochGate {
    pub fn evaluate(&self, info: &EpochInfo, last_run_epoch: u64) -> GateDecision {
        if self.skip_repeat_epoch && last_run_epoch == info.epoch {
            return GateDecision::AlreadyRan { epoch: info.epoch };
        }

        let completed_percent = info.completed_percent();
        if completed_percent < self.min_completed_percent {
            return GateDecision::TooEarly { completed_percent };
        }

        GateDecision::Proceed
    }
}
