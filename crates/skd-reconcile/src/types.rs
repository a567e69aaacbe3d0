use serde::Serialize;
use skd_schemas::StakeAccount;
use std::collections::BTreeSet;

/// Validator identities excluded from new delegation this run. Built
/// fresh from the onboarding directory; insertion order is irrelevant and
/// duplicates collapse.
pub type SkipList = BTreeSet<String>;

/// Stake snapshots partitioned by derived lifecycle state, plus the
/// anomalies seen while partitioning. Buckets are pairwise disjoint; a
/// stake lands in exactly one bucket or in `unclassified`.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedStakes {
    /// Never delegated, or fully wound down. Delegation candidates.
    pub inactive: Vec<StakeAccount>,
    /// Carrying live active stake.
    pub active: Vec<StakeAccount>,
    /// Activation lands this epoch.
    pub activating: Vec<StakeAccount>,
    /// Deactivation lands this epoch.
    pub deactivating: Vec<StakeAccount>,
    /// Activated and deactivated in the same epoch. Classified inactive,
    /// but reported: this indicates operator error or a race with a
    /// prior run.
    pub stuck: Vec<String>,
    /// Matched no lifecycle rule. Counted and reported, never silently
    /// dropped.
    pub unclassified: Vec<String>,
}

impl ClassifiedStakes {
    /// (inactive, active, activating, deactivating) sizes for summaries.
    pub fn bucket_counts(&self) -> (usize, usize, usize, usize) {
        (
            self.inactive.len(),
            self.active.len(),
            self.activating.len(),
            self.deactivating.len(),
        )
    }
}

/// Why a validator was left out of the eligible set. Stable evidence for
/// debug logging and the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Identity is on the skip list; any of our live stake gets pulled.
    Blacklisted,
    /// Participation below the liveness threshold.
    LowCredits { epoch_credits: u64 },
    /// One of our stakes is already activating toward this vote account.
    AlreadyActivating,
    /// Over the ceiling even after removing our stake; one deactivation
    /// was emitted to shed the marginal exposure.
    OverCapacityTrimmed { stake_active_sol: f64 },
    /// Over the ceiling with nothing of ours worth trimming.
    OverCapacity { stake_active_sol: f64 },
    /// Directory has no usable record: unknown identity or a settled
    /// state.
    NotInProgram,
    /// Valid state but no recorded signup step; not yet a real
    /// participant.
    NoRecordedStep,
    /// Completed the terminal signup step; support withdrawn.
    Graduated,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::Blacklisted => "blacklisted",
            ExclusionReason::LowCredits { .. } => "low_credits",
            ExclusionReason::AlreadyActivating => "already_activating",
            ExclusionReason::OverCapacityTrimmed { .. } => "over_capacity_trimmed",
            ExclusionReason::OverCapacity { .. } => "over_capacity",
            ExclusionReason::NotInProgram => "not_in_program",
            ExclusionReason::NoRecordedStep => "no_recorded_step",
            ExclusionReason::Graduated => "graduated",
        }
    }
}
