//! Eligibility filter.
//!
//! For each validator an ordered chain of disqualifying checks runs until
//! one applies; a validator surviving every check joins the eligible set.
//! Two of the checks shed the operator's own stake as a side effect: the
//! resulting deactivations come back in the report, deduplicated by stake
//! address, for the executor to carry out.
//!
//! Onboarding detail lookups enter through [`DetailSource`]. The gateway
//! behind that trait owns caching and rate-limit retry; this filter only
//! ever sees a resolved record, a definitive not-found, or a terminal
//! failure that aborts the whole evaluation.

use crate::types::{ClassifiedStakes, ExclusionReason, SkipList};
use skd_schemas::{DeactivateReason, OnboardingDetail, PlannedAction, StakeAccount, Validator};
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Detail lookup seam
// ---------------------------------------------------------------------------

/// Resolved outcome of a per-identity directory lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailLookup {
    Found(OnboardingDetail),
    /// The directory definitively does not know this identity. Terminal;
    /// never retried.
    NotFound,
}

/// Terminal failure of a detail lookup after the source exhausted its own
/// retry budget. Aborts the evaluation: partial eligibility output must
/// not feed the allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailFetchError(pub String);

impl fmt::Display for DetailFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "onboarding detail lookup failed: {}", self.0)
    }
}

impl std::error::Error for DetailFetchError {}

/// Per-identity onboarding-detail capability, implemented by the external
/// data gateway. Object-safe so the filter holds a `&dyn DetailSource`.
pub trait DetailSource {
    fn detail(&self, identity: &str) -> Result<DetailLookup, DetailFetchError>;
}

// ---------------------------------------------------------------------------
// Policy and report
// ---------------------------------------------------------------------------

/// Thresholds for the disqualification chain.
#[derive(Debug, Clone)]
pub struct EligibilityPolicy {
    /// Per-validator activated-stake ceiling in SOL.
    pub max_stake_active_sol: f64,
    /// Minimum epoch credits before a validator counts as live.
    pub min_epoch_credits: u64,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            max_stake_active_sol: 3999.0,
            min_epoch_credits: 500,
        }
    }
}

/// Filter output: who may receive stake, what must be deactivated, and
/// why everyone else was excluded.
#[derive(Debug, Clone, Default)]
pub struct EligibilityReport {
    pub eligible: Vec<Validator>,
    /// Deactivations to execute, unique per stake address.
    pub deactivations: Vec<PlannedAction>,
    pub exclusions: Vec<(String, ExclusionReason)>,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Run the disqualification chain over every validator.
///
/// Check order per validator, first applicable outcome wins:
/// 1. skip-listed: pull all of our active/activating stake, exclude
/// 2. epoch credits below threshold: exclude
/// 3. our stake already activating toward it: exclude
/// 4. over the ceiling even without our stake: shed that stake, exclude
/// 5. over the ceiling, nothing to shed: exclude
/// 6. directory record missing or settled: exclude
/// 7. no recorded signup step: exclude
/// 8. graduated: pull all of our active/activating stake, exclude
/// 9. otherwise eligible
pub fn evaluate(
    validators: &[Validator],
    skip_list: &SkipList,
    stakes: &ClassifiedStakes,
    policy: &EligibilityPolicy,
    details: &dyn DetailSource,
) -> Result<EligibilityReport, DetailFetchError> {
    let mut report = EligibilityReport::default();
    let mut seen_stakes: BTreeSet<String> = BTreeSet::new();

    for validator in validators {
        let identity = &validator.identity_pubkey;
        let vote = &validator.vote_account_pubkey;
        let stake_active_sol = validator.stake_active_sol();

        if skip_list.contains(identity) {
            push_live_stake_deactivations(
                &mut report,
                &mut seen_stakes,
                stakes,
                vote,
                DeactivateReason::Blacklisted,
            );
            report
                .exclusions
                .push((identity.clone(), ExclusionReason::Blacklisted));
            continue;
        }

        if validator.epoch_credits < policy.min_epoch_credits {
            report.exclusions.push((
                identity.clone(),
                ExclusionReason::LowCredits {
                    epoch_credits: validator.epoch_credits,
                },
            ));
            continue;
        }

        if stakes.activating.iter().any(|s| s.delegated_to(vote)) {
            report
                .exclusions
                .push((identity.clone(), ExclusionReason::AlreadyActivating));
            continue;
        }

        // Scan every active stake of ours on this vote account; the last
        // one whose removal still leaves the validator over the ceiling
        // wins the trim.
        let mut trim: Option<&StakeAccount> = None;
        for stake in stakes.active.iter().filter(|s| s.delegated_to(vote)) {
            if stake_active_sol - stake.balance_sol() > policy.max_stake_active_sol {
                trim = Some(stake);
            }
        }
        if let Some(stake) = trim {
            if seen_stakes.insert(stake.stake_pubkey.clone()) {
                report.deactivations.push(PlannedAction::Deactivate {
                    stake_pubkey: stake.stake_pubkey.clone(),
                    reason: DeactivateReason::OverCapacity,
                });
            }
            report.exclusions.push((
                identity.clone(),
                ExclusionReason::OverCapacityTrimmed { stake_active_sol },
            ));
            continue;
        }

        if stake_active_sol > policy.max_stake_active_sol {
            report.exclusions.push((
                identity.clone(),
                ExclusionReason::OverCapacity { stake_active_sol },
            ));
            continue;
        }

        let detail = match details.detail(identity)? {
            DetailLookup::NotFound => {
                report
                    .exclusions
                    .push((identity.clone(), ExclusionReason::NotInProgram));
                continue;
            }
            DetailLookup::Found(detail) => detail,
        };

        if !detail.state.is_mid_onboarding() {
            report
                .exclusions
                .push((identity.clone(), ExclusionReason::NotInProgram));
            continue;
        }

        if detail.last_completed_signup_step.is_none() {
            report
                .exclusions
                .push((identity.clone(), ExclusionReason::NoRecordedStep));
            continue;
        }

        if detail.is_graduated() {
            push_live_stake_deactivations(
                &mut report,
                &mut seen_stakes,
                stakes,
                vote,
                DeactivateReason::Graduated,
            );
            report
                .exclusions
                .push((identity.clone(), ExclusionReason::Graduated));
            continue;
        }

        report.eligible.push(validator.clone());
    }

    Ok(report)
}

/// Deactivate every active and activating stake delegated to `vote`.
fn push_live_stake_deactivations(
    report: &mut EligibilityReport,
    seen_stakes: &mut BTreeSet<String>,
    stakes: &ClassifiedStakes,
    vote: &str,
    reason: DeactivateReason,
) {
    for stake in stakes.active.iter().chain(stakes.activating.iter()) {
        if !stake.delegated_to(vote) {
            continue;
        }
        if seen_stakes.insert(stake.stake_pubkey.clone()) {
            report.deactivations.push(PlannedAction::Deactivate {
                stake_pubkey: stake.stake_pubkey.clone(),
                reason,
            });
        }
    }
}
