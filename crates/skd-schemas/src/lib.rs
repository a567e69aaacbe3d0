//! skd-schemas
//!
//! Shared data model for the stake doctor. These structs mirror the JSON
//! shapes emitted by `solana ... --output json-compact` and by the
//! onboarding directory API, so every boundary crate deserializes into the
//! same types. No IO, no business logic.

use serde::{Deserialize, Serialize};

/// Lamports per SOL. Raw chain amounts are integer lamports; policy
/// thresholds are expressed in SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Last signup step of a fully graduated onboarding participant. A
/// validator at this step is already earning its own bonus stake and no
/// longer needs operator support.
pub const GRADUATED_STEP: &str = "a7_earn_testnet_bonus";

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

// ---------------------------------------------------------------------------
// Epoch
// ---------------------------------------------------------------------------

/// Current epoch plus slot progress, from `solana epoch-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochInfo {
    pub epoch: u64,
    pub slot_index: u64,
    pub slots_in_epoch: u64,
}

impl EpochInfo {
    /// Fractional epoch completion in percent (0.0 ..= 100.0).
    pub fn completed_percent(&self) -> f64 {
        if self.slots_in_epoch == 0 {
            return 0.0;
        }
        self.slot_index as f64 / self.slots_in_epoch as f64 * 100.0
    }
}

// ---------------------------------------------------------------------------
// Stake accounts
// ---------------------------------------------------------------------------

/// Account type reported by the stake query. Unknown values must parse,
/// not error: the CLI grows new variants faster than we track them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StakeType {
    Initialized,
    Stake,
    Other(String),
}

impl From<String> for StakeType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Initialized" => StakeType::Initialized,
            "Stake" => StakeType::Stake,
            _ => StakeType::Other(s),
        }
    }
}

impl From<StakeType> for String {
    fn from(t: StakeType) -> Self {
        match t {
            StakeType::Initialized => "Initialized".to_string(),
            StakeType::Stake => "Stake".to_string(),
            StakeType::Other(s) => s,
        }
    }
}

/// One stake account the operator's withdraw authority controls, as a
/// read-only snapshot. Lifecycle is NOT a field here; it is derived each
/// run from the epoch fields relative to the current epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeAccount {
    pub stake_pubkey: String,
    pub stake_type: StakeType,
    /// Total account balance in lamports.
    pub account_balance: u64,
    /// Present once the stake has ever been delegated.
    #[serde(default)]
    pub delegated_vote_account_address: Option<String>,
    #[serde(default)]
    pub activation_epoch: Option<u64>,
    #[serde(default)]
    pub deactivation_epoch: Option<u64>,
    /// Currently active lamports; absent while fully inactive.
    #[serde(default)]
    pub active_stake: Option<u64>,
}

impl StakeAccount {
    pub fn balance_sol(&self) -> f64 {
        lamports_to_sol(self.account_balance)
    }

    /// True when this stake is delegated to the given vote account.
    pub fn delegated_to(&self, vote_pubkey: &str) -> bool {
        self.delegated_vote_account_address.as_deref() == Some(vote_pubkey)
    }
}

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

/// One network validator, from `solana validators`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validator {
    pub identity_pubkey: String,
    pub vote_account_pubkey: String,
    /// Total activated stake in lamports (all delegators, not just ours).
    pub activated_stake: u64,
    /// Vote credits earned in the current epoch.
    pub epoch_credits: u64,
}

impl Validator {
    pub fn stake_active_sol(&self) -> f64 {
        lamports_to_sol(self.activated_stake)
    }
}

// ---------------------------------------------------------------------------
// Onboarding directory
// ---------------------------------------------------------------------------

/// Enrollment state in the onboarding program. The directory emits more
/// states than we care to distinguish; anything unrecognized lands in
/// `Other` and is treated as settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OnboardingState {
    Pending,
    TestnetOnboarded,
    Approved,
    Rejected,
    Other(String),
}

impl From<String> for OnboardingState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Pending" => OnboardingState::Pending,
            "TestnetOnboarded" => OnboardingState::TestnetOnboarded,
            "Approved" => OnboardingState::Approved,
            "Rejected" => OnboardingState::Rejected,
            _ => OnboardingState::Other(s),
        }
    }
}

impl From<OnboardingState> for String {
    fn from(s: OnboardingState) -> Self {
        match s {
            OnboardingState::Pending => "Pending".to_string(),
            OnboardingState::TestnetOnboarded => "TestnetOnboarded".to_string(),
            OnboardingState::Approved => "Approved".to_string(),
            OnboardingState::Rejected => "Rejected".to_string(),
            OnboardingState::Other(s) => s,
        }
    }
}

impl OnboardingState {
    /// True only for participants still mid-process. Everything else
    /// (Approved, Rejected, unknown) is settled and gets skip-listed.
    pub fn is_mid_onboarding(&self) -> bool {
        matches!(
            self,
            OnboardingState::Pending | OnboardingState::TestnetOnboarded
        )
    }
}

/// One row of the paginated directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRecord {
    pub testnet_pubkey: String,
    pub state: OnboardingState,
}

/// Per-identity detail record from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingDetail {
    pub state: OnboardingState,
    #[serde(default)]
    pub last_completed_signup_step: Option<String>,
}

impl OnboardingDetail {
    pub fn is_graduated(&self) -> bool {
        self.last_completed_signup_step.as_deref() == Some(GRADUATED_STEP)
    }
}

// ---------------------------------------------------------------------------
// Planned actions
// ---------------------------------------------------------------------------

/// Why a stake is being deactivated. Carried through to the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeactivateReason {
    /// Validator identity is on the skip list.
    Blacklisted,
    /// Validator holds more activated stake than the capacity ceiling
    /// even after removing our stake.
    OverCapacity,
    /// Validator completed the terminal signup step; our help is done.
    Graduated,
}

impl DeactivateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeactivateReason::Blacklisted => "blacklisted",
            DeactivateReason::OverCapacity => "over_capacity",
            DeactivateReason::Graduated => "graduated",
        }
    }
}

/// A decision the reconciliation core hands to the executor. Rendering to
/// an external command and authorization to run it live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlannedAction {
    Deactivate {
        stake_pubkey: String,
        reason: DeactivateReason,
    },
    Delegate {
        stake_pubkey: String,
        vote_pubkey: String,
    },
}

impl PlannedAction {
    /// The stake account this action mutates. Used to dedupe: two
    /// decisions must never race on the same stake within one run.
    pub fn stake_pubkey(&self) -> &str {
        match self {
            PlannedAction::Deactivate { stake_pubkey, .. } => stake_pubkey,
            PlannedAction::Delegate { stake_pubkey, .. } => stake_pubkey,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_completed_percent() {
        let e = EpochInfo {
            epoch: 512,
            slot_index: 4320,
            slots_in_epoch: 432_000,
        };
        assert!((e.completed_percent() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn epoch_completed_percent_zero_slots() {
        let e = EpochInfo {
            epoch: 1,
            slot_index: 0,
            slots_in_epoch: 0,
        };
        assert_eq!(e.completed_percent(), 0.0);
    }

    #[test]
    fn onboarding_state_unknown_round_trips() {
        let s: OnboardingState = serde_json::from_str("\"Banned\"").unwrap();
        assert_eq!(s, OnboardingState::Other("Banned".to_string()));
        assert!(!s.is_mid_onboarding());
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"Banned\"");
    }

    #[test]
    fn onboarding_state_mid_onboarding() {
        assert!(OnboardingState::Pending.is_mid_onboarding());
        assert!(OnboardingState::TestnetOnboarded.is_mid_onboarding());
        assert!(!OnboardingState::Approved.is_mid_onboarding());
        assert!(!OnboardingState::Rejected.is_mid_onboarding());
    }

    #[test]
    fn stake_account_parses_json_compact_shape() {
        let raw = r#"{
            "stakePubkey": "St4keAAAA",
            "stakeType": "Stake",
            "accountBalance": 2000000000,
            "delegatedVoteAccountAddress": "Vote1111",
            "activationEpoch": 600,
            "activeStake": 1900000000
        }"#;
        let s: StakeAccount = serde_json::from_str(raw).unwrap();
        assert_eq!(s.stake_type, StakeType::Stake);
        assert_eq!(s.activation_epoch, Some(600));
        assert_eq!(s.deactivation_epoch, None);
        assert!(s.delegated_to("Vote1111"));
        assert!((s.balance_sol() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn validator_stake_scaling() {
        let v = Validator {
            identity_pubkey: "Id".to_string(),
            vote_account_pubkey: "Vote".to_string(),
            activated_stake: 4500 * LAMPORTS_PER_SOL,
            epoch_credits: 1234,
        };
        assert!((v.stake_active_sol() - 4500.0).abs() < 1e-9);
    }

    #[test]
    fn graduated_detail() {
        let d = OnboardingDetail {
            state: OnboardingState::Pending,
            last_completed_signup_step: Some(GRADUATED_STEP.to_string()),
        };
        assert!(d.is_graduated());
    }

    #[test]
    fn planned_action_stake_pubkey() {
        let a = PlannedAction::Delegate {
            stake_pubkey: "S1".to_string(),
            vote_pubkey: "V1".to_string(),
        };
        assert_eq!(a.stake_pubkey(), "S1");
    }
}
