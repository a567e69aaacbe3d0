//! Typed configuration view.
//!
//! Defaults are centralized here and every field is injectable, so tests
//! construct a `DoctorConfig` directly and override single knobs without
//! touching YAML.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DoctorConfig {
    /// RPC endpoint handed to every `solana` invocation.
    pub rpc_url: String,
    /// Keypair file acting as stake/withdraw authority and fee payer.
    pub auth_file: String,
    /// Path of the `solana` binary. The SOLANA_BINARY env var, when set,
    /// overrides this after load.
    pub solana_binary: String,
    pub onboarding: OnboardingConfig,
    pub limits: LimitsConfig,
    pub retry: RetryConfig,
    pub run: RunConfig,
}

impl Default for DoctorConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.testnet.solana.com".to_string(),
            auth_file: "doctor.json".to_string(),
            solana_binary: "solana".to_string(),
            onboarding: OnboardingConfig::default(),
            limits: LimitsConfig::default(),
            retry: RetryConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl DoctorConfig {
    /// Apply process-environment overrides. Called once by the CLI after
    /// file layers and flags are merged.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(bin) = std::env::var("SOLANA_BINARY") {
            if !bin.trim().is_empty() {
                self.solana_binary = bin;
            }
        }
    }
}

/// Onboarding directory API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingConfig {
    pub base_url: String,
    /// Rows per directory page.
    pub page_limit: u64,
    /// Freshness window for cached responses.
    pub cache_ttl_hours: u64,
    /// Sleep after a rate-limited response before refetching.
    pub rate_limit_backoff_secs: u64,
    /// Attempts per page / per detail lookup before the run aborts.
    pub max_fetch_attempts: u32,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.solana.org".to_string(),
            page_limit: 100,
            cache_ttl_hours: 6,
            rate_limit_backoff_secs: 30,
            max_fetch_attempts: 5,
        }
    }
}

/// Decision thresholds for the reconciliation core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Per-validator activated-stake ceiling (SOL) for new delegations.
    pub max_stake_active_sol: f64,
    /// Minimum epoch credits before a validator counts as live.
    pub min_epoch_credits: u64,
    /// Minimum epoch completion before a run proceeds, in percent.
    pub epoch_min_percent_passed: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_stake_active_sol: 3999.0,
            min_epoch_credits: 500,
            epoch_min_percent_passed: 1.0,
        }
    }
}

/// External-call retry and timeout budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_command_retries: u32,
    pub command_retry_sleep_secs: u64,
    /// --rpc-timeout passed to the solana binary.
    pub rpc_timeout_secs: u64,
    pub http_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_command_retries: 3,
            command_retry_sleep_secs: 10,
            rpc_timeout_secs: 60,
            http_timeout_secs: 30,
        }
    }
}

/// Per-run filesystem locations and the repeat-epoch switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub cache_dir: String,
    /// Marker file holding the last fully processed epoch.
    pub marker_path: String,
    pub audit_dir: String,
    /// When true, a run against an epoch equal to the marker halts
    /// cleanly. Off by default: the marker stays advisory.
    pub skip_repeat_epoch: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cache_dir: "/tmp/stake-doctor/cache".to_string(),
            marker_path: "/tmp/stake-doctor/epoch_last_run".to_string(),
            audit_dir: "audit".to_string(),
            skip_repeat_epoch: false,
        }
    }
}
