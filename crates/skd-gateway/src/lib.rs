//! skd-gateway
//!
//! External data gateway: everything that touches the outside world lives
//! here, behind cached and retrying accessors. The reconciliation core
//! never sees a process handle, an HTTP client, or the filesystem.
//!
//! - `process`: process-runner seam plus retry-with-backoff
//! - `chain`: queries through the `solana` binary
//! - `cache`: TTL file cache with explicit invalidation
//! - `onboarding`: directory HTTP API (pagination, rate-limit replay)
//! - `marker`: last-processed-epoch marker file

pub mod cache;
pub mod chain;
pub mod marker;
pub mod onboarding;
pub mod process;

pub use cache::FileCache;
pub use chain::ChainClient;
pub use marker::EpochMarker;
pub use onboarding::OnboardingClient;
pub use process::{run_with_retry, ProcessOutput, ProcessRunner, RetryPolicy, SystemProcessRunner};
