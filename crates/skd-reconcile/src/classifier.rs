//! Stake lifecycle classification.
//!
//! Lifecycle is derived per run from the epoch fields of a snapshot, not
//! stored anywhere. First matching rule wins; the stuck-stake rule must
//! run before the plain activating/deactivating rules or a stuck account
//! would be miscategorized as one of those.

use crate::types::ClassifiedStakes;
use skd_schemas::{StakeAccount, StakeType};

/// Partition stake snapshots into lifecycle buckets relative to `epoch`.
///
/// Rules, in order:
/// 1. `Initialized` account type: inactive (never delegated).
/// 2. activation and deactivation both land this epoch: inactive, and
///    recorded in `stuck`.
/// 3. activation lands this epoch: activating.
/// 4. deactivation lands this epoch: deactivating.
/// 5. deactivated in a past epoch with no live stake: inactive.
/// 6. live active stake present: active.
/// 7. anything else: recorded in `unclassified` for the caller to log.
pub fn classify(stakes: &[StakeAccount], epoch: u64) -> ClassifiedStakes {
    let mut out = ClassifiedStakes::default();

    for stake in stakes {
        if stake.stake_type == StakeType::Initialized {
            out.inactive.push(stake.clone());
            continue;
        }

        if stake.activation_epoch == Some(epoch) && stake.deactivation_epoch == Some(epoch) {
            out.stuck.push(stake.stake_pubkey.clone());
            out.inactive.push(stake.clone());
            continue;
        }

        if stake.activation_epoch == Some(epoch) {
            out.activating.push(stake.clone());
            continue;
        }

        if stake.deactivation_epoch == Some(epoch) {
            out.deactivating.push(stake.clone());
            continue;
        }

        if let Some(deactivation) = stake.deactivation_epoch {
            if stake.active_stake.is_none() && deactivation < epoch {
                out.inactive.push(stake.clone());
                continue;
            }
        }

        if stake.active_stake.is_some() {
            out.active.push(stake.clone());
            continue;
        }

        out.unclassified.push(stake.stake_pubkey.clone());
    }

    out
}
