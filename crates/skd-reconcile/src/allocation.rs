//! Allocation engine.
//!
//! A bounded bipartite matching with one side shuffled: eligible
//! validators are sampled uniformly without replacement so no validator
//! is favored for sorting first, while stakes are consumed in gateway
//! order. The RNG is injected; tests seed it for reproducibility.

use rand::seq::SliceRandom;
use rand::Rng;
use skd_schemas::{PlannedAction, StakeAccount, Validator};

/// Pair eligible validators with inactive stakes, one-to-one, bounded by
/// the smaller collection. The i-th sampled validator receives the i-th
/// inactive stake.
pub fn assign<R: Rng + ?Sized>(
    eligible: &[Validator],
    inactive: &[StakeAccount],
    rng: &mut R,
) -> Vec<PlannedAction> {
    let take = eligible.len().min(inactive.len());

    let mut pool: Vec<&Validator> = eligible.iter().collect();
    pool.shuffle(rng);
    pool.truncate(take);

    pool.iter()
        .zip(inactive.iter())
        .map(|(validator, stake)| PlannedAction::Delegate {
            stake_pubkey: stake.stake_pubkey.clone(),
            vote_pubkey: validator.vote_account_pubkey.clone(),
        })
        .collect()
}
