use skd_reconcile::{
    evaluate, ClassifiedStakes, DetailFetchError, DetailLookup, DetailSource, EligibilityPolicy,
    SkipList,
};
use skd_schemas::{StakeAccount, StakeType, Validator, LAMPORTS_PER_SOL};

struct NeverConsulted;

impl DetailSource for NeverConsulted {
    fn detail(&self, identity: &str) -> Result<DetailLookup, DetailFetchError> {
        panic!("detail lookup must not run for skip-listed identity {identity}");
    }
}

#[test]
fn scenario_duplicate_validator_rows_yield_one_deactivation_per_stake() {
    // The validator list upstream occasionally repeats rows. Both copies
    // hit the blacklist rule; the shared stake must be pulled once.
    let row = Validator {
        identity_pubkey: "DupId".to_string(),
        vote_account_pubkey: "DupVote".to_string(),
        activated_stake: 50 * LAMPORTS_PER_SOL,
        epoch_credits: 1_000,
    };
    let validators = vec![row.clone(), row];

    let buckets = ClassifiedStakes {
        active: vec![StakeAccount {
            stake_pubkey: "SharedStake".to_string(),
            stake_type: StakeType::Stake,
            account_balance: 2 * LAMPORTS_PER_SOL,
            delegated_vote_account_address: Some("DupVote".to_string()),
            activation_epoch: Some(590),
            deactivation_epoch: None,
            active_stake: Some(2 * LAMPORTS_PER_SOL),
        }],
        ..ClassifiedStakes::default()
    };

    let mut skip = SkipList::new();
    skip.insert("DupId".to_string());

    let report = evaluate(
        &validators,
        &skip,
        &buckets,
        &EligibilityPolicy::default(),
        &NeverConsulted,
    )
    .unwrap();

    assert_eq!(report.deactivations.len(), 1);
    assert_eq!(report.deactivations[0].stake_pubkey(), "SharedStake");
    // Both rows are still recorded as excluded.
    assert_eq!(report.exclusions.len(), 2);
}
