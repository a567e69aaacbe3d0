#![cfg(unix)]

use predicates::prelude::*;
use serde_json::json;
use skd_gateway::FileCache;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

/// Fake solana binary serving a full snapshot: one eligible validator,
/// one skip-listed validator holding our active stake, one free stake.
fn write_fake_solana(dir: &TempDir) -> String {
    let validators = json!({"validators": [
        {"identityPubkey": "IdGood", "voteAccountPubkey": "VoteGood",
         "activatedStake": 100_000_000_000u64, "epochCredits": 900},
        {"identityPubkey": "IdBad", "voteAccountPubkey": "VoteBad",
         "activatedStake": 100_000_000_000u64, "epochCredits": 900},
    ]});
    let stakes = json!([
        {"stakePubkey": "StakeFree", "stakeType": "Initialized",
         "accountBalance": 2_000_000_000u64},
        {"stakePubkey": "StakeOnBad", "stakeType": "Stake",
         "accountBalance": 2_000_000_000u64,
         "delegatedVoteAccountAddress": "VoteBad",
         "activationEpoch": 600, "activeStake": 2_000_000_000u64},
    ]);

    let path = dir.path().join("solana");
    fs::write(
        &path,
        format!(
            concat!(
                "#!/bin/sh\n",
                "case \"$1\" in\n",
                "  epoch-info) echo '{{\"epoch\":612,\"slotIndex\":8640,\"slotsInEpoch\":432000}}' ;;\n",
                "  address) echo 'AuthPubkey111' ;;\n",
                "  validators) echo '{validators}' ;;\n",
                "  stakes) echo '{stakes}' ;;\n",
                "  *) echo \"unexpected query $1\" >&2; exit 1 ;;\n",
                "esac\n",
            ),
            validators = validators,
            stakes = stakes,
        ),
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_str().unwrap().to_string()
}

/// Seed every onboarding response into the cache so the run is fully
/// offline: the base URL below is unroutable on purpose.
fn seed_onboarding_cache(cache_dir: &std::path::Path) {
    let cache = FileCache::new(cache_dir, 6).unwrap();
    cache
        .put(
            "validators_list_all_limit_100_offset_0",
            &json!({"data": [
                {"testnetPubkey": "IdGood", "state": "Pending"},
                {"testnetPubkey": "IdBad", "state": "Rejected"},
            ]}),
        )
        .unwrap();
    cache
        .put("validators_list_all_limit_100_offset_100", &json!({"data": []}))
        .unwrap();
    cache
        .put(
            "testnet_identity_IdGood",
            &json!({
                "testnetPubkey": "IdGood",
                "state": "Pending",
                "lastCompletedSignupStep": "a5_vote"
            }),
        )
        .unwrap();
}

#[test]
fn dry_run_decides_everything_and_mutates_nothing() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let marker_path = dir.path().join("epoch_last_run");
    let cache_dir = dir.path().join("cache");
    let audit_dir = dir.path().join("audit");
    seed_onboarding_cache(&cache_dir);

    let config_path = dir.path().join("doctor.yaml");
    fs::write(
        &config_path,
        format!(
            concat!(
                "solana_binary: {}\n",
                "auth_file: doctor.json\n",
                "onboarding:\n",
                "  base_url: http://127.0.0.1:9\n",
                "run:\n",
                "  marker_path: {}\n",
                "  cache_dir: {}\n",
                "  audit_dir: {}\n",
            ),
            write_fake_solana(&dir),
            marker_path.display(),
            cache_dir.display(),
            audit_dir.display(),
        ),
    )?;

    let mut cmd = assert_cmd::Command::cargo_bin("skd")?;
    cmd.env_remove("SOLANA_BINARY");
    cmd.args(["run", "--config", config_path.to_str().unwrap()]);
    cmd.assert()
        .success()
        // Summary counts print before any rendered action.
        .stdout(predicate::str::contains("inactive=1"))
        .stdout(predicate::str::contains("active=1"))
        .stdout(predicate::str::contains("skip_list=1"))
        .stdout(predicate::str::contains("eligible_validators=1"))
        // The skip-listed validator loses our stake; the eligible one
        // receives the free stake.
        .stdout(predicate::str::contains("deactivate-stake StakeOnBad"))
        .stdout(predicate::str::contains("delegate-stake StakeFree VoteGood"))
        .stdout(predicate::str::contains("run_complete=true"));

    // Dry run still records the processed epoch and an intact audit log.
    assert_eq!(fs::read_to_string(&marker_path)?.trim(), "612");

    let run_dir = fs::read_dir(&audit_dir)?.next().unwrap()?.path();
    let verdict = skd_audit::verify_hash_chain(run_dir.join("audit.jsonl"))?;
    assert!(matches!(verdict, skd_audit::VerifyResult::Valid { lines } if lines >= 4));

    Ok(())
}
