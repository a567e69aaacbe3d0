//! One reconciliation run, end to end.
//!
//! Pipeline: epoch gate, onboarding directory into skip list, chain
//! snapshots, lifecycle classification, eligibility filter, randomized
//! allocation, execution. Summary counts print before any mutating
//! action; the marker is written only after a run that reached the end.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use skd_audit::AuditWriter;
use skd_config::{DoctorConfig, LoadedConfig};
use skd_exec::{render, ActionExecutor, ExecContext, ExecOutcome, ExecutionMode};
use skd_gateway::process::{RetryPolicy, SystemProcessRunner};
use skd_gateway::{ChainClient, EpochMarker, FileCache, OnboardingClient};
use skd_reconcile::{
    assign, build_skip_list, classify, evaluate, EligibilityPolicy, EpochGate, GateDecision,
};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct RunArgs {
    pub config_paths: Vec<String>,
    pub url: Option<String>,
    pub auth_file: Option<String>,
    pub apply: bool,
}

pub fn execute(args: RunArgs) -> Result<()> {
    let (loaded, cfg) = load_config(&args)?;
    let run_id = Uuid::new_v4();

    let runner = SystemProcessRunner;
    let retry = RetryPolicy {
        max_retries: cfg.retry.max_command_retries,
        sleep_between: Duration::from_secs(cfg.retry.command_retry_sleep_secs),
    };
    let chain = ChainClient::new(
        &runner,
        &cfg.solana_binary,
        &cfg.rpc_url,
        cfg.retry.rpc_timeout_secs,
        retry.clone(),
    );

    // No epoch info, no run: reconciling against a partial snapshot is
    // worse than not reconciling at all.
    let epoch_info = chain.epoch_info().context("cannot obtain epoch info")?;
    let marker = EpochMarker::new(&cfg.run.marker_path);
    let last_run = marker.last_run();
    println!("epoch={} last_epoch_run={last_run}", epoch_info.epoch);

    let gate = EpochGate {
        min_completed_percent: cfg.limits.epoch_min_percent_passed,
        skip_repeat_epoch: cfg.run.skip_repeat_epoch,
    };
    match gate.evaluate(&epoch_info, last_run) {
        GateDecision::Proceed => {}
        GateDecision::TooEarly { completed_percent } => {
            println!("too_early=true completed_percent={completed_percent:.2}");
            return Ok(());
        }
        GateDecision::AlreadyRan { epoch } => {
            println!("already_ran=true epoch={epoch}");
            return Ok(());
        }
    }

    let audit_path = Path::new(&cfg.run.audit_dir)
        .join(run_id.to_string())
        .join("audit.jsonl");
    let mut audit = AuditWriter::new(&audit_path, run_id, epoch_info.epoch, true)?;
    audit.append(
        "RUN_START",
        json!({
            "config_hash": loaded.config_hash.clone(),
            "rpc_url": cfg.rpc_url.clone(),
            "apply": args.apply,
        }),
    )?;
    println!("run_id={run_id}");
    println!("config_hash={}", loaded.config_hash);

    // Directory first: a skip list is cheap and a rate-limited directory
    // should halt the run before any chain traffic.
    info!("fetching onboarding directory");
    let cache = FileCache::new(&cfg.run.cache_dir, cfg.onboarding.cache_ttl_hours)?;
    let onboarding = OnboardingClient::new(
        &cfg.onboarding.base_url,
        cfg.onboarding.page_limit,
        cache,
        Duration::from_secs(cfg.retry.http_timeout_secs),
        Duration::from_secs(cfg.onboarding.rate_limit_backoff_secs),
        cfg.onboarding.max_fetch_attempts,
    )?;
    let records = onboarding.fetch_directory()?;
    let skip_list = build_skip_list(&records);
    println!("skip_list={}", skip_list.len());

    let withdraw_authority = chain
        .keypair_address(&cfg.auth_file)
        .context("cannot resolve withdraw authority")?;
    let validators = chain
        .validators()
        .context("cannot obtain validator snapshot")?;
    let stakes = chain
        .stakes(&withdraw_authority)
        .context("cannot obtain stake snapshot")?;

    let buckets = classify(&stakes, epoch_info.epoch);
    for pubkey in &buckets.stuck {
        warn!(stake = %pubkey, "stuck: activated and deactivated in the same epoch");
    }
    if !buckets.unclassified.is_empty() {
        warn!(
            count = buckets.unclassified.len(),
            stakes = ?buckets.unclassified,
            "stakes matched no lifecycle rule"
        );
    }

    let policy = EligibilityPolicy {
        max_stake_active_sol: cfg.limits.max_stake_active_sol,
        min_epoch_credits: cfg.limits.min_epoch_credits,
    };
    let report = evaluate(&validators, &skip_list, &buckets, &policy, &onboarding)?;
    for (identity, reason) in &report.exclusions {
        debug!(%identity, reason = reason.as_str(), "validator excluded");
    }

    // Summary always precedes mutation.
    let (inactive, active, activating, deactivating) = buckets.bucket_counts();
    println!("inactive={inactive}");
    println!("active={active}");
    println!("activating={activating}");
    println!("deactivating={deactivating}");
    println!("unclassified={}", buckets.unclassified.len());
    println!("eligible_validators={}", report.eligible.len());
    audit.append(
        "SUMMARY",
        json!({
            "inactive": inactive,
            "active": active,
            "activating": activating,
            "deactivating": deactivating,
            "stuck": buckets.stuck.len(),
            "unclassified": buckets.unclassified.len(),
            "skip_list": skip_list.len(),
            "eligible": report.eligible.len(),
        }),
    )?;

    let mut rng = StdRng::from_entropy();
    let delegations = assign(&report.eligible, &buckets.inactive, &mut rng);

    let exec_ctx = ExecContext {
        solana_binary: cfg.solana_binary.clone(),
        auth_file: cfg.auth_file.clone(),
        rpc_url: cfg.rpc_url.clone(),
        rpc_timeout_secs: cfg.retry.rpc_timeout_secs,
    };
    let mode = if args.apply {
        ExecutionMode::Apply
    } else {
        ExecutionMode::DryRun
    };
    let mut executor = ActionExecutor::new(exec_ctx.clone(), mode, &runner, retry);

    for action in report.deactivations.iter().chain(delegations.iter()) {
        audit.append(
            "DECISION",
            json!({
                "action": action,
                "rendered": render(action, &exec_ctx).to_string(),
            }),
        )?;
        match executor.execute(action)? {
            ExecOutcome::Executed { rendered, output } => {
                audit.append(
                    "EXEC",
                    json!({ "rendered": rendered, "exit_code": output.exit_code }),
                )?;
            }
            ExecOutcome::Printed { .. } | ExecOutcome::SkippedDuplicate => {}
        }
    }

    marker.record(epoch_info.epoch)?;
    audit.append(
        "RUN_END",
        json!({
            "deactivations": report.deactivations.len(),
            "delegations": delegations.len(),
        }),
    )?;
    println!(
        "run_complete=true deactivations={} delegations={}",
        report.deactivations.len(),
        delegations.len()
    );

    Ok(())
}

fn load_config(args: &RunArgs) -> Result<(LoadedConfig, DoctorConfig)> {
    let loaded = if args.config_paths.is_empty() {
        skd_config::load_layered_yaml_from_strings(&[])?
    } else {
        let path_refs: Vec<&str> = args.config_paths.iter().map(|s| s.as_str()).collect();
        skd_config::load_layered_yaml(&path_refs)?
    };
    let mut cfg = loaded.typed()?;

    // CLI flags override file layers; env overrides come last.
    if let Some(url) = &args.url {
        cfg.rpc_url = url.clone();
    }
    if let Some(auth_file) = &args.auth_file {
        cfg.auth_file = auth_file.clone();
    }
    cfg.apply_env_overrides();

    Ok((loaded, cfg))
}
