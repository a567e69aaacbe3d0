//! skd-exec
//!
//! Action executor: the single choke point between a reconciliation
//! decision and the outside world. Every decision is rendered and printed
//! for audit no matter what; the external command only runs when apply
//! mode is armed, and a stake address is never mutated twice in one run.

use anyhow::Result;
use skd_gateway::process::{run_with_retry, ProcessOutput, ProcessRunner, RetryPolicy};
use skd_schemas::PlannedAction;
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Parameters every rendered command needs: which binary, which keypair
/// acts as authority and fee payer, which endpoint, and the RPC timeout.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub solana_binary: String,
    pub auth_file: String,
    pub rpc_url: String,
    pub rpc_timeout_secs: u64,
}

/// A fully rendered external command, printable for audit and runnable
/// as program + args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for RenderedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program, self.args.join(" "))
    }
}

pub fn render(action: &PlannedAction, ctx: &ExecContext) -> RenderedCommand {
    let args = match action {
        PlannedAction::Deactivate { stake_pubkey, .. } => vec![
            "deactivate-stake".to_string(),
            stake_pubkey.clone(),
            "--stake-authority".to_string(),
            ctx.auth_file.clone(),
            "--fee-payer".to_string(),
            ctx.auth_file.clone(),
            "--keypair".to_string(),
            ctx.auth_file.clone(),
            "-u".to_string(),
            ctx.rpc_url.clone(),
            format!("--rpc-timeout={}", ctx.rpc_timeout_secs),
        ],
        PlannedAction::Delegate {
            stake_pubkey,
            vote_pubkey,
        } => vec![
            "delegate-stake".to_string(),
            stake_pubkey.clone(),
            vote_pubkey.clone(),
            "--keypair".to_string(),
            ctx.auth_file.clone(),
            "--fee-payer".to_string(),
            ctx.auth_file.clone(),
            "-u".to_string(),
            ctx.rpc_url.clone(),
            format!("--rpc-timeout={}", ctx.rpc_timeout_secs),
        ],
    };
    RenderedCommand {
        program: ctx.solana_binary.clone(),
        args,
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Dry-run is the default safe mode: decisions are printed and audited,
/// nothing mutates. Apply must be armed explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    DryRun,
    Apply,
}

/// What happened to one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// A prior action this run already touched the same stake address.
    SkippedDuplicate,
    /// Rendered and printed only (dry-run).
    Printed { rendered: String },
    /// Rendered, printed and executed; `output` is the final attempt's
    /// stdout/stderr/exit-code triple, unchanged.
    Executed {
        rendered: String,
        output: ProcessOutput,
    },
}

pub struct ActionExecutor<'r> {
    ctx: ExecContext,
    mode: ExecutionMode,
    runner: &'r dyn ProcessRunner,
    retry: RetryPolicy,
    touched_stakes: BTreeSet<String>,
}

impl<'r> ActionExecutor<'r> {
    pub fn new(
        ctx: ExecContext,
        mode: ExecutionMode,
        runner: &'r dyn ProcessRunner,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            ctx,
            mode,
            runner,
            retry,
            touched_stakes: BTreeSet::new(),
        }
    }

    /// Carry out one decision. Always prints the rendered command; only
    /// mutates in apply mode.
    pub fn execute(&mut self, action: &PlannedAction) -> Result<ExecOutcome> {
        if !self.touched_stakes.insert(action.stake_pubkey().to_string()) {
            tracing::warn!(
                stake = action.stake_pubkey(),
                "stake already handled this run, skipping duplicate action"
            );
            return Ok(ExecOutcome::SkippedDuplicate);
        }

        let command = render(action, &self.ctx);
        let rendered = command.to_string();
        println!(" - {rendered}");

        if self.mode == ExecutionMode::DryRun {
            return Ok(ExecOutcome::Printed { rendered });
        }

        let output = run_with_retry(self.runner, &command.program, &command.args, &self.retry)?;
        if output.success() {
            println!("{}", output.stdout);
        } else {
            tracing::error!(
                stake = action.stake_pubkey(),
                exit_code = output.exit_code,
                stderr = %output.stderr,
                "action failed after retries"
            );
        }
        Ok(ExecOutcome::Executed { rendered, output })
    }
}
