//! Chain queries through the `solana` CLI binary.
//!
//! Every accessor parses `--output json-compact` into the shared schema
//! types. A query that still fails after the retry budget is fatal to the
//! run: the doctor never reconciles against a partial snapshot.

use crate::process::{run_with_retry, ProcessOutput, ProcessRunner, RetryPolicy};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use skd_schemas::{EpochInfo, StakeAccount, Validator};

pub struct ChainClient<'r> {
    runner: &'r dyn ProcessRunner,
    binary: String,
    rpc_url: String,
    rpc_timeout_secs: u64,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ValidatorsResponse {
    validators: Vec<Validator>,
}

impl<'r> ChainClient<'r> {
    pub fn new(
        runner: &'r dyn ProcessRunner,
        binary: impl Into<String>,
        rpc_url: impl Into<String>,
        rpc_timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            runner,
            binary: binary.into(),
            rpc_url: rpc_url.into(),
            rpc_timeout_secs,
            retry,
        }
    }

    /// Current epoch and slot progress.
    pub fn epoch_info(&self) -> Result<EpochInfo> {
        let out = self.query(&[
            "epoch-info".to_string(),
            "--output".to_string(),
            "json-compact".to_string(),
            "-u".to_string(),
            self.rpc_url.clone(),
        ])?;
        serde_json::from_str(&out.stdout).context("epoch-info output did not parse")
    }

    /// Full validator set with identity, vote account, activated stake
    /// and epoch credits.
    pub fn validators(&self) -> Result<Vec<Validator>> {
        let out = self.query(&[
            "validators".to_string(),
            "--output".to_string(),
            "json-compact".to_string(),
            "-u".to_string(),
            self.rpc_url.clone(),
            format!("--rpc-timeout={}", self.rpc_timeout_secs),
        ])?;
        let resp: ValidatorsResponse =
            serde_json::from_str(&out.stdout).context("validators output did not parse")?;
        Ok(resp.validators)
    }

    /// Every stake account under the given withdraw authority.
    pub fn stakes(&self, withdraw_authority: &str) -> Result<Vec<StakeAccount>> {
        let out = self.query(&[
            "stakes".to_string(),
            "--withdraw-authority".to_string(),
            withdraw_authority.to_string(),
            "--output".to_string(),
            "json-compact".to_string(),
            "-u".to_string(),
            self.rpc_url.clone(),
            format!("--rpc-timeout={}", self.rpc_timeout_secs),
        ])?;
        serde_json::from_str(&out.stdout).context("stakes output did not parse")
    }

    /// Pubkey of the keypair file. Read once at run start; the result
    /// names the withdraw authority for the stakes query.
    pub fn keypair_address(&self, auth_file: &str) -> Result<String> {
        let out = self.query(&[
            "address".to_string(),
            "-k".to_string(),
            auth_file.to_string(),
        ])?;
        Ok(out.stdout.trim().to_string())
    }

    fn query(&self, args: &[String]) -> Result<ProcessOutput> {
        let out = run_with_retry(self.runner, &self.binary, args, &self.retry)?;
        if !out.success() {
            bail!(
                "chain query `{} {}` failed after retries: exit={} stderr={}",
                self.binary,
                args.join(" "),
                out.exit_code,
                out.stderr
            );
        }
        Ok(out)
    }
}
