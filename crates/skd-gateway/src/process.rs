//! Process-runner seam.
//!
//! Chain queries and stake mutations both shell out to the `solana`
//! binary. The trait lets tests substitute a scripted runner; the retry
//! wrapper gives every caller the same fixed-backoff policy.

use anyhow::{Context, Result};
use std::process::Command;
use std::time::Duration;

/// Captured result of one process invocation. Exit code -1 means the
/// process terminated without a code (signal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes one external command. Object-safe so callers hold a
/// `&dyn ProcessRunner` and tests inject doubles.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<ProcessOutput>;
}

/// Real runner backed by `std::process::Command`.
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<ProcessOutput> {
        let out = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to spawn {program}"))?;

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&out.stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).trim_end().to_string(),
            exit_code: out.status.code().unwrap_or(-1),
        })
    }
}

/// Fixed-backoff retry budget for external calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub sleep_between: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            sleep_between: Duration::from_secs(10),
        }
    }
}

/// Run a command, retrying on non-zero exit up to the policy bound with a
/// fixed sleep between attempts. Returns the LAST attempt's output
/// unchanged, successful or not; only a spawn failure is an `Err`.
pub fn run_with_retry(
    runner: &dyn ProcessRunner,
    program: &str,
    args: &[String],
    policy: &RetryPolicy,
) -> Result<ProcessOutput> {
    let mut last = None;
    for attempt in 1..=policy.max_retries.max(1) {
        let out = runner.run(program, args)?;
        if out.success() {
            return Ok(out);
        }
        tracing::warn!(
            program,
            exit_code = out.exit_code,
            attempt,
            max = policy.max_retries,
            "command failed, retrying"
        );
        last = Some(out);
        if attempt < policy.max_retries {
            std::thread::sleep(policy.sleep_between);
        }
    }
    // max_retries >= 1, so last is always set here.
    Ok(last.unwrap_or(ProcessOutput {
        stdout: String::new(),
        stderr: "no attempts executed".to_string(),
        exit_code: -1,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails a fixed number of times, then succeeds.
    struct FlakyRunner {
        failures: u32,
        calls: AtomicU32,
    }

    impl ProcessRunner for FlakyRunner {
        fn run(&self, _program: &str, _args: &[String]) -> Result<ProcessOutput> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Ok(ProcessOutput {
                    stdout: String::new(),
                    stderr: format!("boom {n}"),
                    exit_code: 1,
                })
            } else {
                Ok(ProcessOutput {
                    stdout: "ok".to_string(),
                    stderr: String::new(),
                    exit_code: 0,
                })
            }
        }
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            sleep_between: Duration::ZERO,
        }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let runner = FlakyRunner {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let out = run_with_retry(&runner, "solana", &[], &policy(3)).unwrap();
        assert!(out.success());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exhaustion_surfaces_last_attempt() {
        let runner = FlakyRunner {
            failures: 10,
            calls: AtomicU32::new(0),
        };
        let out = run_with_retry(&runner, "solana", &[], &policy(3)).unwrap();
        assert_eq!(out.exit_code, 1);
        assert_eq!(out.stderr, "boom 2");
        assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
    }
}
