//! skd entry point.
//!
//! This file is intentionally thin: argument parsing, tracing setup and
//! dispatch. The reconciliation run itself lives in `commands::run`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "skd")]
#[command(about = "Stake doctor: unattended stake-delegation reconciliation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one reconciliation run (dry-run unless --apply)
    Run {
        /// Layered config paths in merge order (base -> overrides)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// RPC endpoint, overrides the config value
        #[arg(short = 'u', long)]
        url: Option<String>,

        /// Keypair file acting as authority and fee payer
        #[arg(long)]
        auth_file: Option<String>,

        /// Actually execute decisions. Without this every decision is
        /// printed and audited but nothing mutates.
        #[arg(long, default_value_t = false)]
        apply: bool,

        /// Verbose diagnostics
        #[arg(long, default_value_t = false)]
        debug: bool,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Audit trail utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Verify the hash chain of an audit log
    Verify {
        #[arg(long)]
        path: String,
    },
}

fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file
    // does not exist; deployments inject env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Run {
            config_paths,
            url,
            auth_file,
            apply,
            debug,
        } => {
            init_tracing(debug);
            commands::run::execute(commands::run::RunArgs {
                config_paths,
                url,
                auth_file,
                apply,
            })
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = skd_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(())
        }

        Commands::Audit { cmd } => match cmd {
            AuditCmd::Verify { path } => match skd_audit::verify_hash_chain(&path)? {
                skd_audit::VerifyResult::Valid { lines } => {
                    println!("audit_chain_valid=true lines={lines}");
                    Ok(())
                }
                skd_audit::VerifyResult::Broken { line, reason } => {
                    anyhow::bail!("audit chain broken at line {line}: {reason}")
                }
            },
        },
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
