#![cfg(unix)]

use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

/// Fake solana binary answering epoch-info with 0.5% completion and
/// failing loudly on anything else: the gate must halt before any other
/// query happens.
fn write_fake_solana(dir: &TempDir) -> String {
    let path = dir.path().join("solana");
    fs::write(
        &path,
        concat!(
            "#!/bin/sh\n",
            "case \"$1\" in\n",
            "  epoch-info) echo '{\"epoch\":612,\"slotIndex\":2160,\"slotsInEpoch\":432000}' ;;\n",
            "  *) echo \"unexpected query $1\" >&2; exit 1 ;;\n",
            "esac\n",
        ),
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn run_halts_cleanly_when_epoch_too_young() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let marker_path = dir.path().join("epoch_last_run");

    let config_path = dir.path().join("doctor.yaml");
    fs::write(
        &config_path,
        format!(
            concat!(
                "solana_binary: {}\n",
                "run:\n",
                "  marker_path: {}\n",
                "  cache_dir: {}\n",
                "  audit_dir: {}\n",
            ),
            write_fake_solana(&dir),
            marker_path.display(),
            dir.path().join("cache").display(),
            dir.path().join("audit").display(),
        ),
    )?;

    let mut cmd = assert_cmd::Command::cargo_bin("skd")?;
    cmd.env_remove("SOLANA_BINARY");
    cmd.args(["run", "--config", config_path.to_str().unwrap()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("too_early=true"))
        .stdout(predicate::str::contains("delegate-stake").not())
        .stdout(predicate::str::contains("deactivate-stake").not());

    // Halted runs leave the marker untouched.
    assert!(!marker_path.exists());
    Ok(())
}
