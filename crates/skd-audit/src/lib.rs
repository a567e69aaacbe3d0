//! skd-audit
//!
//! Append-only audit trail for reconciliation runs. JSON Lines, one event
//! per line, with an optional sha256 hash chain so a reviewer can prove
//! nobody edited history between a decision and its execution.
//!
//! Event types emitted by a run: RUN_START, SUMMARY, DECISION, EXEC,
//! RUN_END. The writer is generic over type and payload; the run loop
//! owns the vocabulary.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub run_id: Uuid,
    pub ts_utc: DateTime<Utc>,
    /// Epoch the run was reconciling when the event fired.
    pub epoch: u64,
    pub event_type: String,
    pub payload: Value,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

/// Append-only audit writer. One instance per run.
pub struct AuditWriter {
    path: PathBuf,
    hash_chain: bool,
    last_hash: Option<String>,
    run_id: Uuid,
    epoch: u64,
}

impl AuditWriter {
    /// Creates the audit writer and ensures parent dirs exist.
    pub fn new(
        path: impl AsRef<Path>,
        run_id: Uuid,
        epoch: u64,
        hash_chain: bool,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {parent:?}"))?;
        }

        Ok(Self {
            path,
            hash_chain,
            last_hash: None,
            run_id,
            epoch,
        })
    }

    /// Append one event.
    pub fn append(&mut self, event_type: &str, payload: Value) -> Result<AuditEvent> {
        let mut ev = AuditEvent {
            event_id: Uuid::new_v4(),
            run_id: self.run_id,
            ts_utc: Utc::now(),
            epoch: self.epoch,
            event_type: event_type.to_string(),
            payload,
            hash_prev: None,
            hash_self: None,
        };

        if self.hash_chain {
            ev.hash_prev = self.last_hash.clone();
            let self_hash = compute_event_hash(&ev)?;
            ev.hash_self = Some(self_hash.clone());
            self.last_hash = Some(self_hash);
        }

        let line = canonical_json_line(&ev)?;
        append_line(&self.path, &line)?;

        Ok(ev)
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open audit log {path:?}"))?;
    f.write_all(line.as_bytes())
        .context("write audit line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

/// Canonicalize by sorting keys recursively and emitting compact JSON.
/// One event == one JSON line.
fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize audit event failed")?;
    let sorted = sort_keys(&raw);
    serde_json::to_string(&sorted).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Chain hash over canonical JSON of the event WITHOUT hash_self (to
/// avoid self-reference).
pub fn compute_event_hash(ev: &AuditEvent) -> Result<String> {
    let mut clone = ev.clone();
    clone.hash_self = None;

    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Result of hash chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    Broken { line: usize, reason: String },
}

/// Verify the hash chain integrity of an audit log file.
pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read audit log {:?}", path.as_ref()))?;
    verify_hash_chain_str(&content)
}

/// Same logic as [`verify_hash_chain`] over in-memory JSONL content.
pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut line_count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let ev: AuditEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("parse audit event at line {}", i + 1))?;

        line_count += 1;

        if ev.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, ev.hash_prev
                ),
            });
        }

        if let Some(ref claimed_hash) = ev.hash_self {
            let recomputed = compute_event_hash(&ev)?;
            if *claimed_hash != recomputed {
                return Ok(VerifyResult::Broken {
                    line: i + 1,
                    reason: format!(
                        "hash_self mismatch: claimed {claimed_hash}, recomputed {recomputed}"
                    ),
                });
            }
        }

        prev_hash = ev.hash_self.clone();
    }

    Ok(VerifyResult::Valid { lines: line_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_events(path: &Path, n: usize) {
        let mut w = AuditWriter::new(path, Uuid::new_v4(), 612, true).unwrap();
        for i in 0..n {
            w.append("DECISION", json!({"i": i, "stake": format!("S{i}")}))
                .unwrap();
        }
    }

    #[test]
    fn chain_verifies_clean() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        write_events(&path, 4);
        assert_eq!(
            verify_hash_chain(&path).unwrap(),
            VerifyResult::Valid { lines: 4 }
        );
    }

    #[test]
    fn tampered_line_is_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        write_events(&path, 4);

        let content = fs::read_to_string(&path).unwrap();
        let tampered = content.replacen("\"i\":2", "\"i\":99", 1);
        match verify_hash_chain_str(&tampered).unwrap() {
            VerifyResult::Broken { line, .. } => assert_eq!(line, 3),
            other => panic!("expected Broken, got {other:?}"),
        }
    }

    #[test]
    fn without_chain_events_still_verify() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        let mut w = AuditWriter::new(&path, Uuid::new_v4(), 612, false).unwrap();
        w.append("RUN_START", json!({})).unwrap();
        w.append("RUN_END", json!({})).unwrap();
        assert_eq!(
            verify_hash_chain(&path).unwrap(),
            VerifyResult::Valid { lines: 2 }
        );
    }

    #[test]
    fn events_carry_run_attribution() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        let run_id = Uuid::new_v4();
        let mut w = AuditWriter::new(&path, run_id, 613, true).unwrap();
        let ev = w.append("SUMMARY", json!({"eligible": 7})).unwrap();
        assert_eq!(ev.run_id, run_id);
        assert_eq!(ev.epoch, 613);
        assert_eq!(ev.event_type, "SUMMARY");
    }
}
