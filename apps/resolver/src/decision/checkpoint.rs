//! Per-row decision checkpoint.
//!
//! Each completed decision is appended as one JSON line. A rerun over the
//! same output directory loads these and skips the oracle for those keys.
//! The file is removed once the batch finishes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::models::applicant::ApplicantKey;
use crate::models::decision::DecisionRecord;

pub const CHECKPOINT_FILE: &str = "decisions.checkpoint.jsonl";

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointEntry {
    key: ApplicantKey,
    decision: DecisionRecord,
    recorded_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(CHECKPOINT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every decision recorded so far. A missing file is an empty
    /// checkpoint; unreadable lines (e.g. a torn final write) are skipped.
    pub async fn load(&self) -> std::io::Result<HashMap<ApplicantKey, DecisionRecord>> {
        let body = match tokio::fs::read_to_string(&self.path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e),
        };

        let mut decisions = HashMap::new();
        for (line_no, line) in body.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CheckpointEntry>(line) {
                Ok(entry) => {
                    decisions.insert(entry.key, entry.decision);
                }
                Err(e) => warn!(
                    "Skipping unreadable checkpoint line {} in {}: {e}",
                    line_no + 1,
                    self.path.display()
                ),
            }
        }

        if !decisions.is_empty() {
            info!(
                "Resuming from checkpoint: {} decisions already recorded",
                decisions.len()
            );
        }
        Ok(decisions)
    }

    pub async fn append(&self, key: &ApplicantKey, decision: &DecisionRecord) -> std::io::Result<()> {
        let entry = CheckpointEntry {
            key: key.clone(),
            decision: decision.clone(),
            recorded_at: chrono::Utc::now(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    pub async fn clear(&self) -> std::io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> ApplicantKey {
        ApplicantKey::normalize(raw).unwrap()
    }

    fn decision(label: &str) -> DecisionRecord {
        DecisionRecord::from_fields([label, "r", "m", "c", "d"].map(String::from))
    }

    #[tokio::test]
    async fn test_missing_checkpoint_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::in_dir(dir.path());
        assert!(checkpoint.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_appended_decisions_are_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::in_dir(dir.path());
        checkpoint.append(&key("1"), &decision("Aprobada")).await.unwrap();
        checkpoint.append(&key("2"), &decision("Rechazada")).await.unwrap();

        let loaded = checkpoint.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[&key("1")], decision("Aprobada"));
        assert_eq!(loaded[&key("2")].proposal_label, "Rechazada");
    }

    #[tokio::test]
    async fn test_torn_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::in_dir(dir.path());
        checkpoint.append(&key("1"), &decision("Aprobada")).await.unwrap();
        let mut body = std::fs::read_to_string(checkpoint.path()).unwrap();
        body.push_str("{\"key\":\"2\",\"decis");
        std::fs::write(checkpoint.path(), body).unwrap();

        let loaded = checkpoint.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key(&key("1")));
    }

    #[tokio::test]
    async fn test_clear_removes_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::in_dir(dir.path());
        checkpoint.append(&key("1"), &decision("Aprobada")).await.unwrap();
        checkpoint.clear().await.unwrap();
        assert!(!checkpoint.path().exists());
        checkpoint.clear().await.unwrap();
    }
}
