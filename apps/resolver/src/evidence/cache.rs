//! Evidence checkpoint.
//!
//! Page analyses are the most expensive part of a batch. Once extraction
//! finishes they are written here, so a batch that later fails in the
//! decision or artifact stage does not send every page to the vision model
//! again when it is rerun. Removed together with the decision checkpoint.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::evidence::EvidenceRecord;

pub const EVIDENCE_CACHE_FILE: &str = "evidence.checkpoint.json";

#[derive(Debug, Serialize, Deserialize)]
struct CachedEvidence {
    records: Vec<EvidenceRecord>,
    recorded_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct EvidenceCache {
    path: PathBuf,
}

impl EvidenceCache {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(EVIDENCE_CACHE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the saved records, or `None` when nothing usable was saved.
    /// An unreadable file is treated as absent and the pages are analyzed again.
    pub async fn load(&self) -> std::io::Result<Option<Vec<EvidenceRecord>>> {
        let body = match tokio::fs::read_to_string(&self.path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        match serde_json::from_str::<CachedEvidence>(&body) {
            Ok(cached) => {
                info!(
                    "Reusing evidence for {} folders recorded at {}",
                    cached.records.len(),
                    cached.recorded_at
                );
                Ok(Some(cached.records))
            }
            Err(e) => {
                warn!("Ignoring unreadable evidence checkpoint {}: {e}", self.path.display());
                Ok(None)
            }
        }
    }

    /// Writes through a temporary file so a crash never leaves a torn cache.
    pub async fn save(&self, records: &[EvidenceRecord]) -> std::io::Result<()> {
        let cached = CachedEvidence {
            records: records.to_vec(),
            recorded_at: chrono::Utc::now(),
        };
        let body = serde_json::to_vec(&cached)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = self.path.with_extension("json.partial");
        tokio::fs::write(&partial, body).await?;
        tokio::fs::rename(&partial, &self.path).await
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
    use crate::models::applicant::ApplicantKey;

    fn record(key: &str, pages: &[&str]) -> EvidenceRecord {
        let mut record = EvidenceRecord::new(ApplicantKey::normalize(key).unwrap());
        record.analyses = pages.iter().map(|p| p.to_string()).collect();
        record
    }

    #[tokio::test]
    async fn test_saved_evidence_is_reloaded_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EvidenceCache::in_dir(dir.path());
        let records = vec![record("2", &["b1", "b2"]), record("1", &["a"])];
        cache.save(&records).await.unwrap();

        assert_eq!(cache.load().await.unwrap(), Some(records));
    }

    #[tokio::test]
    async fn test_missing_or_corrupt_cache_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EvidenceCache::in_dir(dir.path());
        assert_eq!(cache.load().await.unwrap(), None);

        std::fs::write(cache.path(), "{\"records\":[").unwrap();
        assert_eq!(cache.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EvidenceCache::in_dir(dir.path());
        cache.save(&[record("1", &["a"])]).await.unwrap();
        cache.clear().await.unwrap();
        assert!(!cache.path().exists());
        cache.clear().await.unwrap();
    }
}
