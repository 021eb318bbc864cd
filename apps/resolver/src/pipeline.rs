//! One batch, end to end:
//! roster → evidence → merge → decisions → spreadsheet + deck.
//!
//! The roster is read and validated before any document is sent to the
//! renderer, so a malformed roster fails without spending model calls.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::artifacts::{self, ArtifactError, ArtifactPaths};
use crate::config::FailurePolicy;
use crate::decision::{generate_decisions, Checkpoint, DecisionError, GenerationOptions};
use crate::evidence::extractor::EvidenceError;
use crate::evidence::{extract_evidence, EvidenceCache, PageRasterizer, StagedDocuments};
use crate::llm_client::{DecisionOracle, DocumentRenderer};
use crate::models::decision::Proposal;
use crate::roster::{merge_evidence, read_roster, RosterError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Evidence(#[from] EvidenceError),

    #[error(transparent)]
    Decision(#[from] DecisionError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("background task failed: {0}")]
    Task(String),
}

/// The model-backed collaborators a batch needs.
#[derive(Clone)]
pub struct Services {
    pub rasterizer: Arc<dyn PageRasterizer>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub oracle: Arc<dyn DecisionOracle>,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub policy: FailurePolicy,
    pub concurrency: usize,
    /// Discard any decision or evidence checkpoint left in the output
    /// directory before starting.
    pub fresh: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub rows: usize,
    pub evidence_folders: usize,
    pub rows_with_evidence: usize,
    pub failed_pages: usize,
    pub approved: usize,
    pub rejected: usize,
    pub unparseable: usize,
    pub artifacts: ArtifactPaths,
    pub elapsed_ms: u128,
}

pub async fn run_batch(
    roster_path: &Path,
    documents: Option<StagedDocuments>,
    output_dir: &Path,
    services: &Services,
    options: &BatchOptions,
) -> Result<BatchSummary, PipelineError> {
    let started = Instant::now();

    let path = roster_path.to_path_buf();
    let roster = blocking(move || read_roster(&path)).await??;
    let headers = roster.headers.clone();
    if roster.is_empty() {
        warn!("Roster {} has no applicant rows", roster_path.display());
    }

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(ArtifactError::from)?;
    let checkpoint = Checkpoint::in_dir(output_dir);
    let evidence_cache = EvidenceCache::in_dir(output_dir);
    if options.fresh {
        checkpoint.clear().await.map_err(DecisionError::from)?;
        evidence_cache.clear().await.map_err(EvidenceError::from)?;
    }

    let evidence = match &documents {
        Some(staged) => match evidence_cache.load().await.map_err(EvidenceError::from)? {
            Some(records) => records,
            None => {
                let records = extract_evidence(
                    staged.root(),
                    Arc::clone(&services.rasterizer),
                    services.renderer.as_ref(),
                )
                .await?;
                evidence_cache.save(&records).await.map_err(EvidenceError::from)?;
                records
            }
        },
        None => {
            info!("No documents supplied; every row gets empty evidence");
            Vec::new()
        }
    };
    // Scratch directory is no longer needed once pages are analyzed.
    drop(documents);

    let evidence_folders = evidence.len();
    let failed_pages: usize = evidence.iter().map(|r| r.failed_pages()).sum();
    let enriched = merge_evidence(roster, evidence);
    let rows_with_evidence = enriched.iter().filter(|r| !r.evidence.is_empty()).count();

    info!("Recording decisions to {}", checkpoint.path().display());
    let generation = GenerationOptions {
        policy: options.policy,
        concurrency: options.concurrency,
        checkpoint: Some(checkpoint.clone()),
    };
    let decisions = generate_decisions(&enriched, Arc::clone(&services.oracle), &generation).await?;

    let final_rows = artifacts::assemble(enriched, decisions)?;
    let count = |p: Proposal| final_rows.iter().filter(|r| r.decision.proposal == p).count();
    let (approved, rejected, unparseable) = (
        count(Proposal::Approved),
        count(Proposal::Rejected),
        count(Proposal::Unparseable),
    );
    let rows = final_rows.len();

    let dir: PathBuf = output_dir.to_path_buf();
    let artifacts = blocking(move || artifacts::write_artifacts(&dir, &headers, &final_rows)).await??;
    checkpoint.clear().await.map_err(DecisionError::from)?;
    evidence_cache.clear().await.map_err(EvidenceError::from)?;

    let summary = BatchSummary {
        rows,
        evidence_folders,
        rows_with_evidence,
        failed_pages,
        approved,
        rejected,
        unparseable,
        artifacts,
        elapsed_ms: started.elapsed().as_millis(),
    };
    info!(
        "Batch complete: {} rows ({} approved, {} rejected, {} unparseable) in {}ms",
        summary.rows, summary.approved, summary.rejected, summary.unparseable, summary.elapsed_ms
    );
    Ok(summary)
}

async fn blocking<T, F>(f: F) -> Result<T, PipelineError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rust_xlsxwriter::Workbook;

    use super::*;
    use crate::decision::checkpoint::CHECKPOINT_FILE;
    use crate::evidence::cache::EVIDENCE_CACHE_FILE;
    use crate::decision::generator::tests::RubricOracle;
    use crate::evidence::rasterizer::{DocumentPages, PageImage, RasterError};
    use crate::evidence::stage_documents;
    use crate::llm_client::LlmError;
    use crate::roster::columns;

    /// One page per line of the file; the page bytes are the line itself.
    pub(crate) struct LinePages;

    impl PageRasterizer for LinePages {
        fn rasterize_document(&self, path: &Path) -> Result<DocumentPages, RasterError> {
            let body = fs::read_to_string(path).unwrap_or_default();
            Ok(body
                .lines()
                .enumerate()
                .map(|(index, line)| {
                    Ok(PageImage {
                        index,
                        width: 1,
                        height: 1,
                        png: line.as_bytes().to_vec(),
                    })
                })
                .collect())
        }
    }

    /// Describes a page by echoing its bytes.
    pub(crate) struct EchoPages;

    #[async_trait]
    impl DocumentRenderer for EchoPages {
        async fn describe_page(&self, page: &PageImage) -> Result<String, LlmError> {
            Ok(String::from_utf8_lossy(&page.png).into_owned())
        }
    }

    pub(crate) fn services() -> Services {
        Services {
            rasterizer: Arc::new(LinePages),
            renderer: Arc::new(EchoPages),
            oracle: Arc::new(RubricOracle),
        }
    }

    /// Writes a small roster workbook: (name, key, PPE, debt) per row.
    pub(crate) fn write_roster(path: &Path, rows: &[(&str, &str, f64, f64)]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let headers = [
            columns::NAME,
            columns::KEY,
            columns::SCORE,
            columns::OVERDUE_DEBT,
            columns::PRIOR_BENEFIT,
            columns::MOTIVE,
        ];
        for (c, h) in headers.iter().enumerate() {
            sheet.write_string(0, c as u16, *h).unwrap();
        }
        for (i, (name, key, score, debt)) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            sheet.write_string(r, 0, *name).unwrap();
            sheet.write_string(r, 1, *key).unwrap();
            sheet.write_number(r, 2, *score).unwrap();
            sheet.write_number(r, 3, *debt).unwrap();
            sheet.write_string(r, 4, "No").unwrap();
            sheet.write_string(r, 5, "Cesantía").unwrap();
        }
        workbook.save(path).unwrap();
    }

    fn options() -> BatchOptions {
        BatchOptions {
            policy: FailurePolicy::FailFast,
            concurrency: 1,
            fresh: false,
        }
    }

    #[tokio::test]
    async fn test_batch_end_to_end_with_documents() {
        let dir = tempfile::tempdir().unwrap();
        let roster = dir.path().join("roster.xlsx");
        write_roster(
            &roster,
            &[
                ("Ana", "11111111", 0.8, 150000.0),
                ("Luis", "22222222", 0.3, 150000.0),
                ("Eva", "33333333", 0.9, 90000.0),
            ],
        );
        let docs = dir.path().join("docs");
        fs::create_dir_all(docs.join("11111111")).unwrap();
        fs::create_dir_all(docs.join("99999999")).unwrap();
        fs::write(
            docs.join("11111111/ficha.pdf"),
            "Cartola Hogar\nvalidado por Trabajadora Social",
        )
        .unwrap();
        fs::write(docs.join("99999999/otro.pdf"), "huérfano").unwrap();

        let out = dir.path().join("out");
        let summary = run_batch(
            &roster,
            Some(stage_documents(&docs).unwrap()),
            &out,
            &services(),
            &options(),
        )
        .await
        .unwrap();

        assert_eq!(summary.rows, 3);
        assert_eq!(summary.evidence_folders, 2);
        assert_eq!(summary.rows_with_evidence, 1);
        assert_eq!(summary.approved, 1);
        assert_eq!(summary.rejected, 2);
        assert!(summary.artifacts.spreadsheet.exists());
        assert!(summary.artifacts.deck.exists());
        assert!(!out.join(CHECKPOINT_FILE).exists());
    }

    #[tokio::test]
    async fn test_batch_without_documents_still_decides_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let roster = dir.path().join("roster.xlsx");
        write_roster(&roster, &[("Ana", "1", 0.8, 1.0), ("Luis", "2", 0.2, 1.0)]);

        let summary = run_batch(&roster, None, dir.path(), &services(), &options())
            .await
            .unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.rows_with_evidence, 0);
        assert_eq!(summary.approved + summary.rejected + summary.unparseable, 2);
    }

    /// Counts page descriptions, echoing like [`EchoPages`].
    struct CountingPages(AtomicUsize);

    #[async_trait]
    impl DocumentRenderer for CountingPages {
        async fn describe_page(&self, page: &PageImage) -> Result<String, LlmError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            EchoPages.describe_page(page).await
        }
    }

    struct DownOracle;

    #[async_trait]
    impl DecisionOracle for DownOracle {
        async fn decide(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::EmptyContent)
        }
    }

    #[tokio::test]
    async fn test_rerun_after_failure_reuses_page_analyses() {
        let dir = tempfile::tempdir().unwrap();
        let roster = dir.path().join("roster.xlsx");
        write_roster(&roster, &[("Ana", "11111111", 0.8, 150000.0)]);
        let docs = dir.path().join("docs");
        fs::create_dir_all(docs.join("11111111")).unwrap();
        fs::write(
            docs.join("11111111/ficha.pdf"),
            "Cartola Hogar\nvalidado por Trabajadora Social",
        )
        .unwrap();
        let out = dir.path().join("out");

        let first_pages = Arc::new(CountingPages(AtomicUsize::new(0)));
        let failing = Services {
            renderer: first_pages.clone(),
            oracle: Arc::new(DownOracle),
            ..services()
        };
        let staged = stage_documents(&docs).unwrap();
        assert!(run_batch(&roster, Some(staged), &out, &failing, &options())
            .await
            .is_err());
        assert_eq!(first_pages.0.load(Ordering::SeqCst), 2);
        assert!(out.join(EVIDENCE_CACHE_FILE).exists());

        let second_pages = Arc::new(CountingPages(AtomicUsize::new(0)));
        let healthy = Services {
            renderer: second_pages.clone(),
            ..services()
        };
        let staged = stage_documents(&docs).unwrap();
        let summary = run_batch(&roster, Some(staged), &out, &healthy, &options())
            .await
            .unwrap();
        assert_eq!(second_pages.0.load(Ordering::SeqCst), 0);
        assert_eq!(summary.rows_with_evidence, 1);
        assert_eq!(summary.approved, 1);
        assert!(!out.join(EVIDENCE_CACHE_FILE).exists());
    }

    #[tokio::test]
    async fn test_fresh_run_analyzes_pages_again() {
        let dir = tempfile::tempdir().unwrap();
        let roster = dir.path().join("roster.xlsx");
        write_roster(&roster, &[("Ana", "11111111", 0.8, 150000.0)]);
        let docs = dir.path().join("docs");
        fs::create_dir_all(docs.join("11111111")).unwrap();
        fs::write(docs.join("11111111/ficha.pdf"), "una página").unwrap();
        let out = dir.path().join("out");
        let mut stale = crate::models::evidence::EvidenceRecord::new(
            crate::models::applicant::ApplicantKey::normalize("11111111").unwrap(),
        );
        stale.analyses.push("análisis anterior".to_string());
        EvidenceCache::in_dir(&out).save(&[stale]).await.unwrap();

        let pages = Arc::new(CountingPages(AtomicUsize::new(0)));
        let counted = Services {
            renderer: pages.clone(),
            ..services()
        };
        let fresh = BatchOptions {
            fresh: true,
            ..options()
        };
        let summary = run_batch(&roster, Some(stage_documents(&docs).unwrap()), &out, &counted, &fresh)
            .await
            .unwrap();
        assert_eq!(pages.0.load(Ordering::SeqCst), 1);
        assert_eq!(summary.rows_with_evidence, 1);
    }

    #[tokio::test]
    async fn test_invalid_roster_fails_before_documents() {
        let dir = tempfile::tempdir().unwrap();
        let roster = dir.path().join("roster.xlsx");
        let mut workbook = Workbook::new();
        workbook.add_worksheet().write_string(0, 0, "Otra columna").unwrap();
        workbook.save(&roster).unwrap();

        let err = run_batch(&roster, None, dir.path(), &services(), &options())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Roster(RosterError::MissingColumns(_))));
    }
}
