//! Evidence Extractor: walks an applicant document tree, sends every PDF page
//! through the document renderer, and aggregates the analyses per folder.
//!
//! Per-page failures never fail the batch: a page that cannot be rasterized
//! or described is recorded as [`ANALYSIS_FAILED`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::evidence::rasterizer::{DocumentPages, PageRasterizer, RasterError};
use crate::llm_client::DocumentRenderer;
use crate::models::applicant::ApplicantKey;
use crate::models::evidence::{EvidenceRecord, ANALYSIS_FAILED};

#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("failed to read directory {path}: {source}")]
    Walk {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("rasterizer task for {path} panicked: {message}")]
    Task { path: PathBuf, message: String },

    #[error("evidence checkpoint error: {0}")]
    Cache(#[from] std::io::Error),
}

/// Collects every `.pdf` file under `root`, in the order the filesystem yields them.
/// Symbolic links are skipped, so a link cycle cannot revisit a folder.
pub fn find_pdfs(root: &Path) -> Result<Vec<PathBuf>, EvidenceError> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|source| EvidenceError::Walk {
            path: dir.clone(),
            source,
        })?;
        let mut subdirs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| EvidenceError::Walk {
                path: dir.clone(),
                source,
            })?;
            let file_type = entry.file_type().map_err(|source| EvidenceError::Walk {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if file_type.is_symlink() {
                debug!("Skipping symbolic link {}", path.display());
            } else if file_type.is_dir() {
                subdirs.push(path);
            } else if is_pdf(&path) {
                found.push(path);
            }
        }
        // Reverse so the stack pops subdirectories in yield order.
        pending.extend(subdirs.into_iter().rev());
    }

    Ok(found)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// The applicant key for a PDF: the name of its immediate parent folder.
fn folder_key(pdf: &Path) -> Option<ApplicantKey> {
    pdf.parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .and_then(ApplicantKey::normalize)
}

/// Runs the renderer over every page of every PDF under `root`.
///
/// Returns one record per distinct folder key, in first-encountered order.
/// Sequential: one PDF at a time, one page at a time.
pub async fn extract_evidence(
    root: &Path,
    rasterizer: Arc<dyn PageRasterizer>,
    renderer: &dyn DocumentRenderer,
) -> Result<Vec<EvidenceRecord>, EvidenceError> {
    let pdfs = find_pdfs(root)?;
    info!("Found {} PDF files under {}", pdfs.len(), root.display());

    let mut records: Vec<EvidenceRecord> = Vec::new();
    let mut index_by_key: HashMap<ApplicantKey, usize> = HashMap::new();

    for pdf in pdfs {
        let Some(key) = folder_key(&pdf) else {
            warn!("Skipping {}: parent folder name is not a usable key", pdf.display());
            continue;
        };

        let analyses = analyze_pdf(&pdf, Arc::clone(&rasterizer), renderer).await?;

        let slot = *index_by_key.entry(key.clone()).or_insert_with(|| {
            records.push(EvidenceRecord::new(key));
            records.len() - 1
        });
        records[slot].analyses.extend(analyses);
    }

    for record in &records {
        let failed = record.failed_pages();
        if failed > 0 {
            warn!(
                "Applicant {}: {} of {} page analyses failed",
                record.key,
                failed,
                record.analyses.len()
            );
        }
    }
    info!("Aggregated evidence for {} applicant folders", records.len());

    Ok(records)
}

async fn analyze_pdf(
    pdf: &Path,
    rasterizer: Arc<dyn PageRasterizer>,
    renderer: &dyn DocumentRenderer,
) -> Result<Vec<String>, EvidenceError> {
    let pages = match rasterize_blocking(pdf, rasterizer).await? {
        Ok(pages) => pages,
        Err(e) => {
            warn!("Could not open {}: {e}", pdf.display());
            return Ok(vec![ANALYSIS_FAILED.to_string()]);
        }
    };

    let mut analyses = Vec::with_capacity(pages.len());
    for page in pages {
        let analysis = match page {
            Ok(image) => {
                debug!(
                    "Describing page {} of {} ({}x{})",
                    image.index + 1,
                    pdf.display(),
                    image.width,
                    image.height
                );
                match renderer.describe_page(&image).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(
                            "Page {} of {} analysis failed: {e}",
                            image.index + 1,
                            pdf.display()
                        );
                        ANALYSIS_FAILED.to_string()
                    }
                }
            }
            Err(e) => {
                warn!("Rasterizing a page of {} failed: {e}", pdf.display());
                ANALYSIS_FAILED.to_string()
            }
        };
        analyses.push(analysis);
    }
    Ok(analyses)
}

async fn rasterize_blocking(
    pdf: &Path,
    rasterizer: Arc<dyn PageRasterizer>,
) -> Result<Result<DocumentPages, RasterError>, EvidenceError> {
    let path = pdf.to_path_buf();
    tokio::task::spawn_blocking(move || rasterizer.rasterize_document(&path))
        .await
        .map_err(|e| EvidenceError::Task {
            path: pdf.to_path_buf(),
            message: e.to_string(),
        })
}
