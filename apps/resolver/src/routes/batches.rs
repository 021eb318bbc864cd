use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::evidence::stage_archive_bytes;
use crate::pipeline::{run_batch, BatchOptions, BatchSummary};
use crate::state::AppState;

const ROSTER_PART: &str = "roster";
const DOCUMENTS_PART: &str = "documents";

#[derive(Serialize)]
pub struct BatchResponse {
    pub batch_id: Uuid,
    #[serde(flatten)]
    pub summary: BatchSummary,
}

/// POST /api/v1/batches
/// Multipart: `roster` (xlsx, required), `documents` (zip, optional).
pub async fn handle_create_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>, AppError> {
    let mut roster: Option<Bytes> = None;
    let mut documents: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;
        match name.as_str() {
            ROSTER_PART => roster = Some(data),
            DOCUMENTS_PART => documents = Some(data),
            other => info!("Ignoring unexpected multipart field '{other}'"),
        }
    }

    let roster = roster
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::Validation(format!("multipart field '{ROSTER_PART}' is required")))?;

    let batch_id = Uuid::new_v4();
    info!(
        "Batch {batch_id}: roster {} bytes, documents {} bytes",
        roster.len(),
        documents.as_ref().map_or(0, Bytes::len)
    );

    let scratch = tempfile::Builder::new()
        .prefix("resolver-batch-")
        .tempdir()
        .map_err(anyhow::Error::from)?;
    let roster_path = scratch.path().join("roster.xlsx");
    tokio::fs::write(&roster_path, &roster)
        .await
        .map_err(anyhow::Error::from)?;

    let staged = match documents.filter(|d| !d.is_empty()) {
        Some(archive) => Some(
            tokio::task::spawn_blocking(move || stage_archive_bytes(&archive))
                .await
                .map_err(anyhow::Error::from)??,
        ),
        None => None,
    };

    let output_dir = state.config.output_dir.join(batch_id.to_string());
    let options = BatchOptions {
        policy: state.config.failure_policy,
        concurrency: state.config.decision_concurrency,
        fresh: true,
    };
    let summary = run_batch(&roster_path, staged, &output_dir, &state.services, &options).await?;

    Ok(Json(BatchResponse { batch_id, summary }))
}
