use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::artifacts::ArtifactError;
use crate::decision::DecisionError;
use crate::evidence::archive::ArchiveError;
use crate::evidence::extractor::EvidenceError;
use crate::pipeline::PipelineError;
use crate::roster::RosterError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    #[error("Document archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Evidence error: {0}")]
    Evidence(#[from] EvidenceError),

    #[error("Decision error: {0}")]
    Decision(#[from] DecisionError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Roster(e) => AppError::Roster(e),
            PipelineError::Evidence(e) => AppError::Evidence(e),
            PipelineError::Decision(e) => AppError::Decision(e),
            PipelineError::Artifact(e) => AppError::Artifact(e),
            PipelineError::Task(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Roster(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "ROSTER_ERROR",
                e.to_string(),
            ),
            AppError::Archive(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "ARCHIVE_ERROR",
                e.to_string(),
            ),
            AppError::Decision(DecisionError::Oracle { .. }) => {
                tracing::error!("Decision oracle error: {self}");
                (StatusCode::BAD_GATEWAY, "LLM_ERROR", self.to_string())
            }
            AppError::Evidence(e) => {
                tracing::error!("Evidence error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EVIDENCE_ERROR",
                    "Document analysis failed".to_string(),
                )
            }
            AppError::Decision(e) => {
                tracing::error!("Decision error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DECISION_ERROR",
                    "Decision generation failed".to_string(),
                )
            }
            AppError::Artifact(e) => {
                tracing::error!("Artifact error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ARTIFACT_ERROR",
                    "Writing the output artifacts failed".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
