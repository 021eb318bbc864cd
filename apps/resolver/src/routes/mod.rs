pub mod batches;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Uploaded document archives can be large scans.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/batches",
            post(batches::handle_create_batch).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use rust_xlsxwriter::Workbook;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{Config, FailurePolicy};
    use crate::pipeline::tests::services;
    use crate::roster::columns;

    const BOUNDARY: &str = "resolver-test-boundary";

    fn state(output_dir: &std::path::Path) -> AppState {
        AppState {
            config: Config {
                openai_api_key: "test".to_string(),
                openai_base_url: "http://localhost".to_string(),
                decision_model: "m".to_string(),
                vision_model: "m".to_string(),
                failure_policy: FailurePolicy::FailFast,
                decision_concurrency: 2,
                pdfium_library_path: None,
                render_target_width: 800,
                output_dir: output_dir.to_path_buf(),
                port: 0,
                rust_log: "info".to_string(),
            },
            services: services(),
        }
    }

    fn multipart(parts: &[(&str, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, data) in parts {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{name}.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/v1/batches")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn roster_bytes() -> Vec<u8> {
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
        sheet.write_string(1, 0, "Ana").unwrap();
        sheet.write_string(1, 1, "11111111").unwrap();
        sheet.write_number(1, 2, 0.3).unwrap();
        sheet.write_number(1, 3, 1000.0).unwrap();
        sheet.write_string(2, 0, "Luis").unwrap();
        sheet.write_string(2, 1, "22222222").unwrap();
        sheet.write_number(2, 2, 0.9).unwrap();
        sheet.write_number(2, 3, 0.0).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_service() {
        let dir = tempfile::tempdir().unwrap();
        let response = build_router(state(dir.path()))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["service"], "resolver");
    }

    #[tokio::test]
    async fn test_batch_without_roster_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let response = build_router(state(dir.path()))
            .oneshot(multipart(&[("documents", &b"not a zip"[..])]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_batch_with_roster_returns_summary() {
        let dir = tempfile::tempdir().unwrap();
        let roster = roster_bytes();
        let response = build_router(state(dir.path()))
            .oneshot(multipart(&[("roster", roster.as_slice())]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["rows"], 2);
        assert_eq!(body["rejected"], 2);
        let batch_id = body["batch_id"].as_str().unwrap();
        assert!(dir
            .path()
            .join(batch_id)
            .join("propuestas_resolucion.xlsx")
            .exists());
    }

    #[tokio::test]
    async fn test_malformed_roster_is_unprocessable() {
        let dir = tempfile::tempdir().unwrap();
        let response = build_router(state(dir.path()))
            .oneshot(multipart(&[("roster", &b"definitely not a workbook"[..])]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
