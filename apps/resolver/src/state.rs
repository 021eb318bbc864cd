use crate::config::Config;
use crate::pipeline::Services;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Rasterizer, page renderer and decision oracle shared by every batch.
    pub services: Services,
}
