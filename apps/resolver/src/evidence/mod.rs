// Document evidence: archive intake, page rasterization, per-page analysis.
// Rasterization is blocking and always runs inside tokio::task::spawn_blocking.

pub mod archive;
pub mod cache;
pub mod extractor;
pub mod rasterizer;

pub use archive::{stage_archive_bytes, stage_documents, StagedDocuments};
pub use cache::EvidenceCache;
pub use extractor::extract_evidence;
pub use rasterizer::{PageRasterizer, PdfiumRasterizer};
