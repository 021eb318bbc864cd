// Artifact assembly: decisions attached by key, then the spreadsheet and deck writers.
// Both writers are synchronous; callers run them inside tokio::task::spawn_blocking.

pub mod assemble;
pub mod deck;
pub mod format;
pub mod spreadsheet;

use std::path::{Path, PathBuf};

use serde::Serialize;

pub use assemble::{assemble, ArtifactError, FinalRow};

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactPaths {
    pub spreadsheet: PathBuf,
    pub deck: PathBuf,
}

/// Writes both artifacts into `output_dir`, creating it if needed.
pub fn write_artifacts(
    output_dir: &Path,
    headers: &[String],
    rows: &[FinalRow],
) -> Result<ArtifactPaths, ArtifactError> {
    std::fs::create_dir_all(output_dir)?;
    let paths = ArtifactPaths {
        spreadsheet: output_dir.join(spreadsheet::SPREADSHEET_FILE),
        deck: output_dir.join(deck::DECK_FILE),
    };
    spreadsheet::write_spreadsheet(&paths.spreadsheet, headers, rows)?;
    deck::write_deck(&paths.deck, rows)?;
    Ok(paths)
}
