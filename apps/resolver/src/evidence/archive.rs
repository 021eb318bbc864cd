use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::info;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("document source {0} does not exist")]
    Missing(PathBuf),

    #[error("unsupported document source {0}: expected a directory or a .zip archive")]
    Unsupported(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// A directory tree of applicant folders ready to be walked.
///
/// When the source was an archive, the extracted tree lives in a scratch
/// directory that is removed when this value is dropped.
#[derive(Debug)]
pub struct StagedDocuments {
    root: PathBuf,
    _scratch: Option<TempDir>,
}

impl StagedDocuments {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Stages a directory in place or extracts a `.zip` into a scratch directory.
pub fn stage_documents(source: &Path) -> Result<StagedDocuments, ArchiveError> {
    if source.is_dir() {
        return Ok(StagedDocuments {
            root: source.to_path_buf(),
            _scratch: None,
        });
    }
    if !source.exists() {
        return Err(ArchiveError::Missing(source.to_path_buf()));
    }
    let is_zip = source
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
    if !is_zip {
        return Err(ArchiveError::Unsupported(source.to_path_buf()));
    }
    extract_into_scratch(File::open(source)?)
}

/// Extracts an in-memory zip (e.g. an uploaded file) into a scratch directory.
pub fn stage_archive_bytes(bytes: &[u8]) -> Result<StagedDocuments, ArchiveError> {
    extract_into_scratch(Cursor::new(bytes))
}

fn extract_into_scratch<R: Read + Seek>(reader: R) -> Result<StagedDocuments, ArchiveError> {
    let scratch = tempfile::Builder::new().prefix("resolver-docs-").tempdir()?;
    let mut archive = ZipArchive::new(reader)?;
    let entries = archive.len();
    archive.extract(scratch.path())?;
    info!(
        "Extracted {} archive entries into {}",
        entries,
        scratch.path().display()
    );
    Ok(StagedDocuments {
        root: scratch.path().to_path_buf(),
        _scratch: Some(scratch),
    })
}
