//! Page Rasterizer: turns PDF pages into PNG bitmaps for the vision model.
//!
//! pdfium is blocking and not async-aware; callers run [`PageRasterizer`]
//! methods inside `tokio::task::spawn_blocking`. The bindings are shared
//! across those threads, which needs pdfium-render's `sync` feature.

use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use pdfium_render::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("page index {index} out of range (document has {page_count} pages)")]
    PageIndex { index: usize, page_count: usize },

    #[error("PDF error: {0}")]
    Pdf(#[from] PdfiumError),

    #[error("image encoding error: {0}")]
    Encode(#[from] image::ImageError),
}

/// A single rendered page, PNG-encoded.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl PageImage {
    /// `data:` URL suitable for an `image_url` content part.
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// Outcome for every page of one document. The outer error means the
/// document itself could not be opened; inner errors are per page.
pub type DocumentPages = Vec<Result<PageImage, RasterError>>;

pub trait PageRasterizer: Send + Sync {
    fn rasterize_document(&self, path: &Path) -> Result<DocumentPages, RasterError>;
}

/// pdfium-backed rasterizer.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
    target_width: u16,
}

impl PdfiumRasterizer {
    /// Binds pdfium from `library_dir` when given, otherwise from the system library.
    pub fn new(library_dir: Option<&Path>, target_width: u16) -> Result<Self, RasterError> {
        let bindings = match library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
                .or_else(|_| Pdfium::bind_to_system_library())?,
            None => Pdfium::bind_to_system_library()?,
        };
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            target_width,
        })
    }

    /// Renders page `index` of an already-open document.
    pub fn render_page(&self, document: &PdfDocument, index: usize) -> Result<PageImage, RasterError> {
        let page_count = document.pages().len() as usize;
        let page_index = checked_page_index(index, page_count)?;

        let config = PdfRenderConfig::new()
            .set_target_width(self.target_width as i32)
            .set_maximum_height(self.target_width as i32 * 2);

        let page = document.pages().get(page_index)?;
        let image = page.render_with_config(&config)?.as_image();

        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        Ok(PageImage {
            index,
            width: image.width(),
            height: image.height(),
            png,
        })
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize_document(&self, path: &Path) -> Result<DocumentPages, RasterError> {
        let document = self.pdfium.load_pdf_from_file(path, None)?;
        let page_count = document.pages().len() as usize;
        Ok((0..page_count)
            .map(|index| self.render_page(&document, index))
            .collect())
    }
}

/// Validates a zero-based page index against the document's page count.
fn checked_page_index(index: usize, page_count: usize) -> Result<PdfPageIndex, RasterError> {
    if index >= page_count {
        return Err(RasterError::PageIndex { index, page_count });
    }
    PdfPageIndex::try_from(index).map_err(|_| RasterError::PageIndex { index, page_count })
}
