//! First-page rasterisation via pdfium.
//!
//! pdfium keeps thread-local state and is CPU-bound, so callers run
//! [`Rasterizer::first_page`] inside `tokio::task::spawn_blocking`.
//!
//! The output is capped on its longest edge by `max_pixels` after scaling:
//! a poster-sized first page must not allocate an unbounded bitmap.

use crate::error::HistoryError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// Renders page 1 of an in-memory PDF.
///
/// Implementations are blocking. The default is [`PdfiumRasterizer`]; tests
/// substitute their own.
pub trait Rasterizer: Send + Sync {
    fn first_page(
        &self,
        pdf: &[u8],
        scale: f32,
        max_pixels: u32,
    ) -> Result<DynamicImage, HistoryError>;
}

/// [`Rasterizer`] backed by a dynamically bound pdfium library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// `library` overrides `PDFIUM_LIB_PATH` and the system library.
    pub fn new(library: Option<PathBuf>) -> Self {
        Self { library }
    }

    fn bind(&self) -> Result<Pdfium, HistoryError> {
        let explicit = self.library.clone().or_else(|| {
            std::env::var("PDFIUM_LIB_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
        });

        let bindings = match explicit {
            Some(path) => {
                debug!("Binding pdfium from {}", path.display());
                Pdfium::bind_to_library(path.as_path()).map_err(|e| {
                    HistoryError::PdfiumBindingFailed(format!("{}: {e}", path.display()))
                })?
            }
            None => Pdfium::bind_to_system_library()
                .map_err(|e| HistoryError::PdfiumBindingFailed(e.to_string()))?,
        };
        Ok(Pdfium::new(bindings))
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn first_page(
        &self,
        pdf: &[u8],
        scale: f32,
        max_pixels: u32,
    ) -> Result<DynamicImage, HistoryError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| HistoryError::RenderFailed(format!("{:?}", e)))?;

        let page = document
            .pages()
            .get(0)
            .map_err(|e| HistoryError::RenderFailed(format!("page 1: {:?}", e)))?;

        let edge = i32::try_from(max_pixels).unwrap_or(i32::MAX);
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(scale)
            .set_maximum_width(edge)
            .set_maximum_height(edge);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| HistoryError::RenderFailed(format!("page 1: {:?}", e)))?;

        let image = bitmap.as_image();
        debug!("Rendered page 1 → {}x{} px", image.width(), image.height());
        Ok(image)
    }
}
