//! PDF page rasterization using pdfium (Google's PDF engine).
//!
//! Office documents are exported to PDF by LibreOffice and PDF inputs are
//! read directly; both end up here when the preset asks for images.

use crate::config::RenderConfig;
use crate::error::{ConversionError, Result};
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// A single rendered page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Page number (1-indexed).
    pub page_number: usize,

    /// Straight-alpha RGBA pixels.
    pub image: RgbaImage,
}

/// PDF page renderer using pdfium.
pub struct PdfRenderer {
    /// Render configuration.
    config: RenderConfig,
    /// Pdfium library instance.
    pdfium: Pdfium,
}

impl PdfRenderer {
    /// Bind pdfium and create a renderer.
    pub fn new(config: RenderConfig) -> Result<Self> {
        config.validate()?;

        // Try to bind to a library next to the binary first, then well-known
        // locations, then whatever the system loader finds.
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("/usr/lib"))
            })
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                    "/usr/local/lib",
                ))
            })
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| {
                debug!("Failed to load pdfium library: {}", e);
                ConversionError::EngineNotFound("pdfium")
            })?;

        info!("PDF renderer initialized at {} DPI", config.dpi);

        Ok(Self {
            config,
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Get the configured DPI.
    pub fn dpi(&self) -> u32 {
        self.config.dpi
    }

    /// Render every page of a PDF.
    ///
    /// `on_page` is called after each page with (pages done, total pages).
    pub fn render_pages(
        &self,
        pdf_path: &Path,
        mut on_page: impl FnMut(usize, usize),
    ) -> Result<Vec<RenderedPage>> {
        let start = Instant::now();

        let document = self
            .pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| ConversionError::DocumentOpenFailure {
                path: pdf_path.to_path_buf(),
                message: format!("Failed to load PDF: {}", e),
            })?;

        let page_count = document.pages().len() as usize;
        debug!("Rendering {} pages from {:?}", page_count, pdf_path);

        let mut pages = Vec::with_capacity(page_count);
        for page_idx in 0..page_count {
            let page = document.pages().get(page_idx as u16).map_err(|e| {
                ConversionError::DocumentOpenFailure {
                    path: pdf_path.to_path_buf(),
                    message: format!("Failed to get page {}: {}", page_idx + 1, e),
                }
            })?;

            let info = PageInfo {
                page_number: page_idx + 1,
                width_points: page.width().value,
                height_points: page.height().value,
            };
            let render_config = PdfRenderConfig::new()
                .set_target_width(info.width_pixels(self.config.dpi).max(1) as i32)
                .set_target_height(info.height_pixels(self.config.dpi).max(1) as i32)
                .rotate_if_landscape(PdfPageRenderRotation::None, false);

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                ConversionError::DocumentOpenFailure {
                    path: pdf_path.to_path_buf(),
                    message: format!("Failed to render page {}: {}", page_idx + 1, e),
                }
            })?;

            pages.push(RenderedPage {
                page_number: info.page_number,
                image: bitmap.as_image().into_rgba8(),
            });
            on_page(page_idx + 1, page_count);
        }

        debug!("Rendered {} pages in {:?}", page_count, start.elapsed());
        Ok(pages)
    }
}

/// Size of a single PDF page.
#[derive(Debug, Clone)]
pub struct PageInfo {
    /// Page number (1-indexed).
    pub page_number: usize,
    /// Width in PDF points (1/72 inch).
    pub width_points: f32,
    /// Height in PDF points (1/72 inch).
    pub height_points: f32,
}

impl PageInfo {
    /// Get width in pixels at a given DPI.
    pub fn width_pixels(&self, dpi: u32) -> u32 {
        ((self.width_points * dpi as f32) / 72.0) as u32
    }

    /// Get height in pixels at a given DPI.
    pub fn height_pixels(&self, dpi: u32) -> u32 {
        ((self.height_points * dpi as f32) / 72.0) as u32
    }
}
