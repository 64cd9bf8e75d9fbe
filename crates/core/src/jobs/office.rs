//! Office documents, spreadsheets and slideshows through LibreOffice.
//!
//! Every office input is first exported to PDF by a headless LibreOffice with
//! its own user profile, so several jobs can run side by side. PDF presets
//! get that file; image presets get one image per page, rendered by pdfium.

use super::raster::{apply_pipeline, encode_options, supports_raster_output};
use super::JobStrategy;
use crate::error::{ConversionError, Result};
use crate::job::{labels, JobContext};
use crate::pdf_renderer::PdfRenderer;
use crate::preset::OutputType;
use crate::render::write_image;
use crate::tools::{find_output, Tool, ToolInvocation};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The LibreOffice application an input opens in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfficeKind {
    Document,
    Spreadsheet,
    Slideshow,
}

impl OfficeKind {
    /// LibreOffice PDF export filter for this kind.
    pub fn pdf_filter(self) -> &'static str {
        match self {
            OfficeKind::Document => "pdf:writer_pdf_Export",
            OfficeKind::Spreadsheet => "pdf:calc_pdf_Export",
            OfficeKind::Slideshow => "pdf:impress_pdf_Export",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OfficeJob {
    kind: OfficeKind,
    page_count: Option<usize>,
}

impl OfficeJob {
    pub fn new(kind: OfficeKind) -> Self {
        Self {
            kind,
            page_count: None,
        }
    }

    pub fn kind(&self) -> OfficeKind {
        self.kind
    }

    /// LibreOffice arguments exporting `input` to PDF inside `outdir`.
    pub fn export_invocation(&self, input: &Path, profile: &Path, outdir: &Path) -> ToolInvocation {
        ToolInvocation::new(Tool::LibreOffice, input)
            .args([
                "--headless",
                "--invisible",
                "--nologo",
                "--nofirststartwizard",
                "--norestore",
            ])
            .arg(format!("-env:UserInstallation=file://{}", profile.display()))
            .args(["--convert-to", self.kind.pdf_filter(), "--outdir"])
            .arg(outdir)
            .arg(input)
            .interruptible(false)
    }

    fn export_pdf(&self, ctx: &JobContext<'_>, scratch: &Path) -> Result<PathBuf> {
        let input = ctx.input_path();
        let profile = scratch.join("profile");
        let outdir = scratch.join("out");
        std::fs::create_dir_all(&outdir).map_err(|e| ConversionError::OutputDirError {
            path: outdir.clone(),
            message: e.to_string(),
        })?;

        ctx.run_tool(&self.export_invocation(input, &profile, &outdir))?;

        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        find_output(&outdir, &outdir.join(format!("{}.pdf", stem)), "pdf").ok_or_else(|| {
            ConversionError::EngineFailed {
                tool: Tool::LibreOffice.display_name(),
                message: format!("no PDF was produced for {:?}", input),
            }
        })
    }
}

impl JobStrategy for OfficeJob {
    fn name(&self) -> &'static str {
        match self.kind {
            OfficeKind::Document => "office document",
            OfficeKind::Spreadsheet => "spreadsheet",
            OfficeKind::Slideshow => "slideshow",
        }
    }

    fn supports_output(&self, output: OutputType) -> bool {
        output == OutputType::Pdf || supports_raster_output(output)
    }

    fn convert(&mut self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>> {
        ctx.set_user_state(labels::CONVERTING);
        let scratch = ctx.scratch_dir()?;
        let pdf = self.export_pdf(ctx, scratch.path())?;
        debug!("LibreOffice exported {:?}", pdf);

        let output_type = ctx.preset().output_type;
        if output_type == OutputType::Pdf {
            let output = ctx.output_path()?;
            std::fs::copy(&pdf, &output).map_err(|e| ConversionError::EncodeFailure {
                path: output.clone(),
                message: e.to_string(),
            })?;
            return Ok(vec![output]);
        }

        ctx.set_user_state(labels::RENDERING);
        let renderer = PdfRenderer::new(ctx.render_config().clone())?;
        let pages = renderer.render_pages(&pdf, |done, total| {
            debug!("Rendered page {}/{}", done, total);
        })?;
        self.page_count = Some(pages.len());

        ctx.set_user_state(labels::ENCODING);
        let options = encode_options(ctx)?;
        let max_edge = ctx.render_config().max_pixel_edge;
        let mut outputs = Vec::with_capacity(pages.len());
        for page in pages {
            let path = ctx.page_output_path(page.page_number)?;
            let image = apply_pipeline(page.image, &ctx.settings(), max_edge, &path)?;
            write_image(&image, output_type, &path, &options)?;
            outputs.push(path);
        }
        Ok(outputs)
    }

    fn is_cancelable(&self) -> bool {
        false
    }

    fn output_files_count(&self) -> usize {
        self.page_count.unwrap_or(1)
    }
}
