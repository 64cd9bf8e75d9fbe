//! PDF output through ImageMagick.

use super::JobStrategy;
use crate::error::Result;
use crate::job::{labels, JobContext};
use crate::preset::OutputType;
use crate::tools::{Tool, ToolInvocation};
use std::path::PathBuf;

/// Wraps an image (or anything ImageMagick reads) into a PDF.
#[derive(Debug, Clone, Default)]
pub struct PdfJob;

impl PdfJob {
    pub fn new() -> Self {
        Self
    }
}

impl JobStrategy for PdfJob {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn supports_output(&self, output: OutputType) -> bool {
        output == OutputType::Pdf
    }

    fn convert(&mut self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>> {
        ctx.set_user_state(labels::CONVERTING);
        let output = ctx.output_path()?;

        let invocation = ToolInvocation::new(Tool::ImageMagick, ctx.input_path())
            .arg(ctx.input_path())
            .arg(&output);
        ctx.run_tool(&invocation)?;
        Ok(vec![output])
    }

    fn is_cancelable(&self) -> bool {
        true
    }
}
