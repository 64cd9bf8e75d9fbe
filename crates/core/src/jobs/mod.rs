//! Conversion strategies.
//!
//! Each strategy knows which outputs it can produce, whether it can be
//! interrupted, and how to turn one input file into output files. The
//! [`Strategy`] enum is the closed set the dispatcher chooses from.

mod cda;
mod gif;
mod ico;
mod media;
mod office;
mod pdf;
mod raster;
mod svg;

pub use cda::{parse_track_number, CdaJob};
pub use gif::GifJob;
pub use ico::{IcoJob, MAX_ICON_EDGE};
pub use media::{ffmpeg_codec_args, MediaJob};
pub use office::{OfficeJob, OfficeKind};
pub use pdf::PdfJob;
pub use raster::{apply_pipeline, supports_raster_output, RasterJob};
pub use svg::SvgJob;

use crate::category::{category_of, extension_of, InputCategory};
use crate::error::{ConversionError, Result};
use crate::job::JobContext;
use crate::preset::OutputType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which strategy a job uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    CdaExtract,
    OfficeDocument,
    Spreadsheet,
    Slideshow,
    IcoEncode,
    GifEncode,
    RasterToPdf,
    VectorRasterize,
    GenericRaster,
    GenericMedia,
}

/// Operations every strategy provides to the job lifecycle.
pub trait JobStrategy {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Whether this strategy can produce `output`.
    fn supports_output(&self, output: OutputType) -> bool;

    /// Validate the job before any work is done.
    fn initialize(&mut self, ctx: &mut JobContext<'_>) -> Result<()> {
        ensure_output_supported(self.name(), self.supports_output(ctx.preset().output_type), ctx)
    }

    /// Produce the output files.
    fn convert(&mut self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>>;

    fn is_cancelable(&self) -> bool;

    fn output_files_count(&self) -> usize {
        1
    }
}

pub(crate) fn ensure_output_supported(
    strategy: &'static str,
    supported: bool,
    ctx: &JobContext<'_>,
) -> Result<()> {
    if supported {
        Ok(())
    } else {
        Err(ConversionError::UnsupportedOutputFormat {
            output: ctx.preset().output_type,
            strategy,
        })
    }
}

/// A concrete strategy.
#[derive(Debug, Clone)]
pub enum Strategy {
    CdaExtract(CdaJob),
    Office(OfficeJob),
    Ico(IcoJob),
    Gif(GifJob),
    RasterToPdf(PdfJob),
    VectorRasterize(SvgJob),
    GenericRaster(RasterJob),
    GenericMedia(MediaJob),
}

impl Strategy {
    /// Build the strategy of `kind` for `input`.
    pub fn new(kind: StrategyKind, input: &Path) -> Self {
        match kind {
            StrategyKind::CdaExtract => Strategy::CdaExtract(CdaJob::new()),
            StrategyKind::OfficeDocument => Strategy::Office(OfficeJob::new(OfficeKind::Document)),
            StrategyKind::Spreadsheet => Strategy::Office(OfficeJob::new(OfficeKind::Spreadsheet)),
            StrategyKind::Slideshow => Strategy::Office(OfficeJob::new(OfficeKind::Slideshow)),
            StrategyKind::IcoEncode => Strategy::Ico(IcoJob::new()),
            StrategyKind::GifEncode => {
                let video = category_of(&extension_of(input)) == InputCategory::Video;
                Strategy::Gif(GifJob::new(video))
            }
            StrategyKind::RasterToPdf => Strategy::RasterToPdf(PdfJob::new()),
            StrategyKind::VectorRasterize => Strategy::VectorRasterize(SvgJob::new()),
            StrategyKind::GenericRaster => Strategy::GenericRaster(RasterJob::new()),
            StrategyKind::GenericMedia => Strategy::GenericMedia(MediaJob::new()),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::CdaExtract(_) => StrategyKind::CdaExtract,
            Strategy::Office(job) => match job.kind() {
                OfficeKind::Document => StrategyKind::OfficeDocument,
                OfficeKind::Spreadsheet => StrategyKind::Spreadsheet,
                OfficeKind::Slideshow => StrategyKind::Slideshow,
            },
            Strategy::Ico(_) => StrategyKind::IcoEncode,
            Strategy::Gif(_) => StrategyKind::GifEncode,
            Strategy::RasterToPdf(_) => StrategyKind::RasterToPdf,
            Strategy::VectorRasterize(_) => StrategyKind::VectorRasterize,
            Strategy::GenericRaster(_) => StrategyKind::GenericRaster,
            Strategy::GenericMedia(_) => StrategyKind::GenericMedia,
        }
    }

    fn inner(&self) -> &dyn JobStrategy {
        match self {
            Strategy::CdaExtract(job) => job,
            Strategy::Office(job) => job,
            Strategy::Ico(job) => job,
            Strategy::Gif(job) => job,
            Strategy::RasterToPdf(job) => job,
            Strategy::VectorRasterize(job) => job,
            Strategy::GenericRaster(job) => job,
            Strategy::GenericMedia(job) => job,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn JobStrategy {
        match self {
            Strategy::CdaExtract(job) => job,
            Strategy::Office(job) => job,
            Strategy::Ico(job) => job,
            Strategy::Gif(job) => job,
            Strategy::RasterToPdf(job) => job,
            Strategy::VectorRasterize(job) => job,
            Strategy::GenericRaster(job) => job,
            Strategy::GenericMedia(job) => job,
        }
    }
}

impl JobStrategy for Strategy {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn supports_output(&self, output: OutputType) -> bool {
        self.inner().supports_output(output)
    }

    fn initialize(&mut self, ctx: &mut JobContext<'_>) -> Result<()> {
        self.inner_mut().initialize(ctx)
    }

    fn convert(&mut self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>> {
        self.inner_mut().convert(ctx)
    }

    fn is_cancelable(&self) -> bool {
        self.inner().is_cancelable()
    }

    fn output_files_count(&self) -> usize {
        self.inner().output_files_count()
    }
}
