//! Image to image conversion, including PDF pages and SVG sources.

use super::JobStrategy;
use crate::category::extension_of;
use crate::error::Result;
use crate::job::{labels, JobContext};
use crate::pdf_renderer::PdfRenderer;
use crate::preset::{keys, OutputFamily, OutputType};
use crate::render::{draw_raster, load_image, write_image, EncodeOptions, PixelSize, SvgDocument};
use crate::settings::SettingsLookup;
use crate::transform::{CanvasSize, TransformPipeline};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Image outputs the raster encoders write directly.
pub fn supports_raster_output(output: OutputType) -> bool {
    output.family() == OutputFamily::Image && !matches!(output, OutputType::Ico | OutputType::Gif)
}

/// Redraw `image` through the transform pipeline configured by `settings`.
///
/// Returns the image unchanged when no stage applies. A result with an edge
/// above `max_edge` pixels is refused.
pub fn apply_pipeline(
    image: RgbaImage,
    settings: &SettingsLookup<'_>,
    max_edge: u32,
    path: &Path,
) -> Result<RgbaImage> {
    let intrinsic = CanvasSize::new(image.width() as f64, image.height() as f64);
    let pipeline = TransformPipeline::build(intrinsic, settings)?;
    if pipeline.transform.is_empty() {
        return Ok(image);
    }

    let size = PixelSize::fit(pipeline.size, max_edge, path)?;
    debug!(
        "Redrawing {}x{} image at {}x{}",
        image.width(),
        image.height(),
        size.width,
        size.height
    );
    draw_raster(&image, &pipeline.transform, size)
}

/// Decodes images (or renders PDF pages) and re-encodes them.
#[derive(Debug, Clone, Default)]
pub struct RasterJob {
    page_count: Option<usize>,
}

impl RasterJob {
    pub fn new() -> Self {
        Self::default()
    }

    fn convert_pdf(&mut self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>> {
        let input = ctx.input_path().to_path_buf();
        let renderer = PdfRenderer::new(ctx.render_config().clone())?;

        ctx.set_user_state(labels::RENDERING);
        let pages = renderer.render_pages(&input, |done, total| {
            debug!("Rendered page {}/{}", done, total);
        })?;
        self.page_count = Some(pages.len());

        ctx.set_user_state(labels::ENCODING);
        let output = ctx.preset().output_type;
        let options = encode_options(ctx)?;
        let max_edge = ctx.render_config().max_pixel_edge;
        let mut outputs = Vec::with_capacity(pages.len());
        for page in pages {
            let path = ctx.page_output_path(page.page_number)?;
            let image = apply_pipeline(page.image, &ctx.settings(), max_edge, &path)?;
            write_image(&image, output, &path, &options)?;
            outputs.push(path);
        }
        Ok(outputs)
    }

    fn convert_svg(&mut self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>> {
        let document = SvgDocument::open(ctx.input_path())?;
        let pipeline = TransformPipeline::build(document.size(), &ctx.settings())?;
        let path = ctx.output_path()?;
        let size = PixelSize::fit(pipeline.size, ctx.render_config().max_pixel_edge, &path)?;

        ctx.set_user_state(labels::RENDERING);
        let image = document.render(&pipeline.transform, size)?;

        ctx.set_user_state(labels::ENCODING);
        write_image(&image, ctx.preset().output_type, &path, &encode_options(ctx)?)?;
        Ok(vec![path])
    }

    fn convert_image(&mut self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>> {
        let max_edge = ctx.render_config().max_pixel_edge;
        let image = load_image(ctx.input_path(), max_edge)?;
        let path = ctx.output_path()?;

        ctx.set_user_state(labels::RENDERING);
        let image = apply_pipeline(image, &ctx.settings(), max_edge, &path)?;

        ctx.set_user_state(labels::ENCODING);
        write_image(&image, ctx.preset().output_type, &path, &encode_options(ctx)?)?;
        Ok(vec![path])
    }
}

pub(crate) fn encode_options(ctx: &JobContext<'_>) -> Result<EncodeOptions> {
    let quality = ctx.settings().try_get::<u32>(keys::IMAGE_QUALITY)?;
    Ok(EncodeOptions::from_config(ctx.render_config(), quality))
}

impl JobStrategy for RasterJob {
    fn name(&self) -> &'static str {
        "image"
    }

    fn supports_output(&self, output: OutputType) -> bool {
        supports_raster_output(output)
    }

    fn convert(&mut self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>> {
        ctx.set_user_state(labels::READING_DOCUMENT);
        match extension_of(ctx.input_path()).as_str() {
            "pdf" => self.convert_pdf(ctx),
            "svg" => self.convert_svg(ctx),
            _ => self.convert_image(ctx),
        }
    }

    fn is_cancelable(&self) -> bool {
        false
    }

    fn output_files_count(&self) -> usize {
        self.page_count.unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{ConversionState, JobEnvironment};
    use crate::jobs::StrategyKind;
    use crate::preset::ConversionPreset;
    use crate::{ConversionError, JobDispatcher};
    use image::{ImageFormat, Rgba};
    use std::sync::Arc;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255]))
            .save(&path)
            .unwrap();
        path
    }

    fn run(input: &Path, preset: ConversionPreset) -> crate::ConversionJob {
        let mut job = JobDispatcher::create_with_env(
            Some(Arc::new(preset)),
            input,
            JobEnvironment::default(),
        );
        job.run();
        job
    }

    #[test]
    fn test_supported_outputs() {
        assert!(supports_raster_output(OutputType::Png));
        assert!(supports_raster_output(OutputType::Tiff));
        assert!(!supports_raster_output(OutputType::Ico));
        assert!(!supports_raster_output(OutputType::Gif));
        assert!(!supports_raster_output(OutputType::Pdf));
        assert!(!supports_raster_output(OutputType::Wav));
    }

    #[test]
    fn test_png_to_jpg() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "photo.png", 40, 30);
        let job = run(
            &input,
            ConversionPreset::new("Jpeg", OutputType::Jpg).with_setting(keys::IMAGE_QUALITY, 75),
        );
        assert_eq!(job.strategy_kind(), StrategyKind::GenericRaster);
        assert_eq!(job.state(), ConversionState::Done, "{:?}", job.error());

        let data = std::fs::read(dir.path().join("photo.jpg")).unwrap();
        assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }

    #[test]
    fn test_settings_resize_raster() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "large.png", 400, 200);
        let job = run(
            &input,
            ConversionPreset::new("Thumb", OutputType::Bmp).with_setting(keys::IMAGE_MAXIMUM_SIZE, 100),
        );
        assert_eq!(job.state(), ConversionState::Done, "{:?}", job.error());
        let decoded = image::open(dir.path().join("large.bmp")).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }

    #[test]
    fn test_same_format_never_replaces_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "photo.png", 10, 10);
        let preset = ConversionPreset::new("Double", OutputType::Png).with_setting(keys::IMAGE_SCALE, 2);

        let job = run(&input, preset.clone());
        assert_eq!(job.strategy_kind(), StrategyKind::GenericRaster);
        assert_eq!(job.state(), ConversionState::Failed);
        assert!(matches!(job.error(), Some(ConversionError::OutputDirError { .. })));
        assert!(job.output_paths().is_empty());
        let source = image::open(&input).unwrap();
        assert_eq!((source.width(), source.height()), (10, 10));

        // With a separate output directory the same conversion goes through.
        let job = run(&input, preset.with_output_directory(dir.path().join("out")));
        assert_eq!(job.state(), ConversionState::Done, "{:?}", job.error());
        let scaled = image::open(dir.path().join("out").join("photo.png")).unwrap();
        assert_eq!((scaled.width(), scaled.height()), (20, 20));
        let source = image::open(&input).unwrap();
        assert_eq!((source.width(), source.height()), (10, 10));
    }

    #[test]
    fn test_apply_pipeline_without_settings_is_identity() {
        let preset = ConversionPreset::new("Plain", OutputType::Png);
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 4]));
        let result = apply_pipeline(image.clone(), &SettingsLookup::new(&preset), 16_384, Path::new("x"))
            .unwrap();
        assert_eq!(result, image);
    }

    #[test]
    fn test_svg_to_webp() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("logo.svg");
        std::fs::write(
            &input,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="16" height="8"/>"#,
        )
        .unwrap();
        let job = run(&input, ConversionPreset::new("Web", OutputType::Webp));
        assert_eq!(job.state(), ConversionState::Done, "{:?}", job.error());
        let data = std::fs::read(dir.path().join("logo.webp")).unwrap();
        assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn test_undecodable_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("garbage.png");
        std::fs::write(&input, b"not an image").unwrap();
        let job = run(&input, ConversionPreset::new("Plain", OutputType::Jpg));
        assert_eq!(job.state(), ConversionState::Failed);
        assert!(matches!(
            job.error(),
            Some(ConversionError::DocumentOpenFailure { .. })
        ));
    }

    #[test]
    fn test_rejects_audio_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "photo.png", 4, 4);
        let mut job = JobDispatcher::create(
            Some(Arc::new(ConversionPreset::new("Audio", OutputType::Mp3))),
            &input,
        );
        assert_eq!(job.strategy_kind(), StrategyKind::GenericRaster);
        assert_eq!(job.initialize(), ConversionState::Failed);
        assert!(matches!(
            job.error(),
            Some(ConversionError::UnsupportedOutputFormat {
                output: OutputType::Mp3,
                ..
            })
        ));
    }
}
