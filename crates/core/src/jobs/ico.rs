//! Icon encoding.

use super::JobStrategy;
use crate::error::Result;
use crate::job::{labels, JobContext};
use crate::preset::OutputType;
use crate::render::{load_image, write_image, EncodeOptions};
use image::imageops::FilterType;
use image::RgbaImage;
use std::path::PathBuf;
use tracing::debug;

/// Largest edge an ICO entry can have.
pub const MAX_ICON_EDGE: u32 = 256;

/// Encodes any decodable image or SVG as a single-entry `.ico`.
#[derive(Debug, Clone, Default)]
pub struct IcoJob;

impl IcoJob {
    pub fn new() -> Self {
        Self
    }
}

/// Shrink `image` to fit an icon entry, keeping the aspect ratio.
fn fit_icon(image: RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width <= MAX_ICON_EDGE && height <= MAX_ICON_EDGE {
        return image;
    }
    let longest = width.max(height) as f64;
    let scale = MAX_ICON_EDGE as f64 / longest;
    let new_width = ((width as f64 * scale).round() as u32).clamp(1, MAX_ICON_EDGE);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, MAX_ICON_EDGE);
    debug!(
        "Resizing {}x{} to {}x{} for icon",
        width, height, new_width, new_height
    );
    image::imageops::resize(&image, new_width, new_height, FilterType::Lanczos3)
}

impl JobStrategy for IcoJob {
    fn name(&self) -> &'static str {
        "icon"
    }

    fn supports_output(&self, output: OutputType) -> bool {
        output == OutputType::Ico
    }

    fn convert(&mut self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>> {
        ctx.set_user_state(labels::READING_DOCUMENT);
        let image = load_image(ctx.input_path(), ctx.render_config().max_pixel_edge)?;
        let path = ctx.output_path()?;

        ctx.set_user_state(labels::ENCODING);
        let icon = fit_icon(image);
        write_image(
            &icon,
            OutputType::Ico,
            &path,
            &EncodeOptions::from_config(ctx.render_config(), None),
        )?;
        Ok(vec![path])
    }

    fn is_cancelable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ConversionState;
    use crate::jobs::StrategyKind;
    use crate::preset::ConversionPreset;
    use crate::JobDispatcher;
    use image::{ImageFormat, Rgba};
    use std::sync::Arc;

    #[test]
    fn test_fit_icon_keeps_small_images() {
        let image = RgbaImage::new(48, 32);
        assert_eq!(fit_icon(image).dimensions(), (48, 32));
    }

    #[test]
    fn test_fit_icon_shrinks_large_images() {
        let image = RgbaImage::new(1024, 512);
        assert_eq!(fit_icon(image).dimensions(), (256, 128));
    }

    #[test]
    fn test_png_to_ico() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("app.png");
        RgbaImage::from_pixel(600, 300, Rgba([0, 128, 255, 255]))
            .save(&input)
            .unwrap();

        let preset = Arc::new(ConversionPreset::new("Icon", OutputType::Ico));
        let mut job = JobDispatcher::create(Some(preset), &input);
        assert_eq!(job.strategy_kind(), StrategyKind::IcoEncode);
        assert_eq!(job.run(), ConversionState::Done, "{:?}", job.error());

        let data = std::fs::read(dir.path().join("app.ico")).unwrap();
        assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Ico);
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (256, 128));
    }

    #[test]
    fn test_svg_to_ico() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("favicon.svg");
        std::fs::write(
            &input,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="64"><circle cx="32" cy="32" r="30" fill="#333"/></svg>"##,
        )
        .unwrap();

        let preset = Arc::new(ConversionPreset::new("Icon", OutputType::Ico));
        let mut job = JobDispatcher::create(Some(preset), &input);
        assert_eq!(job.strategy_kind(), StrategyKind::IcoEncode);
        assert_eq!(job.run(), ConversionState::Done, "{:?}", job.error());
        assert!(dir.path().join("favicon.ico").exists());
    }
}
