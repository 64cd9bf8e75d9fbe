//! SVG to PNG through the transform pipeline.

use super::JobStrategy;
use crate::error::Result;
use crate::job::{labels, JobContext};
use crate::preset::OutputType;
use crate::render::{write_image, EncodeOptions, PixelSize, SvgDocument};
use crate::transform::TransformPipeline;
use std::path::PathBuf;
use tracing::debug;

/// Renders a vector document into exactly one PNG.
#[derive(Debug, Clone, Default)]
pub struct SvgJob;

impl SvgJob {
    pub fn new() -> Self {
        Self
    }
}

impl JobStrategy for SvgJob {
    fn name(&self) -> &'static str {
        "vector rasterize"
    }

    fn supports_output(&self, output: OutputType) -> bool {
        output == OutputType::Png
    }

    fn convert(&mut self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>> {
        ctx.set_user_state(labels::READING_DOCUMENT);
        let document = SvgDocument::open(ctx.input_path())?;
        let intrinsic = document.size();
        debug!(
            "SVG {:?} intrinsic size {}x{}",
            ctx.input_path().file_name(),
            intrinsic.width,
            intrinsic.height
        );

        let pipeline = TransformPipeline::build(intrinsic, &ctx.settings())?;
        let output = ctx.output_path()?;
        let size = PixelSize::fit(pipeline.size, ctx.render_config().max_pixel_edge, &output)?;

        ctx.set_user_state(labels::RENDERING);
        let image = document.render(&pipeline.transform, size)?;

        ctx.set_user_state(labels::ENCODING);
        let options = EncodeOptions::from_config(ctx.render_config(), None);
        write_image(&image, OutputType::Png, &output, &options)?;
        Ok(vec![output])
    }

    fn is_cancelable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use crate::job::{ConversionState, JobEnvironment};
    use crate::jobs::StrategyKind;
    use crate::preset::{keys, ConversionPreset, OutputType};
    use crate::{ConversionError, JobDispatcher, RenderConfig};
    use std::path::Path;
    use std::sync::Arc;

    const WIDE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="300" height="100">
        <rect width="300" height="100" fill="#0000ff"/>
    </svg>"##;

    fn run(dir: &Path, preset: ConversionPreset) -> crate::ConversionJob {
        let input = dir.join("banner.svg");
        std::fs::write(&input, WIDE).unwrap();
        let mut job =
            JobDispatcher::create_with_env(Some(Arc::new(preset)), &input, JobEnvironment::default());
        assert_eq!(job.strategy_kind(), StrategyKind::VectorRasterize);
        job.run();
        job
    }

    fn png_size(path: &Path) -> (u32, u32) {
        let image = image::open(path).unwrap();
        (image.width(), image.height())
    }

    #[test]
    fn test_renders_at_intrinsic_size() {
        let dir = tempfile::tempdir().unwrap();
        let job = run(dir.path(), ConversionPreset::new("Plain", OutputType::Png));
        assert_eq!(job.state(), ConversionState::Done);
        assert_eq!(png_size(&dir.path().join("banner.png")), (300, 100));
    }

    #[test]
    fn test_power_of_two_clamp_rounds_down() {
        let dir = tempfile::tempdir().unwrap();
        let preset = ConversionPreset::new("Texture", OutputType::Png)
            .with_setting(keys::IMAGE_CLAMP_SIZE_POWER_OF_2, "True");
        let job = run(dir.path(), preset);
        assert_eq!(job.state(), ConversionState::Done);
        // 300 -> 128, 100 -> 42.67 rounded.
        assert_eq!(png_size(&dir.path().join("banner.png")), (128, 43));
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let preset =
            ConversionPreset::new("Portrait", OutputType::Png).with_setting(keys::IMAGE_ROTATION, 90);
        let job = run(dir.path(), preset);
        assert_eq!(job.state(), ConversionState::Done);

        let output = dir.path().join("banner.png");
        assert_eq!(png_size(&output), (100, 300));
        let image = image::open(&output).unwrap().into_rgba8();
        let center = image.get_pixel(50, 150);
        assert!(center[2] > 250 && center[3] > 250, "{:?}", center);
    }

    #[test]
    fn test_writes_into_preset_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("renders").join("png");
        let preset = ConversionPreset::new("Plain", OutputType::Png).with_output_directory(&out);
        let job = run(dir.path(), preset);
        assert_eq!(job.state(), ConversionState::Done);
        assert_eq!(job.output_paths(), &[out.join("banner.png")]);
        assert!(out.join("banner.png").exists());
    }

    #[test]
    fn test_scale_past_configured_edge_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("banner.svg");
        std::fs::write(&input, WIDE).unwrap();
        let env = JobEnvironment {
            render: RenderConfig::default().max_pixel_edge(512),
            ..JobEnvironment::default()
        };

        let preset = ConversionPreset::new("Huge", OutputType::Png).with_setting(keys::IMAGE_SCALE, 2);
        let mut job = JobDispatcher::create_with_env(Some(Arc::new(preset)), &input, env.clone());
        assert_eq!(job.run(), ConversionState::Done, "{:?}", job.error());
        assert_eq!(png_size(&dir.path().join("banner.png")), (600, 200));

        std::fs::remove_file(dir.path().join("banner.png")).unwrap();
        let preset = ConversionPreset::new("Huge", OutputType::Png).with_setting(keys::IMAGE_SCALE, 4);
        let mut job = JobDispatcher::create_with_env(Some(Arc::new(preset)), &input, env);
        assert_eq!(job.run(), ConversionState::Failed);
        match job.error() {
            Some(ConversionError::EncodeFailure { message, .. }) => {
                assert!(message.contains("maximum edge of 512"), "{}", message);
            }
            other => panic!("Expected EncodeFailure, got {:?}", other),
        }
        assert!(!dir.path().join("banner.png").exists());
    }

    #[test]
    fn test_broken_svg_fails_with_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.svg");
        std::fs::write(&input, "<svg").unwrap();
        let preset = Arc::new(ConversionPreset::new("Plain", OutputType::Png));
        let mut job = JobDispatcher::create(Some(preset), &input);

        assert_eq!(job.run(), ConversionState::Failed);
        assert!(matches!(
            job.error(),
            Some(ConversionError::DocumentOpenFailure { .. })
        ));
        assert!(!dir.path().join("broken.png").exists());
    }

    #[test]
    fn test_output_count_is_always_one() {
        let dir = tempfile::tempdir().unwrap();
        let job = run(dir.path(), ConversionPreset::new("Plain", OutputType::Png));
        assert_eq!(job.output_files_count(), 1);
        assert!(!job.is_cancelable());
    }
}
