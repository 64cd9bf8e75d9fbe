//! GIF output from still images or video clips.

use super::raster::apply_pipeline;
use super::JobStrategy;
use crate::error::Result;
use crate::job::{labels, JobContext};
use crate::preset::OutputType;
use crate::render::{load_image, write_image, EncodeOptions};
use crate::tools::{Tool, ToolInvocation};
use std::path::PathBuf;

/// Frame rate and width of animations made from video.
const ANIMATION_FILTER: &str = "fps=10,scale=480:-1:flags=lanczos";

/// Encodes a GIF. Video inputs become animations through FFmpeg and can be
/// canceled; still images are encoded in-process.
#[derive(Debug, Clone)]
pub struct GifJob {
    video: bool,
}

impl GifJob {
    pub fn new(video: bool) -> Self {
        Self { video }
    }

    fn convert_video(&self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>> {
        ctx.set_user_state(labels::CONVERTING);
        let output = ctx.output_path()?;
        let invocation = ToolInvocation::new(Tool::Ffmpeg, ctx.input_path())
            .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(ctx.input_path())
            .args(["-vf", ANIMATION_FILTER, "-loop", "0"])
            .arg(&output);
        ctx.run_tool(&invocation)?;
        Ok(vec![output])
    }

    fn convert_still(&self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>> {
        ctx.set_user_state(labels::READING_DOCUMENT);
        let max_edge = ctx.render_config().max_pixel_edge;
        let image = load_image(ctx.input_path(), max_edge)?;
        let output = ctx.output_path()?;

        ctx.set_user_state(labels::RENDERING);
        let image = apply_pipeline(image, &ctx.settings(), max_edge, &output)?;

        ctx.set_user_state(labels::ENCODING);
        write_image(
            &image,
            OutputType::Gif,
            &output,
            &EncodeOptions::from_config(ctx.render_config(), None),
        )?;
        Ok(vec![output])
    }
}

impl JobStrategy for GifJob {
    fn name(&self) -> &'static str {
        "gif"
    }

    fn supports_output(&self, output: OutputType) -> bool {
        output == OutputType::Gif
    }

    fn convert(&mut self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>> {
        if self.video {
            self.convert_video(ctx)
        } else {
            self.convert_still(ctx)
        }
    }

    fn is_cancelable(&self) -> bool {
        self.video
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{ConversionState, JobEnvironment};
    use crate::jobs::StrategyKind;
    use crate::preset::{keys, ConversionPreset};
    use crate::tools::testing::RecordingRunner;
    use crate::JobDispatcher;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::sync::Arc;

    #[test]
    fn test_video_to_gif_uses_ffmpeg() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"ftyp").unwrap();

        let runner = Arc::new(RecordingRunner::writing_last_arg());
        let env = JobEnvironment::default().with_tool_runner(runner.clone());
        let preset = Arc::new(ConversionPreset::new("Gif", OutputType::Gif));
        let mut job = JobDispatcher::create_with_env(Some(preset), &input, env);
        assert_eq!(job.strategy_kind(), StrategyKind::GifEncode);
        assert!(job.is_cancelable());
        assert_eq!(job.run(), ConversionState::Done, "{:?}", job.error());

        let recorded = runner.recorded();
        assert_eq!(recorded.len(), 1);
        let args = recorded[0].args_lossy();
        assert!(args.contains(&ANIMATION_FILTER.to_string()));
        assert!(args.last().unwrap().ends_with("clip.gif"));
    }

    #[test]
    fn test_still_to_gif_applies_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tall.png");
        RgbaImage::from_pixel(20, 10, Rgba([255, 255, 0, 255]))
            .save(&input)
            .unwrap();

        let runner = Arc::new(RecordingRunner::writing_last_arg());
        let env = JobEnvironment::default().with_tool_runner(runner.clone());
        let preset = Arc::new(
            ConversionPreset::new("Gif", OutputType::Gif).with_setting(keys::IMAGE_ROTATION, -90),
        );
        let mut job = JobDispatcher::create_with_env(Some(preset), &input, env);
        assert!(!job.is_cancelable());
        assert_eq!(job.run(), ConversionState::Done, "{:?}", job.error());
        assert!(runner.recorded().is_empty());

        let data = std::fs::read(dir.path().join("tall.gif")).unwrap();
        assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Gif);
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (10, 20));
    }

    #[test]
    fn test_gif_to_gif_never_replaces_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("anim.gif");
        RgbaImage::from_pixel(8, 4, Rgba([0, 0, 255, 255]))
            .save(&input)
            .unwrap();
        let original = std::fs::read(&input).unwrap();

        let preset = Arc::new(
            ConversionPreset::new("Gif", OutputType::Gif).with_setting(keys::IMAGE_ROTATION, 90),
        );
        let mut job = JobDispatcher::create_with_env(Some(preset), &input, JobEnvironment::default());
        assert_eq!(job.strategy_kind(), StrategyKind::GifEncode);
        assert_eq!(job.run(), ConversionState::Failed);
        assert!(matches!(
            job.error(),
            Some(crate::ConversionError::OutputDirError { .. })
        ));
        assert_eq!(std::fs::read(&input).unwrap(), original);
    }
}
