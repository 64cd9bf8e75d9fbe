//! CD audio track extraction.
//!
//! `.cda` files are placeholders the OS shows for tracks on an audio CD. The
//! track number comes from the file name; cdparanoia rips it to WAV and
//! FFmpeg encodes the result.

use super::media::ffmpeg_invocation;
use super::{ensure_output_supported, JobStrategy};
use crate::error::{ConversionError, Result};
use crate::job::{labels, JobContext};
use crate::preset::{OutputFamily, OutputType};
use crate::tools::{Tool, ToolInvocation};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Track number encoded in a `TrackNN.cda` file name.
pub fn parse_track_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let prefix = stem.get(..5)?;
    if !prefix.eq_ignore_ascii_case("track") {
        return None;
    }
    let digits = stem[5..].trim();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|track| *track > 0)
}

/// Rips one CD track and encodes it.
#[derive(Debug, Clone, Default)]
pub struct CdaJob {
    track: Option<u32>,
}

impl CdaJob {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStrategy for CdaJob {
    fn name(&self) -> &'static str {
        "CD audio"
    }

    fn supports_output(&self, output: OutputType) -> bool {
        output.family() == OutputFamily::Audio
    }

    fn initialize(&mut self, ctx: &mut JobContext<'_>) -> Result<()> {
        ensure_output_supported(self.name(), self.supports_output(ctx.preset().output_type), ctx)?;
        let track = parse_track_number(ctx.input_path()).ok_or_else(|| {
            ConversionError::DocumentOpenFailure {
                path: ctx.input_path().to_path_buf(),
                message: "not a CD audio track (expected TrackNN.cda)".to_string(),
            }
        })?;
        debug!("CD track {}", track);
        self.track = Some(track);
        Ok(())
    }

    fn convert(&mut self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>> {
        let track = self.track.ok_or_else(|| ConversionError::DocumentOpenFailure {
            path: ctx.input_path().to_path_buf(),
            message: "track number unknown".to_string(),
        })?;

        ctx.set_user_state(labels::EXTRACTING_TRACK);
        let scratch = ctx.scratch_dir()?;
        let wav = scratch.path().join(format!("track{:02}.wav", track));
        let rip = ToolInvocation::new(Tool::Cdparanoia, ctx.input_path())
            .arg("-d")
            .arg(&ctx.tools_config().cd_device)
            .arg(track.to_string())
            .arg(&wav);
        ctx.run_tool(&rip)?;
        ctx.check_canceled()?;

        ctx.set_user_state(labels::CONVERTING);
        let output = ctx.output_path()?;
        let encode = ffmpeg_invocation(&wav, &output, ctx.preset().output_type, &ctx.settings())?;
        ctx.run_tool(&encode)?;
        Ok(vec![output])
    }

    fn is_cancelable(&self) -> bool {
        true
    }
}
