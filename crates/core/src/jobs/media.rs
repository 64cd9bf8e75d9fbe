//! Audio and video transcoding with FFmpeg.

use super::JobStrategy;
use crate::error::Result;
use crate::job::{labels, JobContext};
use crate::preset::{keys, OutputFamily, OutputType};
use crate::settings::SettingsLookup;
use crate::tools::{Tool, ToolInvocation};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 192;
const DEFAULT_VIDEO_CRF: u32 = 23;
const MAX_CRF: u32 = 51;

/// Codec arguments for `output`, shaped by the preset settings.
pub fn ffmpeg_codec_args(output: OutputType, settings: &SettingsLookup<'_>) -> Result<Vec<String>> {
    let bitrate = settings
        .try_get::<u32>(keys::AUDIO_BITRATE)?
        .unwrap_or(DEFAULT_AUDIO_BITRATE_KBPS);
    let channels = settings.try_get::<u32>(keys::AUDIO_CHANNEL_COUNT)?;
    let crf = settings
        .try_get::<u32>(keys::VIDEO_QUALITY)?
        .unwrap_or(DEFAULT_VIDEO_CRF)
        .min(MAX_CRF);
    let enable_audio = settings.try_get::<bool>(keys::ENABLE_AUDIO)?.unwrap_or(true);

    let mut args: Vec<String> = Vec::new();
    let mut push = |values: &[&str]| args.extend(values.iter().map(|v| v.to_string()));

    let audio_codec = match output {
        OutputType::Mp3 => "libmp3lame",
        OutputType::Ogg => "libvorbis",
        OutputType::Aac | OutputType::Mp4 | OutputType::Mkv => "aac",
        OutputType::Flac => "flac",
        OutputType::Wav => "pcm_s16le",
        OutputType::Webm => "libopus",
        OutputType::Avi => "libmp3lame",
        _ => "copy",
    };

    match output.family() {
        OutputFamily::Audio => {
            push(&["-vn", "-c:a", audio_codec]);
            if !matches!(output, OutputType::Flac | OutputType::Wav) {
                push(&["-b:a", &format!("{}k", bitrate)]);
            }
            if let Some(channels) = channels {
                push(&["-ac", &channels.to_string()]);
            }
        }
        OutputFamily::Video => {
            match output {
                OutputType::Webm => {
                    push(&["-c:v", "libvpx-vp9", "-crf", &crf.to_string(), "-b:v", "0"])
                }
                OutputType::Avi => {
                    // mpeg4 takes a 1-31 quantizer instead of a CRF.
                    let qscale = 1 + crf * 30 / MAX_CRF;
                    push(&["-c:v", "mpeg4", "-q:v", &qscale.to_string()])
                }
                _ => push(&[
                    "-c:v",
                    "libx264",
                    "-crf",
                    &crf.to_string(),
                    "-pix_fmt",
                    "yuv420p",
                ]),
            }
            if enable_audio {
                push(&["-c:a", audio_codec, "-b:a", &format!("{}k", bitrate)]);
            } else {
                push(&["-an"]);
            }
        }
        OutputFamily::Image | OutputFamily::Document => {}
    }
    Ok(args)
}

/// Full FFmpeg invocation converting `input` to `output`.
pub(crate) fn ffmpeg_invocation(
    input: &Path,
    output: &Path,
    output_type: OutputType,
    settings: &SettingsLookup<'_>,
) -> Result<ToolInvocation> {
    let invocation = ToolInvocation::new(Tool::Ffmpeg, input)
        .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
        .arg(input)
        .args(ffmpeg_codec_args(output_type, settings)?)
        .arg(output);
    Ok(invocation)
}

/// Transcodes audio and video inputs.
#[derive(Debug, Clone, Default)]
pub struct MediaJob;

impl MediaJob {
    pub fn new() -> Self {
        Self
    }
}

impl JobStrategy for MediaJob {
    fn name(&self) -> &'static str {
        "media"
    }

    fn supports_output(&self, output: OutputType) -> bool {
        matches!(output.family(), OutputFamily::Audio | OutputFamily::Video)
    }

    fn convert(&mut self, ctx: &mut JobContext<'_>) -> Result<Vec<PathBuf>> {
        ctx.set_user_state(labels::CONVERTING);
        let output = ctx.output_path()?;
        let invocation = ffmpeg_invocation(
            ctx.input_path(),
            &output,
            ctx.preset().output_type,
            &ctx.settings(),
        )?;
        ctx.run_tool(&invocation)?;
        Ok(vec![output])
    }

    fn is_cancelable(&self) -> bool {
        true
    }
}
