//! Conversion presets: the output type and the named settings chosen by the user.

use crate::error::{ConversionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Setting keys understood by the conversion strategies.
pub mod keys {
    /// Rotation in degrees (float).
    pub const IMAGE_ROTATION: &str = "ImageRotation";
    /// Scale multiplier (float).
    pub const IMAGE_SCALE: &str = "ImageScale";
    /// Maximum output edge in pixels (integer).
    pub const IMAGE_MAXIMUM_SIZE: &str = "ImageMaximumSize";
    /// Clamp the output size to a power of two (boolean).
    pub const IMAGE_CLAMP_SIZE_POWER_OF_2: &str = "ImageClampSizePowerOf2";
    /// Lossy encoder quality, 1-100 (integer).
    pub const IMAGE_QUALITY: &str = "ImageQuality";
    /// Audio bitrate in kbit/s (integer).
    pub const AUDIO_BITRATE: &str = "AudioBitrate";
    /// Number of audio channels (integer).
    pub const AUDIO_CHANNEL_COUNT: &str = "AudioChannelCount";
    /// Video constant rate factor (integer, lower is better).
    pub const VIDEO_QUALITY: &str = "VideoQuality";
    /// Keep the audio stream when producing video (boolean).
    pub const ENABLE_AUDIO: &str = "EnableAudio";
}

/// Family an output type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFamily {
    Image,
    Document,
    Audio,
    Video,
}

/// Closed set of formats a preset can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputType {
    Png,
    Jpg,
    Webp,
    Bmp,
    Tiff,
    Ico,
    Gif,
    Pdf,
    Mp3,
    Ogg,
    Aac,
    Flac,
    Wav,
    Mp4,
    Webm,
    Mkv,
    Avi,
}

impl OutputType {
    /// Every output type, in declaration order.
    pub const ALL: [OutputType; 17] = [
        OutputType::Png,
        OutputType::Jpg,
        OutputType::Webp,
        OutputType::Bmp,
        OutputType::Tiff,
        OutputType::Ico,
        OutputType::Gif,
        OutputType::Pdf,
        OutputType::Mp3,
        OutputType::Ogg,
        OutputType::Aac,
        OutputType::Flac,
        OutputType::Wav,
        OutputType::Mp4,
        OutputType::Webm,
        OutputType::Mkv,
        OutputType::Avi,
    ];

    /// File extension (without dot) of files of this type.
    pub fn extension(self) -> &'static str {
        match self {
            OutputType::Png => "png",
            OutputType::Jpg => "jpg",
            OutputType::Webp => "webp",
            OutputType::Bmp => "bmp",
            OutputType::Tiff => "tiff",
            OutputType::Ico => "ico",
            OutputType::Gif => "gif",
            OutputType::Pdf => "pdf",
            OutputType::Mp3 => "mp3",
            OutputType::Ogg => "ogg",
            OutputType::Aac => "aac",
            OutputType::Flac => "flac",
            OutputType::Wav => "wav",
            OutputType::Mp4 => "mp4",
            OutputType::Webm => "webm",
            OutputType::Mkv => "mkv",
            OutputType::Avi => "avi",
        }
    }

    pub fn family(self) -> OutputFamily {
        match self {
            OutputType::Png
            | OutputType::Jpg
            | OutputType::Webp
            | OutputType::Bmp
            | OutputType::Tiff
            | OutputType::Ico
            | OutputType::Gif => OutputFamily::Image,
            OutputType::Pdf => OutputFamily::Document,
            OutputType::Mp3
            | OutputType::Ogg
            | OutputType::Aac
            | OutputType::Flac
            | OutputType::Wav => OutputFamily::Audio,
            OutputType::Mp4 | OutputType::Webm | OutputType::Mkv | OutputType::Avi => {
                OutputFamily::Video
            }
        }
    }

    /// Whether the encoded format keeps an alpha channel.
    pub fn supports_alpha(self) -> bool {
        matches!(
            self,
            OutputType::Png | OutputType::Webp | OutputType::Tiff | OutputType::Ico | OutputType::Gif
        )
    }

    /// Whether `key` applies to presets producing this output type.
    pub fn accepts_setting(self, key: &str) -> bool {
        use OutputType::*;
        let applicable: &[OutputType] = match key {
            keys::IMAGE_ROTATION | keys::IMAGE_SCALE => &[Png, Jpg, Webp, Bmp, Tiff, Gif],
            keys::IMAGE_MAXIMUM_SIZE | keys::IMAGE_CLAMP_SIZE_POWER_OF_2 => {
                &[Png, Jpg, Webp, Bmp, Tiff]
            }
            keys::IMAGE_QUALITY => &[Jpg, Webp],
            keys::AUDIO_BITRATE => &[Mp3, Ogg, Aac, Mp4, Webm, Mkv, Avi],
            keys::AUDIO_CHANNEL_COUNT => &[Mp3, Ogg, Aac, Flac, Wav],
            keys::VIDEO_QUALITY | keys::ENABLE_AUDIO => &[Mp4, Webm, Mkv, Avi],
            _ => &[],
        };
        applicable.contains(&self)
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A user-defined output configuration: target format plus named settings.
///
/// Setting values are stored as strings and typed on read through
/// [`crate::settings::SettingsLookup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionPreset {
    /// Display name of the preset.
    pub name: String,

    /// Format produced by conversions using this preset.
    pub output_type: OutputType,

    /// Settings declared by the preset.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,

    /// Directory to write outputs to. Defaults to the input file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<PathBuf>,
}

impl ConversionPreset {
    /// Create a preset with no settings.
    pub fn new(name: impl Into<String>, output_type: OutputType) -> Self {
        Self {
            name: name.into(),
            output_type,
            settings: BTreeMap::new(),
            output_directory: None,
        }
    }

    /// Declare a setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.settings.insert(key.into(), value.to_string());
        self
    }

    /// Write outputs to `dir` instead of next to the input.
    pub fn with_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(dir.into());
        self
    }

    /// Raw value of a declared setting.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Parse a preset from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ConversionError::InvalidPreset(format!("malformed preset JSON: {}", e)))
    }

    /// Load a preset from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize the preset to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConversionError::InvalidPreset(format!("cannot serialize preset: {}", e)))
    }

    /// Validate the preset.
    ///
    /// Settings that are relevant to the output type must parse as their
    /// declared type; settings for other output types are ignored.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ConversionError::InvalidPreset(
                "preset name must not be empty".to_string(),
            ));
        }
        crate::settings::SettingsLookup::new(self).validate()
    }
}
