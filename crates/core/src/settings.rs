//! Read-only, typed access to a preset's settings.
//!
//! A setting is *relevant* when the preset declares it and it applies to the
//! preset's output type. Irrelevant settings read as `None` so callers skip
//! the stage they control instead of treating them as zero/false.

use crate::error::{ConversionError, Result};
use crate::preset::{keys, ConversionPreset};

/// A type a setting value can be parsed into.
pub trait SettingType: Sized {
    /// Human readable type name, used in diagnostics.
    const NAME: &'static str;

    fn parse_setting(raw: &str) -> Option<Self>;
}

impl SettingType for f64 {
    const NAME: &'static str = "number";

    fn parse_setting(raw: &str) -> Option<Self> {
        raw.trim().parse().ok().filter(|v: &f64| v.is_finite())
    }
}

impl SettingType for f32 {
    const NAME: &'static str = "number";

    fn parse_setting(raw: &str) -> Option<Self> {
        raw.trim().parse().ok().filter(|v: &f32| v.is_finite())
    }
}

impl SettingType for i64 {
    const NAME: &'static str = "integer";

    fn parse_setting(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl SettingType for u32 {
    const NAME: &'static str = "positive integer";

    fn parse_setting(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl SettingType for bool {
    const NAME: &'static str = "boolean";

    fn parse_setting(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("true") {
            Some(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

impl SettingType for String {
    const NAME: &'static str = "text";

    fn parse_setting(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

/// Accessor over a preset's keyed settings.
#[derive(Debug, Clone, Copy)]
pub struct SettingsLookup<'a> {
    preset: &'a ConversionPreset,
}

impl<'a> SettingsLookup<'a> {
    pub fn new(preset: &'a ConversionPreset) -> Self {
        Self { preset }
    }

    /// Whether the preset declares `key` and it applies to its output type.
    pub fn is_relevant(&self, key: &str) -> bool {
        self.preset.settings.contains_key(key) && self.preset.output_type.accepts_setting(key)
    }

    /// Typed value of a relevant setting.
    ///
    /// Returns `Ok(None)` when the setting is not relevant and
    /// `Err(InvalidPreset)` when it is relevant but cannot be parsed.
    pub fn try_get<T: SettingType>(&self, key: &str) -> Result<Option<T>> {
        if !self.is_relevant(key) {
            return Ok(None);
        }
        let raw = self.preset.setting(key).unwrap_or_default();
        T::parse_setting(raw).map(Some).ok_or_else(|| {
            ConversionError::InvalidPreset(format!(
                "setting {} of preset '{}' expects a {}, got '{}'",
                key,
                self.preset.name,
                T::NAME,
                raw
            ))
        })
    }

    /// Check every relevant, known setting parses as its declared type.
    pub fn validate(&self) -> Result<()> {
        self.try_get::<f64>(keys::IMAGE_ROTATION)?;
        self.try_get::<f64>(keys::IMAGE_SCALE)?;
        self.try_get::<i64>(keys::IMAGE_MAXIMUM_SIZE)?;
        self.try_get::<bool>(keys::IMAGE_CLAMP_SIZE_POWER_OF_2)?;
        self.try_get::<u32>(keys::IMAGE_QUALITY)?;
        self.try_get::<u32>(keys::AUDIO_BITRATE)?;
        self.try_get::<u32>(keys::AUDIO_CHANNEL_COUNT)?;
        self.try_get::<u32>(keys::VIDEO_QUALITY)?;
        self.try_get::<bool>(keys::ENABLE_AUDIO)?;
        Ok(())
    }
}
