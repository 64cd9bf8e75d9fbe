//! Configuration types for the converter and batch results.

use crate::preset::ConversionPreset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the external conversion tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the soffice binary. If None, searches well-known locations and PATH.
    pub libreoffice_path: Option<PathBuf>,

    /// Path to the ffmpeg binary. If None, searches PATH.
    pub ffmpeg_path: Option<PathBuf>,

    /// Path to the ImageMagick `magick` binary. If None, searches PATH.
    pub imagemagick_path: Option<PathBuf>,

    /// Path to the cdparanoia binary. If None, searches PATH.
    pub cdparanoia_path: Option<PathBuf>,

    /// Optical drive CD audio tracks are read from.
    /// Default: /dev/cdrom.
    pub cd_device: String,

    /// Timeout for a single tool invocation.
    /// Default: 600 seconds.
    pub tool_timeout: Duration,

    /// Directory for intermediate files.
    /// Default: system temp directory.
    pub temp_dir: Option<PathBuf>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            libreoffice_path: None,
            ffmpeg_path: None,
            imagemagick_path: None,
            cdparanoia_path: None,
            cd_device: "/dev/cdrom".to_string(),
            tool_timeout: Duration::from_secs(600),
            temp_dir: None,
        }
    }
}

impl ToolsConfig {
    /// Set the tool timeout.
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Set the temporary directory.
    pub fn temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = Some(dir);
        self
    }

    /// Set the soffice binary path.
    pub fn libreoffice_path(mut self, path: PathBuf) -> Self {
        self.libreoffice_path = Some(path);
        self
    }

    /// Set the ffmpeg binary path.
    pub fn ffmpeg_path(mut self, path: PathBuf) -> Self {
        self.ffmpeg_path = Some(path);
        self
    }

    /// Set the optical drive.
    pub fn cd_device(mut self, device: impl Into<String>) -> Self {
        self.cd_device = device.into();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.tool_timeout.as_secs() == 0 {
            return Err(crate::error::ConversionError::InvalidConfig(
                "tool_timeout must be greater than 0".to_string(),
            ));
        }
        if self.cd_device.trim().is_empty() {
            return Err(crate::error::ConversionError::InvalidConfig(
                "cd_device must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for rasterizing and encoding images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// DPI document pages are rendered at.
    /// Default: 150.
    pub dpi: u32,

    /// PNG compression level (0-9, higher = smaller file, slower).
    /// Default: 6.
    pub png_compression: u8,

    /// JPEG/WebP quality used when the preset does not set one.
    /// Default: 90.
    pub default_quality: u8,

    /// Background color for formats without alpha.
    /// Default: white (255, 255, 255).
    pub background_color: (u8, u8, u8),

    /// Longest edge, in pixels, of any canvas a job allocates. Transforms
    /// that would produce a larger image fail the job instead.
    /// Default: 16384.
    #[serde(default = "default_max_pixel_edge")]
    pub max_pixel_edge: u32,
}

/// Upper bound accepted for [`RenderConfig::max_pixel_edge`].
pub const MAX_PIXEL_EDGE_LIMIT: u32 = 65_536;

fn default_max_pixel_edge() -> u32 {
    16_384
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            png_compression: 6,
            default_quality: 90,
            background_color: (255, 255, 255),
            max_pixel_edge: default_max_pixel_edge(),
        }
    }
}

impl RenderConfig {
    /// Create a render config with specified DPI.
    pub fn with_dpi(dpi: u32) -> Self {
        Self {
            dpi,
            ..Default::default()
        }
    }

    /// Set PNG compression level.
    pub fn png_compression(mut self, level: u8) -> Self {
        self.png_compression = level.min(9);
        self
    }

    /// Set the fallback lossy quality.
    pub fn default_quality(mut self, quality: u8) -> Self {
        self.default_quality = quality.clamp(1, 100);
        self
    }

    /// Set the background color.
    pub fn background_color(mut self, color: (u8, u8, u8)) -> Self {
        self.background_color = color;
        self
    }

    /// Set the largest canvas edge a job may allocate.
    pub fn max_pixel_edge(mut self, edge: u32) -> Self {
        self.max_pixel_edge = edge;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.dpi == 0 || self.dpi > 1200 {
            return Err(crate::error::ConversionError::InvalidConfig(
                "dpi must be between 1 and 1200".to_string(),
            ));
        }
        if self.png_compression > 9 {
            return Err(crate::error::ConversionError::InvalidConfig(
                "png_compression must be between 0 and 9".to_string(),
            ));
        }
        if self.default_quality == 0 || self.default_quality > 100 {
            return Err(crate::error::ConversionError::InvalidConfig(
                "default_quality must be between 1 and 100".to_string(),
            ));
        }
        if self.max_pixel_edge == 0 || self.max_pixel_edge > MAX_PIXEL_EDGE_LIMIT {
            return Err(crate::error::ConversionError::InvalidConfig(format!(
                "max_pixel_edge must be between 1 and {}",
                MAX_PIXEL_EDGE_LIMIT
            )));
        }
        Ok(())
    }
}

/// Configuration for running many jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum number of jobs running at once.
    /// Default: number of CPU cores.
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self { concurrency }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.concurrency == 0 {
            return Err(crate::error::ConversionError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Combined configuration for the converter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// External tool configuration.
    pub tools: ToolsConfig,

    /// Render configuration.
    pub render: RenderConfig,

    /// Batch configuration.
    pub batch: BatchConfig,
}

impl ConverterConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| {
            crate::error::ConversionError::InvalidConfig(format!(
                "malformed configuration '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Validate the entire configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        self.tools.validate()?;
        self.render.validate()?;
        self.batch.validate()?;
        Ok(())
    }
}

/// A single conversion request for the batch driver.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Preset to convert with.
    pub preset: Arc<ConversionPreset>,

    /// Path to the input file.
    pub input_path: PathBuf,
}

impl ConversionRequest {
    /// Create a new conversion request.
    pub fn new(preset: Arc<ConversionPreset>, input_path: impl Into<PathBuf>) -> Self {
        Self {
            preset,
            input_path: input_path.into(),
        }
    }
}

/// Progress information for a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionProgress {
    /// Index of the request this update is about.
    pub file_index: usize,

    /// Total number of requests in the batch.
    pub total_files: usize,

    /// Name of the file.
    pub current_file: String,

    /// Lifecycle state the job reached.
    pub state: crate::job::ConversionState,
}

/// Result of a batch conversion operation.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Successfully converted files.
    pub successful: Vec<FileResult>,

    /// Failed conversions.
    pub failed: Vec<FailedFile>,

    /// Inputs whose jobs were canceled.
    pub canceled: Vec<PathBuf>,

    /// Total processing time.
    pub total_duration: Duration,
}

/// Result for a single successfully converted file.
#[derive(Debug, Clone)]
pub struct FileResult {
    /// Original input path.
    pub input_path: PathBuf,

    /// Files written.
    pub output_paths: Vec<PathBuf>,

    /// Processing time for this file.
    pub duration: Duration,
}

/// Information about a failed conversion.
#[derive(Debug, Clone)]
pub struct FailedFile {
    /// Original input path.
    pub input_path: PathBuf,

    /// Error message.
    pub error: String,
}
