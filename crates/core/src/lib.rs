//! # file-converter-core
//!
//! Preset-driven file conversion library.
//!
//! A [`ConversionPreset`] names an output format and a set of keyed settings.
//! For each input file the [`JobDispatcher`] picks a conversion strategy from
//! the file extension and the preset's output type, and wraps it in a
//! [`ConversionJob`] with a uniform lifecycle:
//!
//! - **SVG** documents are rendered with resvg through a [`TransformPipeline`]
//!   (rotation, scale, size clamps)
//! - **Images** are decoded and re-encoded with `image` and `png`
//! - **Office documents** go through a headless LibreOffice, then pdfium
//! - **Audio and video** are transcoded by FFmpeg; CD tracks are ripped with
//!   cdparanoia first
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use file_converter_core::{keys, ConversionPreset, ConversionState, JobDispatcher, OutputType};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let preset = ConversionPreset::new("Thumbnail", OutputType::Png)
//!     .with_setting(keys::IMAGE_MAXIMUM_SIZE, 256)
//!     .with_setting(keys::IMAGE_ROTATION, 90);
//!
//! let mut job = JobDispatcher::create(Some(Arc::new(preset)), Path::new("logo.svg"));
//! match job.run() {
//!     ConversionState::Done => println!("Wrote {:?}", job.output_paths()),
//!     state => println!("Job ended {}: {:?}", state, job.error()),
//! }
//! ```
//!
//! ## Batch Processing with Progress
//!
//! ```rust,no_run
//! use file_converter_core::{ConversionPreset, ConversionRequest, Converter, ConverterConfig, OutputType};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let converter = Converter::new(ConverterConfig::default())?;
//!     let preset = Arc::new(ConversionPreset::new("Audio", OutputType::Mp3));
//!
//!     let requests = vec![
//!         ConversionRequest::new(preset.clone(), "interview.wav"),
//!         ConversionRequest::new(preset.clone(), "lecture.flac"),
//!     ];
//!
//!     let result = converter
//!         .run_batch(requests, |progress| {
//!             println!(
//!                 "File {}/{} ({}): {}",
//!                 progress.file_index + 1,
//!                 progress.total_files,
//!                 progress.current_file,
//!                 progress.state
//!             );
//!         })
//!         .await;
//!
//!     println!(
//!         "{} converted, {} failed in {:?}",
//!         result.successful.len(),
//!         result.failed.len(),
//!         result.total_duration
//!     );
//!     Ok(())
//! }
//! ```

pub mod category;
pub mod config;
pub mod converter;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod jobs;
pub mod pdf_renderer;
pub mod preset;
pub mod render;
pub mod settings;
pub mod tools;
pub mod transform;

// Re-export main types for convenience
pub use category::{category_of, InputCategory};
pub use config::{
    BatchConfig, BatchResult, ConversionProgress, ConversionRequest, ConverterConfig, FailedFile,
    FileResult, RenderConfig, ToolsConfig,
};
pub use converter::Converter;
pub use dispatcher::JobDispatcher;
pub use error::{ConversionError, Result};
pub use job::{CancelToken, ConversionJob, ConversionState, JobEnvironment, ProgressSink};
pub use jobs::{JobStrategy, Strategy, StrategyKind};
pub use pdf_renderer::PdfRenderer;
pub use preset::{keys, ConversionPreset, OutputFamily, OutputType};
pub use settings::SettingsLookup;
pub use tools::{SystemToolRunner, Tool, ToolInvocation, ToolRunner};
pub use transform::{CanvasSize, PipelineOutput, TransformPipeline, TransformSequence};

/// Initialize the library's logging.
/// Call this once at application startup if you want to see logs.
pub fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
}
