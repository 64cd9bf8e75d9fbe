//! Picks the conversion strategy for an input file and preset.

use crate::category::{category_of, extension_of, normalize_extension, InputCategory};
use crate::job::{ConversionJob, JobEnvironment};
use crate::jobs::{Strategy, StrategyKind};
use crate::preset::{ConversionPreset, OutputType};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// What a rule sees: the normalized input extension and the requested output.
struct DispatchInput<'a> {
    extension: &'a str,
    output: Option<OutputType>,
}

type Predicate = fn(&DispatchInput<'_>) -> bool;

/// Dispatch rules, evaluated top to bottom. The first match wins.
const RULES: &[(&str, Predicate, StrategyKind)] = &[
    ("cd audio track", |i| i.extension == "cda", StrategyKind::CdaExtract),
    (
        "office document",
        |i| matches!(i.extension, "docx" | "odt" | "doc"),
        StrategyKind::OfficeDocument,
    ),
    (
        "spreadsheet",
        |i| matches!(i.extension, "xlsx" | "ods" | "xls"),
        StrategyKind::Spreadsheet,
    ),
    (
        "slideshow",
        |i| matches!(i.extension, "pptx" | "odp" | "ppt"),
        StrategyKind::Slideshow,
    ),
    ("ico output", |i| i.output == Some(OutputType::Ico), StrategyKind::IcoEncode),
    ("gif output", |i| i.output == Some(OutputType::Gif), StrategyKind::GifEncode),
    ("pdf output", |i| i.output == Some(OutputType::Pdf), StrategyKind::RasterToPdf),
    (
        "svg to png",
        |i| i.extension == "svg" && i.output == Some(OutputType::Png),
        StrategyKind::VectorRasterize,
    ),
    (
        "image or document input",
        |i| {
            matches!(
                category_of(i.extension),
                InputCategory::Image | InputCategory::Document
            )
        },
        StrategyKind::GenericRaster,
    ),
];

/// Chooses strategies and builds jobs around them.
pub struct JobDispatcher;

impl JobDispatcher {
    /// Strategy for an input extension (dot and case insensitive) and output.
    ///
    /// Never fails: inputs no rule claims go to the generic media strategy.
    pub fn select(extension: &str, output: Option<OutputType>) -> StrategyKind {
        let extension = normalize_extension(extension);
        let input = DispatchInput {
            extension: &extension,
            output,
        };
        let (rule, kind) = RULES
            .iter()
            .find(|(_, matches, _)| matches(&input))
            .map(|(name, _, kind)| (*name, *kind))
            .unwrap_or(("fallback", StrategyKind::GenericMedia));
        debug!(
            "Dispatching .{} -> {:?} as {:?} (rule: {})",
            extension, output, kind, rule
        );
        kind
    }

    /// Build a job for `input_path` with the default environment.
    ///
    /// A missing preset still yields a job; it fails during initialization.
    pub fn create(preset: Option<Arc<ConversionPreset>>, input_path: &Path) -> ConversionJob {
        Self::create_with_env(preset, input_path, JobEnvironment::default())
    }

    /// Build a job that runs with `env`.
    pub fn create_with_env(
        preset: Option<Arc<ConversionPreset>>,
        input_path: &Path,
        env: JobEnvironment,
    ) -> ConversionJob {
        let output = preset.as_ref().map(|p| p.output_type);
        let kind = Self::select(&extension_of(input_path), output);
        let strategy = Strategy::new(kind, input_path);
        ConversionJob::new(preset, input_path, strategy, env)
    }
}
