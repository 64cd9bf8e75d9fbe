//! Conversion job lifecycle.
//!
//! A [`ConversionJob`] pairs one input file with a preset and the strategy the
//! dispatcher picked for it. The job owns the lifecycle: it validates during
//! [`ConversionJob::initialize`], runs the strategy once in
//! [`ConversionJob::convert`], and records the outcome. Errors never escape
//! the job; callers inspect [`ConversionJob::state`] and
//! [`ConversionJob::error`].

use crate::category::normalize_extension;
use crate::config::{ConverterConfig, RenderConfig, ToolsConfig};
use crate::error::{ConversionError, Result};
use crate::jobs::{JobStrategy, Strategy, StrategyKind};
use crate::preset::ConversionPreset;
use crate::settings::SettingsLookup;
use crate::tools::{SystemToolRunner, ToolInvocation, ToolRunner};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionState {
    NotStarted,
    Initializing,
    Converting,
    Done,
    Failed,
    Canceled,
}

impl ConversionState {
    /// Whether the job can no longer change state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConversionState::Done | ConversionState::Failed | ConversionState::Canceled
        )
    }
}

impl fmt::Display for ConversionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Progress labels shown to users.
pub mod labels {
    pub const READING_DOCUMENT: &str = "Reading document";
    pub const RENDERING: &str = "Rendering";
    pub const ENCODING: &str = "Encoding";
    pub const CONVERTING: &str = "Converting";
    pub const EXTRACTING_TRACK: &str = "Extracting track";
    pub const DONE: &str = "Done";
    pub const FAILED: &str = "Failed";
    pub const CANCELED: &str = "Canceled";
}

/// Cooperative cancellation flag shared between a job and its callers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives job progress as it happens.
pub trait ProgressSink: Send + Sync {
    /// The job entered a new lifecycle state.
    fn on_state_changed(&self, job_id: Uuid, state: ConversionState);

    /// The job's user-facing label changed.
    fn on_user_state(&self, _job_id: Uuid, _label: &str) {}
}

/// Everything a strategy needs besides the file and preset.
#[derive(Clone)]
pub struct JobEnvironment {
    pub tool_runner: Arc<dyn ToolRunner>,
    pub render: RenderConfig,
    pub tools: ToolsConfig,
}

impl JobEnvironment {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            tool_runner: Arc::new(SystemToolRunner::new(config.tools.clone())),
            render: config.render.clone(),
            tools: config.tools.clone(),
        }
    }

    /// Replace the tool runner, e.g. with a sandboxed or recording one.
    pub fn with_tool_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.tool_runner = runner;
        self
    }
}

impl Default for JobEnvironment {
    fn default() -> Self {
        Self::new(&ConverterConfig::default())
    }
}

impl fmt::Debug for JobEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobEnvironment")
            .field("render", &self.render)
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

/// The job's current user-facing label, forwarded to the progress sink.
struct UserState {
    job_id: Uuid,
    label: String,
    sink: Option<Arc<dyn ProgressSink>>,
}

impl UserState {
    fn set(&mut self, label: &str) {
        if self.label == label {
            return;
        }
        self.label = label.to_string();
        if let Some(sink) = &self.sink {
            sink.on_user_state(self.job_id, label);
        }
    }
}

/// View of a job handed to its strategy.
pub struct JobContext<'a> {
    input_path: &'a Path,
    preset: &'a ConversionPreset,
    env: &'a JobEnvironment,
    cancel: &'a CancelToken,
    user_state: &'a mut UserState,
}

impl<'a> JobContext<'a> {
    pub fn input_path(&self) -> &Path {
        self.input_path
    }

    /// Normalized input extension.
    pub fn input_extension(&self) -> String {
        crate::category::extension_of(self.input_path)
    }

    pub fn preset(&self) -> &ConversionPreset {
        self.preset
    }

    pub fn settings(&self) -> SettingsLookup<'a> {
        SettingsLookup::new(self.preset)
    }

    pub fn render_config(&self) -> &RenderConfig {
        &self.env.render
    }

    pub fn tools_config(&self) -> &ToolsConfig {
        &self.env.tools
    }

    pub fn cancel_token(&self) -> &CancelToken {
        self.cancel
    }

    pub fn set_user_state(&mut self, label: &str) {
        self.user_state.set(label);
    }

    /// Run an external tool with this job's cancel token.
    pub fn run_tool(&self, invocation: &ToolInvocation) -> Result<()> {
        self.env.tool_runner.run(invocation, self.cancel)
    }

    /// Fail with [`ConversionError::Canceled`] if cancellation was requested.
    pub fn check_canceled(&self) -> Result<()> {
        if self.cancel.is_canceled() {
            return Err(ConversionError::Canceled);
        }
        Ok(())
    }

    /// Directory outputs are written to, created on demand.
    pub fn output_directory(&self) -> Result<PathBuf> {
        let dir = output_directory(self.preset, self.input_path);
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| ConversionError::OutputDirError {
                path: dir.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(dir)
    }

    /// Path of the single output file.
    ///
    /// Fails with [`ConversionError::OutputDirError`] when that path is the
    /// input file, so a same-format conversion never replaces its source.
    pub fn output_path(&self) -> Result<PathBuf> {
        let path = self.output_directory()?.join(output_file_name(
            self.input_path,
            self.preset.output_type.extension(),
            None,
        ));
        self.ensure_not_input(path)
    }

    /// Path of page `page` (1-based) of a multi-page output.
    pub fn page_output_path(&self, page: usize) -> Result<PathBuf> {
        let path = self.output_directory()?.join(output_file_name(
            self.input_path,
            self.preset.output_type.extension(),
            Some(page),
        ));
        self.ensure_not_input(path)
    }

    fn ensure_not_input(&self, path: PathBuf) -> Result<PathBuf> {
        if is_same_file(&path, self.input_path) {
            return Err(ConversionError::OutputDirError {
                path,
                message: "output would overwrite the input file; set an output directory"
                    .to_string(),
            });
        }
        Ok(path)
    }

    /// Scratch directory for intermediate files, removed on drop.
    pub fn scratch_dir(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("file-converter-");
        let dir = match &self.env.tools.temp_dir {
            Some(base) => builder.tempdir_in(base)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}

/// Directory outputs of `input` go to under `preset`.
pub fn output_directory(preset: &ConversionPreset, input: &Path) -> PathBuf {
    preset
        .output_directory
        .clone()
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default()
}

/// Whether `a` and `b` name the same file, after resolving links and `..`.
///
/// A path that does not exist yet cannot be an existing input.
fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// `<stem>.<ext>`, or `<stem>_page_NNNN.<ext>` for a page of a multi-page output.
pub fn output_file_name(input: &Path, extension: &str, page: Option<usize>) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let extension = normalize_extension(extension);
    match page {
        Some(page) => format!("{}_page_{:04}.{}", stem, page, extension),
        None => format!("{}.{}", stem, extension),
    }
}

/// One file converted with one preset.
pub struct ConversionJob {
    id: Uuid,
    input_path: PathBuf,
    preset: Option<Arc<ConversionPreset>>,
    strategy: Strategy,
    env: JobEnvironment,
    state: ConversionState,
    user_state: UserState,
    cancel: CancelToken,
    error: Option<ConversionError>,
    output_paths: Vec<PathBuf>,
}

impl fmt::Debug for ConversionJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionJob")
            .field("id", &self.id)
            .field("input_path", &self.input_path)
            .field("strategy", &self.strategy.kind())
            .field("state", &self.state)
            .field("user_state", &self.user_state.label)
            .field("error", &self.error)
            .finish()
    }
}

impl ConversionJob {
    /// Build a job around an already chosen strategy.
    ///
    /// Most callers go through [`crate::JobDispatcher`] instead.
    pub fn new(
        preset: Option<Arc<ConversionPreset>>,
        input_path: impl Into<PathBuf>,
        strategy: Strategy,
        env: JobEnvironment,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            input_path: input_path.into(),
            preset,
            strategy,
            env,
            state: ConversionState::NotStarted,
            user_state: UserState {
                job_id: id,
                label: String::new(),
                sink: None,
            },
            cancel: CancelToken::new(),
            error: None,
            output_paths: Vec::new(),
        }
    }

    /// Report state and label changes to `sink`.
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.user_state.sink = Some(sink);
        self
    }

    /// Share an existing cancel token, e.g. one covering a whole batch.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn preset(&self) -> Option<&Arc<ConversionPreset>> {
        self.preset.as_ref()
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn state(&self) -> ConversionState {
        self.state
    }

    pub fn user_state(&self) -> &str {
        &self.user_state.label
    }

    /// Diagnostic recorded when the job failed.
    pub fn error(&self) -> Option<&ConversionError> {
        self.error.as_ref()
    }

    pub fn output_paths(&self) -> &[PathBuf] {
        &self.output_paths
    }

    pub fn is_cancelable(&self) -> bool {
        self.strategy.is_cancelable()
    }

    pub fn output_files_count(&self) -> usize {
        self.strategy.output_files_count()
    }

    /// Handle that cancels this job from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cancellation.
    ///
    /// Honored before conversion starts and by cancelable strategies while
    /// they run. Non-cancelable conversions finish normally.
    pub fn cancel(&self) {
        if self.state == ConversionState::Converting && !self.is_cancelable() {
            debug!(
                "Job {} cannot be canceled while converting; it will run to completion",
                self.id
            );
        }
        self.cancel.cancel();
    }

    /// Validate the preset and prepare the strategy.
    pub fn initialize(&mut self) -> ConversionState {
        let span = info_span!("job", id = %self.id, input = %self.input_path.display());
        let _enter = span.enter();

        if self.state != ConversionState::NotStarted {
            warn!("Ignoring initialize: job is already {}", self.state);
            return self.state;
        }
        self.set_state(ConversionState::Initializing);

        if let Err(e) = self.try_initialize() {
            self.fail(e);
        }
        self.state
    }

    fn try_initialize(&mut self) -> Result<()> {
        let preset = self.preset.clone().ok_or_else(|| {
            ConversionError::InvalidPreset("The conversion preset must be valid.".to_string())
        })?;
        preset.validate()?;

        let mut context = JobContext {
            input_path: &self.input_path,
            preset: &preset,
            env: &self.env,
            cancel: &self.cancel,
            user_state: &mut self.user_state,
        };
        self.strategy.initialize(&mut context)
    }

    /// Run the conversion once.
    pub fn convert(&mut self) -> ConversionState {
        let span = info_span!("job", id = %self.id, input = %self.input_path.display());
        let _enter = span.enter();

        match self.state {
            ConversionState::Initializing => {}
            ConversionState::NotStarted => {
                self.fail(ConversionError::InvalidState {
                    operation: "convert",
                    state: ConversionState::NotStarted,
                });
                return self.state;
            }
            state => {
                warn!(
                    "{}",
                    ConversionError::InvalidState {
                        operation: "convert",
                        state,
                    }
                );
                return self.state;
            }
        }

        if self.cancel.is_canceled() {
            info!("Job canceled before conversion started");
            self.finish_canceled();
            return self.state;
        }

        let Some(preset) = self.preset.clone() else {
            self.fail(ConversionError::InvalidPreset(
                "The conversion preset must be valid.".to_string(),
            ));
            return self.state;
        };

        let start = Instant::now();
        info!(
            "Converting {:?} to {} ({:?})",
            self.input_path.file_name(),
            preset.output_type,
            self.strategy.kind()
        );
        self.set_state(ConversionState::Converting);

        let mut context = JobContext {
            input_path: &self.input_path,
            preset: &preset,
            env: &self.env,
            cancel: &self.cancel,
            user_state: &mut self.user_state,
        };
        match self.strategy.convert(&mut context) {
            Ok(outputs) => {
                info!(
                    "Converted {:?} into {} file(s) in {:?}",
                    self.input_path.file_name(),
                    outputs.len(),
                    start.elapsed()
                );
                self.output_paths = outputs;
                self.user_state.set(labels::DONE);
                self.set_state(ConversionState::Done);
            }
            Err(ConversionError::Canceled) if self.strategy.is_cancelable() => {
                info!("Job canceled after {:?}", start.elapsed());
                self.finish_canceled();
            }
            Err(e) => self.fail(e),
        }
        self.state
    }

    /// Initialize, then convert if initialization succeeded.
    pub fn run(&mut self) -> ConversionState {
        if self.initialize() == ConversionState::Failed {
            return self.state;
        }
        self.convert()
    }

    fn set_state(&mut self, state: ConversionState) {
        self.state = state;
        if let Some(sink) = &self.user_state.sink {
            sink.on_state_changed(self.id, state);
        }
    }

    fn fail(&mut self, error: ConversionError) {
        error!("Conversion of {:?} failed: {}", self.input_path, error);
        self.error = Some(error);
        self.user_state.set(labels::FAILED);
        self.set_state(ConversionState::Failed);
    }

    fn finish_canceled(&mut self) {
        self.user_state.set(labels::CANCELED);
        self.set_state(ConversionState::Canceled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::{keys, OutputType};
    use crate::tools::testing::RecordingRunner;
    use std::sync::Mutex;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="32" height="32">
        <rect width="32" height="32" fill="#00ff00"/>
    </svg>"##;

    #[derive(Default)]
    struct RecordingSink {
        states: Mutex<Vec<ConversionState>>,
        labels: Mutex<Vec<String>>,
    }

    impl ProgressSink for RecordingSink {
        fn on_state_changed(&self, _job_id: Uuid, state: ConversionState) {
            self.states.lock().unwrap().push(state);
        }

        fn on_user_state(&self, _job_id: Uuid, label: &str) {
            self.labels.lock().unwrap().push(label.to_string());
        }
    }

    fn svg_job(dir: &Path, preset: Option<ConversionPreset>) -> ConversionJob {
        let input = dir.join("square.svg");
        std::fs::write(&input, SQUARE).unwrap();
        crate::JobDispatcher::create(preset.map(Arc::new), &input)
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConversionState::NotStarted.to_string(), "NotStarted");
        assert!(ConversionState::Canceled.is_terminal());
        assert!(!ConversionState::Converting.is_terminal());
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_canceled());
        clone.cancel();
        assert!(token.is_canceled());
    }

    #[test]
    fn test_output_file_names() {
        let input = Path::new("/data/Quarterly Report.docx");
        assert_eq!(output_file_name(input, "pdf", None), "Quarterly Report.pdf");
        assert_eq!(
            output_file_name(input, ".PNG", Some(3)),
            "Quarterly Report_page_0003.png"
        );
    }

    #[test]
    fn test_output_directory_defaults_to_input_dir() {
        let preset = ConversionPreset::new("p", OutputType::Png);
        assert_eq!(
            output_directory(&preset, Path::new("/data/in.svg")),
            PathBuf::from("/data")
        );
        let preset = preset.with_output_directory("/out");
        assert_eq!(
            output_directory(&preset, Path::new("/data/in.svg")),
            PathBuf::from("/out")
        );
    }

    #[test]
    fn test_same_file_resolves_relative_segments() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let input = dir.path().join("photo.png");
        std::fs::write(&input, b"png").unwrap();

        assert!(is_same_file(&input, &input));
        assert!(is_same_file(&dir.path().join("sub").join("..").join("photo.png"), &input));
        assert!(!is_same_file(&dir.path().join("photo.jpg"), &input));
        assert!(!is_same_file(&dir.path().join("sub").join("photo.png"), &input));
    }

    #[test]
    fn test_output_directory_aliasing_input_dir_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let input = dir.path().join("logo.png");
        image::RgbaImage::new(4, 4).save(&input).unwrap();
        let original = std::fs::read(&input).unwrap();

        let preset = ConversionPreset::new("Png", OutputType::Png)
            .with_setting(keys::IMAGE_SCALE, 2)
            .with_output_directory(dir.path().join("sub").join(".."));
        let mut job = crate::JobDispatcher::create(Some(Arc::new(preset)), &input);
        assert_eq!(job.run(), ConversionState::Failed);
        assert!(matches!(job.error(), Some(ConversionError::OutputDirError { .. })));
        assert_eq!(std::fs::read(&input).unwrap(), original);
    }

    #[test]
    fn test_missing_preset_fails_at_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = svg_job(dir.path(), None);

        assert_eq!(job.initialize(), ConversionState::Failed);
        assert!(matches!(job.error(), Some(ConversionError::InvalidPreset(_))));
        assert_eq!(job.user_state(), labels::FAILED);

        // Convert short-circuits and writes nothing.
        assert_eq!(job.convert(), ConversionState::Failed);
        assert!(!dir.path().join("square.png").exists());
        assert!(job.output_paths().is_empty());
    }

    #[test]
    fn test_svg_job_runs_to_done() {
        let dir = tempfile::tempdir().unwrap();
        let preset = ConversionPreset::new("Icon", OutputType::Png).with_setting(keys::IMAGE_SCALE, 2);
        let sink = Arc::new(RecordingSink::default());
        let mut job = svg_job(dir.path(), Some(preset)).with_progress_sink(sink.clone());

        assert_eq!(job.state(), ConversionState::NotStarted);
        assert_eq!(job.run(), ConversionState::Done);
        assert!(job.error().is_none());
        assert_eq!(job.output_files_count(), 1);

        let output = dir.path().join("square.png");
        assert_eq!(job.output_paths(), &[output.clone()]);
        let image = image::open(&output).unwrap();
        assert_eq!((image.width(), image.height()), (64, 64));

        assert_eq!(
            *sink.states.lock().unwrap(),
            vec![
                ConversionState::Initializing,
                ConversionState::Converting,
                ConversionState::Done
            ]
        );
        let labels_seen = sink.labels.lock().unwrap().clone();
        assert_eq!(labels_seen.first().map(String::as_str), Some(labels::READING_DOCUMENT));
        assert_eq!(labels_seen.last().map(String::as_str), Some(labels::DONE));
    }

    #[test]
    fn test_second_convert_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let preset = ConversionPreset::new("Icon", OutputType::Png);
        let mut job = svg_job(dir.path(), Some(preset));
        assert_eq!(job.run(), ConversionState::Done);

        let output = dir.path().join("square.png");
        std::fs::remove_file(&output).unwrap();

        assert_eq!(job.convert(), ConversionState::Done);
        assert!(!output.exists());
    }

    #[test]
    fn test_convert_before_initialize_fails() {
        let dir = tempfile::tempdir().unwrap();
        let preset = ConversionPreset::new("Icon", OutputType::Png);
        let mut job = svg_job(dir.path(), Some(preset));

        assert_eq!(job.convert(), ConversionState::Failed);
        assert!(matches!(
            job.error(),
            Some(ConversionError::InvalidState {
                operation: "convert",
                state: ConversionState::NotStarted
            })
        ));
    }

    #[test]
    fn test_cancel_before_convert() {
        let dir = tempfile::tempdir().unwrap();
        let preset = ConversionPreset::new("Icon", OutputType::Png);
        let mut job = svg_job(dir.path(), Some(preset));

        assert_eq!(job.initialize(), ConversionState::Initializing);
        job.cancel();
        assert_eq!(job.convert(), ConversionState::Canceled);
        assert_eq!(job.user_state(), labels::CANCELED);
        assert!(!dir.path().join("square.png").exists());
    }

    #[test]
    fn test_malformed_setting_fails_at_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let preset =
            ConversionPreset::new("Icon", OutputType::Png).with_setting(keys::IMAGE_ROTATION, "abc");
        let mut job = svg_job(dir.path(), Some(preset));

        assert_eq!(job.initialize(), ConversionState::Failed);
        assert!(matches!(job.error(), Some(ConversionError::InvalidPreset(_))));
    }

    #[test]
    fn test_cancelable_strategy_ends_canceled() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mkv");
        std::fs::write(&input, b"video").unwrap();

        let runner = Arc::new(RecordingRunner::writing_last_arg());
        let env = JobEnvironment::default().with_tool_runner(runner.clone());
        let preset = Arc::new(ConversionPreset::new("Audio", OutputType::Mp3));
        let mut job = crate::JobDispatcher::create_with_env(Some(preset), &input, env);
        assert!(job.is_cancelable());

        assert_eq!(job.initialize(), ConversionState::Initializing);
        let token = job.cancel_token();
        token.cancel();
        assert_eq!(job.convert(), ConversionState::Canceled);
        assert!(runner.recorded().is_empty());
    }

    #[test]
    fn test_tool_observes_cancel_mid_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("song.flac");
        std::fs::write(&input, b"audio").unwrap();

        let token = Arc::new(Mutex::new(None::<CancelToken>));
        let seen = token.clone();
        // Simulates a user canceling while the encoder runs.
        let runner = Arc::new(RecordingRunner::new(move |_| {
            if let Some(token) = seen.lock().unwrap().as_ref() {
                token.cancel();
            }
            Err(ConversionError::Canceled)
        }));
        let env = JobEnvironment::default().with_tool_runner(runner.clone());
        let preset = Arc::new(ConversionPreset::new("Audio", OutputType::Ogg));
        let mut job = crate::JobDispatcher::create_with_env(Some(preset), &input, env);
        *token.lock().unwrap() = Some(job.cancel_token());

        assert_eq!(job.run(), ConversionState::Canceled);
        assert_eq!(runner.recorded().len(), 1);
        assert!(job.error().is_none());
    }

    #[test]
    fn test_non_cancelable_strategy_keeps_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = svg_job(dir.path(), Some(ConversionPreset::new("Icon", OutputType::Png)));
        assert!(!job.is_cancelable());

        assert_eq!(job.initialize(), ConversionState::Initializing);
        assert_eq!(job.convert(), ConversionState::Done);
        // Cancel after the fact changes nothing.
        job.cancel();
        assert_eq!(job.state(), ConversionState::Done);
    }
}
