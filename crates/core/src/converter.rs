//! Batch driver that runs many conversion jobs concurrently.
//!
//! Each job runs start to finish on its own blocking worker; at most
//! `batch.concurrency` jobs are in flight. Jobs share the tool runner and
//! render settings but no mutable state.

use crate::config::{
    BatchResult, ConversionProgress, ConversionRequest, ConverterConfig, FailedFile, FileResult,
};
use crate::dispatcher::JobDispatcher;
use crate::error::Result;
use crate::job::{CancelToken, ConversionJob, ConversionState, JobEnvironment, ProgressSink};
use crate::preset::ConversionPreset;
use crate::tools::ToolRunner;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use uuid::Uuid;

/// Runs conversion jobs with a shared environment.
pub struct Converter {
    env: JobEnvironment,
    config: ConverterConfig,
}

impl Converter {
    /// Create a converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "Initializing converter with concurrency={}, dpi={}",
            config.batch.concurrency, config.render.dpi
        );
        Ok(Self {
            env: JobEnvironment::new(&config),
            config,
        })
    }

    /// Replace the runner used for external tools.
    pub fn with_tool_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.env = self.env.with_tool_runner(runner);
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Build a job for one file without running it.
    pub fn job(&self, preset: Option<Arc<ConversionPreset>>, input_path: &Path) -> ConversionJob {
        JobDispatcher::create_with_env(preset, input_path, self.env.clone())
    }

    /// Convert every request, reporting each job's state changes.
    pub async fn run_batch<F>(&self, requests: Vec<ConversionRequest>, progress: F) -> BatchResult
    where
        F: Fn(ConversionProgress) + Send + Sync + 'static,
    {
        self.run_batch_with_cancel(requests, CancelToken::new(), progress)
            .await
    }

    /// Like [`Converter::run_batch`], with a token that cancels the whole batch.
    ///
    /// Jobs that have not started yet end Canceled; running jobs stop if
    /// their strategy is cancelable.
    pub async fn run_batch_with_cancel<F>(
        &self,
        requests: Vec<ConversionRequest>,
        cancel: CancelToken,
        progress: F,
    ) -> BatchResult
    where
        F: Fn(ConversionProgress) + Send + Sync + 'static,
    {
        let start = Instant::now();
        let total_files = requests.len();
        let progress = Arc::new(progress);
        info!("Starting batch of {} file(s)", total_files);

        let mut outcomes: Vec<Outcome> = stream::iter(requests.into_iter().enumerate())
            .map(|(file_index, request)| {
                let sink = Arc::new(BatchSink {
                    file_index,
                    total_files,
                    current_file: file_name(&request.input_path),
                    callback: progress.clone(),
                });
                let mut job = self
                    .job(Some(request.preset), &request.input_path)
                    .with_cancel_token(cancel.clone())
                    .with_progress_sink(sink);
                let input_path = request.input_path;

                async move {
                    let job_start = Instant::now();
                    let result = tokio::task::spawn_blocking(move || {
                        job.run();
                        job
                    })
                    .await;
                    Outcome {
                        file_index,
                        input_path,
                        duration: job_start.elapsed(),
                        job: result.map_err(|e| e.to_string()),
                    }
                }
            })
            .buffer_unordered(self.config.batch.concurrency.max(1))
            .collect()
            .await;
        outcomes.sort_by_key(|o| o.file_index);

        let mut result = BatchResult {
            successful: Vec::new(),
            failed: Vec::new(),
            canceled: Vec::new(),
            total_duration: Duration::ZERO,
        };
        for outcome in outcomes {
            outcome.record(&mut result);
        }
        result.total_duration = start.elapsed();

        info!(
            "Batch finished: {} succeeded, {} failed, {} canceled in {:?}",
            result.successful.len(),
            result.failed.len(),
            result.canceled.len(),
            result.total_duration
        );
        result
    }
}

/// A finished job, or the panic message of its worker.
struct Outcome {
    file_index: usize,
    input_path: PathBuf,
    duration: Duration,
    job: std::result::Result<ConversionJob, String>,
}

impl Outcome {
    fn record(self, result: &mut BatchResult) {
        let job = match self.job {
            Ok(job) => job,
            Err(panic) => {
                error!("Worker for {:?} panicked: {}", self.input_path, panic);
                result.failed.push(FailedFile {
                    input_path: self.input_path,
                    error: panic,
                });
                return;
            }
        };

        match job.state() {
            ConversionState::Done => result.successful.push(FileResult {
                input_path: self.input_path,
                output_paths: job.output_paths().to_vec(),
                duration: self.duration,
            }),
            ConversionState::Canceled => result.canceled.push(self.input_path),
            state => result.failed.push(FailedFile {
                input_path: self.input_path,
                error: job
                    .error()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| format!("job ended in state {}", state)),
            }),
        }
    }
}

/// Turns job state changes into batch progress updates.
struct BatchSink<F> {
    file_index: usize,
    total_files: usize,
    current_file: String,
    callback: Arc<F>,
}

impl<F> ProgressSink for BatchSink<F>
where
    F: Fn(ConversionProgress) + Send + Sync,
{
    fn on_state_changed(&self, _job_id: Uuid, state: ConversionState) {
        (self.callback)(ConversionProgress {
            file_index: self.file_index,
            total_files: self.total_files,
            current_file: self.current_file.clone(),
            state,
        });
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}
