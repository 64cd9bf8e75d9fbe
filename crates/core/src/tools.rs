//! External conversion tools: LibreOffice, FFmpeg, ImageMagick and cdparanoia.
//!
//! Strategies describe what to run as a [`ToolInvocation`]; a [`ToolRunner`]
//! executes it. [`SystemToolRunner`] spawns the real binaries, polls them so
//! cancellation and timeouts can interrupt the process, and captures stderr
//! for diagnostics.

use crate::config::ToolsConfig;
use crate::error::{ConversionError, Result};
use crate::job::CancelToken;
use std::ffi::OsString;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How often a running tool is checked for exit, cancellation and timeout.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Longest stderr excerpt kept in an error message.
const MAX_STDERR_LEN: usize = 2048;

/// An external program a strategy delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    LibreOffice,
    Ffmpeg,
    ImageMagick,
    Cdparanoia,
}

impl Tool {
    pub fn display_name(self) -> &'static str {
        match self {
            Tool::LibreOffice => "LibreOffice",
            Tool::Ffmpeg => "FFmpeg",
            Tool::ImageMagick => "ImageMagick",
            Tool::Cdparanoia => "cdparanoia",
        }
    }

    /// Binary names searched in PATH, in order.
    fn binary_names(self) -> &'static [&'static str] {
        match self {
            Tool::LibreOffice => &["soffice", "libreoffice"],
            Tool::Ffmpeg => &["ffmpeg"],
            Tool::ImageMagick => &["magick", "convert"],
            Tool::Cdparanoia => &["cdparanoia"],
        }
    }

    /// Install locations checked before PATH.
    fn well_known_paths(self) -> &'static [&'static str] {
        match self {
            Tool::LibreOffice => &[
                // macOS
                "/Applications/LibreOffice.app/Contents/MacOS/soffice",
                // Linux
                "/usr/bin/soffice",
                "/usr/lib/libreoffice/program/soffice",
                "/opt/libreoffice/program/soffice",
                // Snap (Ubuntu)
                "/snap/bin/libreoffice.soffice",
            ],
            _ => &[],
        }
    }

    fn configured_path(self, config: &ToolsConfig) -> Option<&PathBuf> {
        match self {
            Tool::LibreOffice => config.libreoffice_path.as_ref(),
            Tool::Ffmpeg => config.ffmpeg_path.as_ref(),
            Tool::ImageMagick => config.imagemagick_path.as_ref(),
            Tool::Cdparanoia => config.cdparanoia_path.as_ref(),
        }
    }
}

/// One run of an external tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool: Tool,
    pub args: Vec<OsString>,
    /// File the run is about, for diagnostics.
    pub input: PathBuf,
    /// Whether the process may be killed when the job is canceled.
    pub interruptible: bool,
}

impl ToolInvocation {
    pub fn new(tool: Tool, input: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            args: Vec::new(),
            input: input.into(),
            interruptible: true,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn interruptible(mut self, interruptible: bool) -> Self {
        self.interruptible = interruptible;
        self
    }

    /// Arguments as lossy strings, for logging and assertions.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Executes tool invocations on behalf of a job.
pub trait ToolRunner: Send + Sync {
    /// Run the invocation to completion.
    ///
    /// Interruptible invocations return [`ConversionError::Canceled`] when
    /// `cancel` fires while they run.
    fn run(&self, invocation: &ToolInvocation, cancel: &CancelToken) -> Result<()>;
}

/// Finds tool binaries on this machine.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    config: ToolsConfig,
}

impl ToolLocator {
    pub fn new(config: ToolsConfig) -> Self {
        Self { config }
    }

    /// Resolve the binary for `tool`.
    ///
    /// An explicitly configured path must exist; otherwise well-known install
    /// locations are tried before PATH.
    pub fn locate(&self, tool: Tool) -> Result<PathBuf> {
        if let Some(path) = tool.configured_path(&self.config) {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(ConversionError::EngineNotFound(tool.display_name()));
        }

        for candidate in tool.well_known_paths() {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Ok(path);
            }
        }

        tool.binary_names()
            .iter()
            .find_map(|name| which::which(name).ok())
            .ok_or(ConversionError::EngineNotFound(tool.display_name()))
    }
}

/// Runs tools as child processes.
#[derive(Debug, Clone)]
pub struct SystemToolRunner {
    locator: ToolLocator,
    timeout: Duration,
}

impl SystemToolRunner {
    pub fn new(config: ToolsConfig) -> Self {
        let timeout = config.tool_timeout;
        Self {
            locator: ToolLocator::new(config),
            timeout,
        }
    }
}

impl Default for SystemToolRunner {
    fn default() -> Self {
        Self::new(ToolsConfig::default())
    }
}

impl ToolRunner for SystemToolRunner {
    fn run(&self, invocation: &ToolInvocation, cancel: &CancelToken) -> Result<()> {
        let tool = invocation.tool;
        let program = self.locator.locate(tool)?;
        let start = Instant::now();

        info!("Running {} on {:?}", tool.display_name(), invocation.input);
        debug!("{:?} {:?}", program, invocation.args_lossy());

        // stderr goes to a file so a chatty tool can never block on a full pipe.
        let mut stderr_log = tempfile::tempfile()?;
        let mut child = Command::new(&program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr_log.try_clone()?)
            .spawn()
            .map_err(|e| ConversionError::EngineFailed {
                tool: tool.display_name(),
                message: format!("failed to start {:?}: {}", program, e),
            })?;

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if invocation.interruptible && cancel.is_canceled() {
                info!("Canceling {} on {:?}", tool.display_name(), invocation.input);
                terminate(&mut child);
                return Err(ConversionError::Canceled);
            }
            if start.elapsed() >= self.timeout {
                terminate(&mut child);
                return Err(ConversionError::Timeout {
                    tool: tool.display_name(),
                    path: invocation.input.clone(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            let stderr = read_log(&mut stderr_log);
            error!(
                "{} failed for {:?} ({}): {}",
                tool.display_name(),
                invocation.input,
                status,
                stderr
            );
            return Err(ConversionError::EngineFailed {
                tool: tool.display_name(),
                message: if stderr.is_empty() {
                    status.to_string()
                } else {
                    stderr
                },
            });
        }

        debug!(
            "{} finished {:?} in {:?}",
            tool.display_name(),
            invocation.input.file_name(),
            start.elapsed()
        );
        Ok(())
    }
}

fn terminate(child: &mut std::process::Child) {
    if let Err(e) = child.kill() {
        warn!("Failed to kill tool process {}: {}", child.id(), e);
    }
    let _ = child.wait();
}

fn read_log(log: &mut std::fs::File) -> String {
    let mut text = String::new();
    if log.seek(SeekFrom::Start(0)).is_ok() {
        let _ = log.read_to_string(&mut text);
    }
    let text = text.trim();
    match text.char_indices().nth(MAX_STDERR_LEN) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// Find the single file with `extension` that a tool wrote into `dir`.
///
/// Tools such as LibreOffice pick the output name themselves; the expected
/// name is tried first, then any file with the right extension.
pub fn find_output(dir: &Path, expected: &Path, extension: &str) -> Option<PathBuf> {
    if expected.exists() {
        return Some(expected.to_path_buf());
    }
    std::fs::read_dir(dir).ok().and_then(|entries| {
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .find(|p| {
                p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case(extension))
                    .unwrap_or(false)
            })
    })
}
