//! Encoder invoker - one external FFmpeg run per call
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::policy::EncodeOptions;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use studiokit_config::{TranscoderConfig, DEFAULT_ENCODE_TIMEOUT_SECS};
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Number of trailing stderr lines kept on failure
const STDERR_TAIL_LINES: usize = 20;

/// Errors from a single encoder run
#[derive(Error, Debug)]
pub enum EncodeError {
    /// The encoder process could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// No encoder slot could be obtained
    #[error("Encoder scheduling failed: {0}")]
    Scheduling(String),

    /// The encoder ran and reported failure
    #[error("Encoder exited with {status}: {stderr}")]
    Process { status: ExitStatus, stderr: String },

    #[error("Encoder timed out after {0:?}")]
    TimedOut(Duration),

    #[error("I/O error waiting for encoder: {0}")]
    Wait(#[source] std::io::Error),
}

/// Runs one encode of `input` into `output`
///
/// Implementations never retry; a success only means the run finished, callers
/// still have to check the output file.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        options: &EncodeOptions,
    ) -> Result<(), EncodeError>;
}

/// Command-line FFmpeg encoder
///
/// Every run is bounded by a timeout, and a shared semaphore caps how many
/// FFmpeg processes run at once across all clones.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
    leading_args: Vec<OsString>,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_ENCODE_TIMEOUT_SECS),
            permits: Arc::new(Semaphore::new(parallelism)),
        }
    }

    pub fn from_config(config: &TranscoderConfig) -> Self {
        Self::new(&config.ffmpeg_path)
            .with_timeout(config.encode_timeout())
            .with_max_concurrent(config.max_concurrent_encodes)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max_concurrent.max(1)));
        self
    }

    /// Arguments placed before the generated ones, e.g. when `program` is a
    /// wrapper such as `nice` or a shell running a script
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Build the FFmpeg argument list for one (input, output, options) triple
    pub fn build_args(input: &Path, output: &Path, options: &EncodeOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-y".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
        ];
        args.extend(options.args().iter().map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }

    /// Check if FFmpeg can be executed
    pub async fn is_available(&self) -> bool {
        match Command::new(&self.program)
            .args(&self.leading_args)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    fn command_line(&self, args: &[OsString]) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.leading_args.iter().map(OsString::as_os_str))
            .chain(args.iter().map(OsString::as_os_str))
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        options: &EncodeOptions,
    ) -> Result<(), EncodeError> {
        let args = Self::build_args(input, output, options);
        let command_line = self.command_line(&args);

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| EncodeError::Scheduling(e.to_string()))?;

        info!(command = %command_line, "Running FFmpeg");
        let started = Instant::now();

        let child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EncodeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let finished = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(finished)) => finished,
            Ok(Err(e)) => return Err(EncodeError::Wait(e)),
            Err(_) => {
                warn!(
                    output = %output.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "FFmpeg timed out, process killed"
                );
                return Err(EncodeError::TimedOut(self.timeout));
            }
        };

        if !finished.status.success() {
            let stderr = stderr_tail(&finished.stderr);
            warn!(
                status = %finished.status,
                output = %output.display(),
                stderr = %stderr,
                "FFmpeg failed"
            );
            return Err(EncodeError::Process {
                status: finished.status,
                stderr,
            });
        }

        debug!(
            output = %output.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "FFmpeg finished"
        );
        Ok(())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
