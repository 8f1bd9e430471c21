//! Export orchestrator - converts recorded WebM buffers to MP4 in memory
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


use crate::encoder::{EncodeError, Encoder};
use crate::policy;
use crate::scratch::{unique_stem, ScratchFile};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use studiokit_types::{ExportRequest, ExportResponse, StudiokitError};
use thiserror::Error;
use tracing::{error, info};

/// Prefix of every scratch file written by an export
pub const EXPORT_PREFIX: &str = "export";

/// Export failures; there is no degraded result for an export
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Rejected(#[from] StudiokitError),

    #[error("Failed to {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Export conversion failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("FFmpeg did not produce output file {0}")]
    MissingOutput(PathBuf),
}

impl ExportError {
    fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| ExportError::Io { context, source }
    }
}

/// Converts project exports using scratch files under `temp_dir`
#[derive(Clone)]
pub struct Exporter {
    encoder: Arc<dyn Encoder>,
    temp_dir: PathBuf,
}

impl Exporter {
    pub fn new(encoder: Arc<dyn Encoder>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            encoder,
            temp_dir: temp_dir.into(),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Validate an export request and convert it
    pub async fn export(&self, request: &ExportRequest) -> Result<ExportResponse, ExportError> {
        request.validate()?;
        let body = self.convert_webm_to_mp4(&request.data).await?;
        Ok(ExportResponse::new(body))
    }

    /// Convert a WebM buffer into an MP4 buffer (H.264/AAC, fast-start)
    ///
    /// Both scratch files are removed before this returns, whatever the result.
    pub async fn convert_webm_to_mp4(&self, webm: &[u8]) -> Result<Vec<u8>, ExportError> {
        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .map_err(ExportError::io("create export temp directory"))?;

        let stem = unique_stem(EXPORT_PREFIX);
        let input = ScratchFile::new(self.temp_dir.join(format!("{}.webm", stem)));
        let output = ScratchFile::new(self.temp_dir.join(format!("{}.mp4", stem)));

        let result = self.convert(webm, input.path(), output.path()).await;
        match &result {
            Ok(mp4) => info!(
                input_bytes = webm.len(),
                output_bytes = mp4.len(),
                "Export conversion completed"
            ),
            Err(e) => error!(error = %e, "Export conversion failed"),
        }
        result
    }

    async fn convert(&self, webm: &[u8], input: &Path, output: &Path) -> Result<Vec<u8>, ExportError> {
        tokio::fs::write(input, webm)
            .await
            .map_err(ExportError::io("write export input"))?;

        self.encoder
            .encode(input, output, &policy::export_options())
            .await?;

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Err(ExportError::MissingOutput(output.to_path_buf())),
        }

        tokio::fs::read(output)
            .await
            .map_err(ExportError::io("read export output"))
    }
}
