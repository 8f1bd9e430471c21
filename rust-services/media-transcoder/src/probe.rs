//! FFprobe inspection of produced files
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


use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to run ffprobe: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("ffprobe failed: {0}")]
    Failed(String),

    #[error("ffprobe timed out after {0:?}")]
    TimedOut(Duration),

    #[error("ffprobe JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Container and stream summary of a media file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProbeReport {
    pub format: FormatInfo,
    #[serde(default)]
    pub streams: Vec<StreamInfo>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormatInfo {
    #[serde(default)]
    pub format_name: String,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamInfo {
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ProbeReport {
    pub fn parse(json: &str) -> Result<Self, ProbeError> {
        Ok(serde_json::from_str(json)?)
    }

    fn codec_of(&self, codec_type: &str) -> Option<&str> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(codec_type))
            .and_then(|s| s.codec_name.as_deref())
    }

    /// Codec of the first video stream
    pub fn video_codec(&self) -> Option<&str> {
        self.codec_of("video")
    }

    /// Codec of the first audio stream
    pub fn audio_codec(&self) -> Option<&str> {
        self.codec_of("audio")
    }

    /// ffprobe reports MP4 as part of the `mov,mp4,m4a,...` demuxer family
    pub fn is_mp4(&self) -> bool {
        self.format.format_name.split(',').any(|f| f == "mp4")
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.format.duration.as_deref().and_then(|d| d.parse().ok())
    }
}

/// Probe `path` with the given ffprobe binary
pub async fn probe(ffprobe: &Path, path: &Path) -> Result<ProbeReport, ProbeError> {
    let child = Command::new(ffprobe)
        .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let output = tokio::time::timeout(PROBE_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| ProbeError::TimedOut(PROBE_TIMEOUT))??;

    if !output.status.success() {
        return Err(ProbeError::Failed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    ProbeReport::parse(&String::from_utf8_lossy(&output.stdout))
}
