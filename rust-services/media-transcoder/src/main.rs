//! Media Transcoder
//!
//! Operator tool around the transcode pipeline:
//! - Transcodes a stored upload into its web-playable rendition
//! - Converts a recorded WebM export into MP4
//! - Probes files and checks that FFmpeg is usable
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


use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use media_transcoder::{probe, MediaPipeline};
use std::path::{Path, PathBuf};
use studiokit_config::TranscoderConfig;
use studiokit_logging::LogFormat;
use studiokit_types::{AssetRecord, ExportRequest, UploadedMedia};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "media-transcoder")]
#[command(author, version, about = "Web-playable media transcoding")]
struct Cli {
    /// Log output format (console or json)
    #[arg(long, global = true, env = "LOG_FORMAT", default_value = "console")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcode a stored upload and print its asset record as JSON
    Transcode {
        /// Stored upload, relative to the uploads directory unless absolute
        path: PathBuf,

        /// MIME type the client declared
        #[arg(long)]
        mime: String,

        /// Original filename (defaults to the stored file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Convert a WebM recording to MP4
    Export {
        input: PathBuf,
        output: PathBuf,
    },

    /// Print container and stream codecs of a media file
    Probe { file: PathBuf },

    /// Check that FFmpeg can be executed
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = TranscoderConfig::from_env().context("Failed to load configuration")?;

    studiokit_logging::init("media-transcoder", config.log_level(), cli.log_format);

    let pipeline = MediaPipeline::from_config(&config);

    match cli.command {
        Commands::Transcode { path, mime, name } => {
            transcode(&pipeline, &config, &path, mime, name).await
        }
        Commands::Export { input, output } => export(&pipeline, &input, &output).await,
        Commands::Probe { file } => {
            let report = probe::probe(&config.ffprobe_path, &file).await?;
            println!("format: {}", report.format.format_name);
            println!("video:  {}", report.video_codec().unwrap_or("-"));
            println!("audio:  {}", report.audio_codec().unwrap_or("-"));
            Ok(())
        }
        Commands::Check => {
            let encoder = media_transcoder::FfmpegEncoder::from_config(&config);
            if encoder.is_available().await {
                info!(ffmpeg = %encoder.program().display(), "FFmpeg is available");
                Ok(())
            } else {
                error!(ffmpeg = %encoder.program().display(), "FFmpeg is not available");
                anyhow::bail!("FFmpeg not found at {}", encoder.program().display())
            }
        }
    }
}

async fn transcode(
    pipeline: &MediaPipeline,
    config: &TranscoderConfig,
    path: &Path,
    mime: String,
    name: Option<String>,
) -> Result<()> {
    let stored_path = config.uploads_dir.join(path);
    let size_bytes = tokio::fs::metadata(&stored_path)
        .await
        .with_context(|| format!("Cannot read upload {}", stored_path.display()))?
        .len();
    let original_filename = name.unwrap_or_else(|| file_name(&stored_path));

    let upload = UploadedMedia::new(stored_path, original_filename, mime, size_bytes);
    let outcome = pipeline.transcoder.transcode(&upload).await?;
    let record = AssetRecord::from_outcome(&upload, &outcome);

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn export(pipeline: &MediaPipeline, input: &Path, output: &Path) -> Result<()> {
    let data = tokio::fs::read(input)
        .await
        .with_context(|| format!("Cannot read {}", input.display()))?;
    let mime_type = match input.extension().and_then(|e| e.to_str()) {
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    };

    let request = ExportRequest::new(file_name(input), mime_type, data);
    let response = pipeline.exporter.export(&request).await?;

    tokio::fs::write(output, &response.body)
        .await
        .with_context(|| format!("Cannot write {}", output.display()))?;
    info!(
        output = %output.display(),
        bytes = response.body.len(),
        "Export written"
    );
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
