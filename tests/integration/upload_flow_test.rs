//! Integration Tests for the Upload and Export Flows
//!
//! These tests require FFmpeg installed and go through the configured
//! pipeline exactly as a service would.
//!
//! Run with: cargo test --test upload_flow_test -- --ignored

use media_transcoder::MediaPipeline;
use std::path::{Path, PathBuf};
use std::process::Command;
use studiokit_config::TranscoderConfig;
use studiokit_types::{AssetRecord, ExportRequest, MediaKind, UploadedMedia};
use tempfile::TempDir;

fn config_for(root: &Path) -> TranscoderConfig {
    TranscoderConfig {
        uploads_dir: root.join("uploads"),
        temp_dir: root.join("temp"),
        ffmpeg_path: PathBuf::from("ffmpeg"),
        ffprobe_path: PathBuf::from("ffprobe"),
        encode_timeout_secs: 120,
        max_concurrent_encodes: 2,
        log_level: None,
    }
}

fn lavfi(source: &str, extra: &[&str], output: &Path) -> bool {
    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-f", "lavfi", "-i", source])
        .args(extra)
        .arg(output)
        .status();
    matches!(status, Ok(s) if s.success())
}

#[tokio::test]
#[ignore] // Requires FFmpeg
async fn test_video_upload_becomes_mp4_asset() {
    let root = TempDir::new().unwrap();
    let config = config_for(root.path());
    std::fs::create_dir_all(&config.uploads_dir).unwrap();

    let stored = config.uploads_dir.join("1700000000000-screen.mkv");
    if !lavfi("testsrc=duration=1:size=160x120:rate=10", &["-c:v", "libx264"], &stored) {
        eprintln!("FFmpeg not available, skipping");
        return;
    }
    let size = std::fs::metadata(&stored).unwrap().len();
    let upload = UploadedMedia::new(&stored, "screen.mkv", "video/x-matroska", size);

    let pipeline = MediaPipeline::from_config(&config);
    let outcome = pipeline.transcoder.transcode(&upload).await.unwrap();
    let record = AssetRecord::from_outcome(&upload, &outcome);

    assert_eq!(record.kind, MediaKind::Video);
    assert_eq!(record.mime_type, "video/mp4");
    assert_eq!(record.url, "/uploads/1700000000000-screen.web.mp4");
    assert_eq!(record.name, "screen.mkv");
    assert!(!stored.exists());

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["type"], "video");
}

#[tokio::test]
#[ignore] // Requires FFmpeg
async fn test_export_request_round_trip() {
    let root = TempDir::new().unwrap();
    let config = config_for(root.path());

    let recording = root.path().join("recording.webm");
    if !lavfi("testsrc=duration=1:size=160x120:rate=10", &["-c:v", "libvpx"], &recording) {
        eprintln!("FFmpeg not available, skipping");
        return;
    }

    let pipeline = MediaPipeline::from_config(&config);
    let request = ExportRequest::new("recording.webm", "video/webm", std::fs::read(&recording).unwrap());
    let response = pipeline.exporter.export(&request).await.unwrap();

    assert!(!response.body.is_empty());
    assert!(response
        .headers()
        .contains(&("Content-Length", response.body.len().to_string())));
    // ISO BMFF files carry an `ftyp` box right after the first size field
    assert_eq!(&response.body[4..8], b"ftyp");
    assert_eq!(std::fs::read_dir(&config.temp_dir).unwrap().count(), 0);
}
