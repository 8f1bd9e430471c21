//! Load Tests for the Transcode Pipeline
//!
//! These tests run many jobs at once through the real process invoker, with a
//! shell script standing in for FFmpeg:
//! - Concurrent uploads never share output files
//! - The encoder concurrency ceiling holds under load
//!
//! Run with: cargo test --test load_test --release

#![cfg(unix)]

use futures::future::join_all;
use media_transcoder::{Exporter, FfmpegEncoder, Transcoder};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use studiokit_types::{TranscodeOutcome, UploadedMedia};
use tempfile::TempDir;

/// Copies the input (`$5` after `-hide_banner -nostdin -y -i`) to the last argument
const COPY_SCRIPT: &str = "for last; do :; done\nsleep 0.2\ncp \"$5\" \"$last\"\n";

fn copy_encoder(dir: &Path, max_concurrent: usize) -> Arc<FfmpegEncoder> {
    let script = dir.join("fake-ffmpeg.sh");
    std::fs::write(&script, COPY_SCRIPT).unwrap();
    Arc::new(
        FfmpegEncoder::new("sh")
            .with_leading_args([script])
            .with_max_concurrent(max_concurrent)
            .with_timeout(Duration::from_secs(30)),
    )
}

#[tokio::test]
async fn test_concurrent_uploads() {
    let dir = TempDir::new().unwrap();
    let uploads = dir.path().join("uploads");
    std::fs::create_dir_all(&uploads).unwrap();

    let num_jobs = 20;
    let max_concurrent = 4;
    let transcoder = Transcoder::new(copy_encoder(dir.path(), max_concurrent));

    let start = Instant::now();

    let mut handles = Vec::new();
    for i in 0..num_jobs {
        let path = uploads.join(format!("{:04}-take.mov", i));
        let body = format!("take {}", i);
        std::fs::write(&path, &body).unwrap();
        let upload = UploadedMedia::new(path, "take.mov", "video/quicktime", body.len() as u64);
        let transcoder = transcoder.clone();
        handles.push(tokio::spawn(async move {
            (body, transcoder.transcode(&upload).await)
        }));
    }

    let mut outputs = HashSet::new();
    for handle in handles {
        let (body, result) = handle.await.unwrap();
        match result.unwrap() {
            TranscodeOutcome::Transcoded { path, .. } => {
                assert_eq!(std::fs::read_to_string(&path).unwrap(), body);
                assert!(outputs.insert(path));
            }
            other => panic!("expected a transcoded outcome, got {:?}", other),
        }
    }

    let elapsed = start.elapsed();
    println!("{} uploads transcoded in {:?}", num_jobs, elapsed);

    assert_eq!(outputs.len(), num_jobs);
    // 20 jobs, 4 at a time, 200ms each: at least five rounds
    assert!(
        elapsed >= Duration::from_millis(900),
        "encoder ceiling not enforced: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_concurrent_exports() {
    let dir = TempDir::new().unwrap();
    let temp = dir.path().join("temp");
    let exporter = Exporter::new(copy_encoder(dir.path(), 8), &temp);

    let jobs = (0..16).map(|i| {
        let exporter = exporter.clone();
        async move {
            let webm = format!("recording {}", i).into_bytes();
            let mp4 = exporter.convert_webm_to_mp4(&webm).await;
            (webm, mp4)
        }
    });

    for (webm, mp4) in join_all(jobs).await {
        assert_eq!(mp4.unwrap(), webm);
    }
    assert_eq!(std::fs::read_dir(&temp).unwrap().count(), 0);
}
