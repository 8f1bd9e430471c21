//! Transcode orchestrator - drives one upload through its fallback chain
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
use crate::policy::{self, EncodeAttempt};
use crate::scratch::ScratchFile;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use studiokit_types::{KeepReason, MediaKind, TranscodeOutcome, UploadedMedia};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Marker inserted between the original stem and the new extension
pub const RENDITION_MARKER: &str = "web";

/// Names tried per attempt before giving up on a taken rendition path
const CLAIM_TRIES: usize = 4;

/// Fatal errors; everything transcode-specific resolves to an outcome instead
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Input file unavailable: {path}: {source}")]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single attempt did not produce a usable rendition
#[derive(Error, Debug)]
enum AttemptFailure {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("could not claim output {path}: {source}")]
    Claim {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoder reported success but {0} is missing")]
    MissingOutput(PathBuf),

    #[error("encoder produced an empty file at {0}")]
    EmptyOutput(PathBuf),
}

/// One attempt of one job; lives only inside [`Transcoder::transcode`]
struct TranscodeJob<'a> {
    input: &'a Path,
    kind: MediaKind,
    attempt_index: usize,
    output: PathBuf,
    mime_type: &'static str,
}

/// Produces web-playable renditions of uploaded media
#[derive(Clone)]
pub struct Transcoder {
    encoder: Arc<dyn Encoder>,
}

impl Transcoder {
    pub fn new(encoder: Arc<dyn Encoder>) -> Self {
        Self { encoder }
    }

    /// Transcode an upload, falling back to the original on failure
    ///
    /// On success the rendition is written beside the upload as
    /// `<stem>.web.<ext>` and the original file is removed. Only an input that
    /// cannot be read at all is reported as an error.
    pub async fn transcode(
        &self,
        upload: &UploadedMedia,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        let kind = upload.kind();
        let attempts = policy::decide(kind, &upload.mime_type);

        if attempts.is_empty() {
            info!(
                path = %upload.stored_path.display(),
                mime_type = %upload.mime_type,
                "Media is not transcodable, keeping original"
            );
            return Ok(TranscodeOutcome::KeptOriginal {
                reason: KeepReason::NotTranscodable,
            });
        }

        ensure_readable(&upload.stored_path).await?;

        info!(
            path = %upload.stored_path.display(),
            kind = %kind,
            mime_type = %upload.mime_type,
            attempts = attempts.len(),
            "Starting transcode"
        );

        let mut last_failure: Option<AttemptFailure> = None;

        for (attempt_index, attempt) in attempts.iter().enumerate() {
            let extension = attempt.container.extension();
            let rendition = match claim_rendition(&upload.stored_path, extension).await {
                Ok(rendition) => rendition,
                Err(failure) => {
                    warn!(
                        path = %upload.stored_path.display(),
                        attempt = attempt_index + 1,
                        codec = attempt.label,
                        error = %failure,
                        "Transcode attempt failed"
                    );
                    last_failure = Some(failure);
                    continue;
                }
            };
            let job = TranscodeJob {
                input: &upload.stored_path,
                kind,
                attempt_index,
                output: rendition.path().to_path_buf(),
                mime_type: attempt.container.mime_type(),
            };

            match self.run_attempt(&job, attempt).await {
                Ok(size_bytes) => {
                    let path = rendition.persist();
                    info!(
                        path = %path.display(),
                        kind = %job.kind,
                        codec = attempt.label,
                        size_bytes = size_bytes,
                        "Transcode succeeded"
                    );
                    remove_original(job.input).await;

                    return Ok(TranscodeOutcome::Transcoded {
                        path,
                        mime_type: job.mime_type.to_string(),
                        size_bytes,
                    });
                }
                Err(failure) => {
                    warn!(
                        path = %job.input.display(),
                        attempt = job.attempt_index + 1,
                        codec = attempt.label,
                        error = %failure,
                        "Transcode attempt failed"
                    );
                    last_failure = Some(failure);
                    // Dropping `rendition` removes any partial output before
                    // the next attempt starts.
                }
            }
        }

        warn!(
            path = %upload.stored_path.display(),
            error = %last_failure.map(|f| f.to_string()).unwrap_or_default(),
            "All transcode attempts failed, keeping original"
        );
        Ok(TranscodeOutcome::KeptOriginal {
            reason: KeepReason::TranscodeFailed,
        })
    }

    async fn run_attempt(
        &self,
        job: &TranscodeJob<'_>,
        attempt: &EncodeAttempt,
    ) -> Result<u64, AttemptFailure> {
        self.encoder
            .encode(job.input, &job.output, &attempt.options)
            .await?;

        match tokio::fs::metadata(&job.output).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
            Ok(_) => Err(AttemptFailure::EmptyOutput(job.output.clone())),
            Err(_) => Err(AttemptFailure::MissingOutput(job.output.clone())),
        }
    }
}

/// `<dir>/<stem>.web.<ext>` next to the original upload
pub fn rendition_path(input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    input.with_file_name(format!("{}.{}.{}", stem, RENDITION_MARKER, extension))
}

/// `<dir>/<stem>-<tag>.web.<ext>`, used when the plain name is taken
fn tagged_rendition_path(input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let tag = Uuid::new_v4().simple().to_string();
    input.with_file_name(format!(
        "{}-{}.{}.{}",
        stem,
        &tag[..8],
        RENDITION_MARKER,
        extension
    ))
}

/// Create the rendition file exclusively so cleanup only touches our own output
async fn claim_rendition(input: &Path, extension: &str) -> Result<ScratchFile, AttemptFailure> {
    let mut candidate = rendition_path(input, extension);
    for _ in 0..CLAIM_TRIES {
        match ScratchFile::claim(&candidate).await {
            Ok(rendition) => return Ok(rendition),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %candidate.display(), "Rendition name taken");
                candidate = tagged_rendition_path(input, extension);
            }
            Err(source) => {
                return Err(AttemptFailure::Claim {
                    path: candidate,
                    source,
                })
            }
        }
    }
    Err(AttemptFailure::Claim {
        path: candidate,
        source: std::io::Error::new(ErrorKind::AlreadyExists, "no free rendition name"),
    })
}

async fn ensure_readable(path: &Path) -> Result<(), TranscodeError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|source| TranscodeError::InputUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

    if !meta.is_file() {
        return Err(TranscodeError::InputUnavailable {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }
    Ok(())
}

/// The rendition is already the result of record; failure here is only logged
async fn remove_original(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(
            path = %path.display(),
            error = %e,
            "Failed to remove original after transcode"
        );
    }
}
