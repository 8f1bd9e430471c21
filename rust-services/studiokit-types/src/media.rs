//! Uploaded media and transcode outcome types
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


use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of an uploaded asset, fixed at ingestion time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// Classify a MIME type by its prefix.
    ///
    /// Anything that is neither `video/*` nor `audio/*` is treated as an image.
    pub fn from_mime(mime_type: &str) -> Self {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        if mime_type.starts_with("video/") {
            MediaKind::Video
        } else if mime_type.starts_with("audio/") {
            MediaKind::Audio
        } else {
            MediaKind::Image
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An upload that has already been persisted by the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedMedia {
    /// Where the upload handler stored the bytes
    pub stored_path: PathBuf,
    /// Filename as sent by the client
    pub original_filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl UploadedMedia {
    pub fn new(
        stored_path: impl Into<PathBuf>,
        original_filename: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            stored_path: stored_path.into(),
            original_filename: original_filename.into(),
            mime_type: mime_type.into(),
            size_bytes,
        }
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.mime_type)
    }
}

/// Why the original upload is served as-is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepReason {
    /// The media kind has no transcode policy (images)
    NotTranscodable,
    /// Every encode attempt failed
    TranscodeFailed,
}

impl fmt::Display for KeepReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeepReason::NotTranscodable => f.write_str("not transcodable"),
            KeepReason::TranscodeFailed => f.write_str("transcode failed"),
        }
    }
}

/// Result of one transcode orchestration call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TranscodeOutcome {
    Transcoded {
        path: PathBuf,
        mime_type: String,
        size_bytes: u64,
    },
    KeptOriginal {
        reason: KeepReason,
    },
}

impl TranscodeOutcome {
    pub fn is_transcoded(&self) -> bool {
        matches!(self, TranscodeOutcome::Transcoded { .. })
    }

    /// Target MIME type, if a new rendition was produced
    pub fn mime_type(&self) -> Option<&str> {
        match self {
            TranscodeOutcome::Transcoded { mime_type, .. } => Some(mime_type),
            TranscodeOutcome::KeptOriginal { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_mime() {
        assert_eq!(MediaKind::from_mime("video/webm"), MediaKind::Video);
        assert_eq!(MediaKind::from_mime("audio/x-wav"), MediaKind::Audio);
        assert_eq!(MediaKind::from_mime("image/png"), MediaKind::Image);
        assert_eq!(MediaKind::from_mime("application/pdf"), MediaKind::Image);
        assert_eq!(MediaKind::from_mime(""), MediaKind::Image);
    }

    #[test]
    fn test_kind_from_mime_ignores_case() {
        assert_eq!(MediaKind::from_mime("Video/MP4"), MediaKind::Video);
        assert_eq!(MediaKind::from_mime("AUDIO/MPEG"), MediaKind::Audio);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&MediaKind::Audio).unwrap();
        assert_eq!(json, "\"audio\"");
    }

    #[test]
    fn test_keep_reason_display() {
        assert_eq!(KeepReason::NotTranscodable.to_string(), "not transcodable");
        assert_eq!(KeepReason::TranscodeFailed.to_string(), "transcode failed");
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = TranscodeOutcome::KeptOriginal {
            reason: KeepReason::TranscodeFailed,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["outcome"], "kept_original");
        assert_eq!(value["reason"], "transcode_failed");
        assert!(!outcome.is_transcoded());
        assert_eq!(outcome.mime_type(), None);
    }
}
