//! Boundary schemas: persisted asset records and export requests
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


use crate::error::{Result, StudiokitError};
use crate::media::{MediaKind, TranscodeOutcome, UploadedMedia};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Asset Records
// ============================================================================

/// Public URL prefix under which uploads are served
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Record the upload handler persists once a transcode job resolves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub size: u64,
    pub mime_type: String,
}

impl AssetRecord {
    /// Build the record for an upload after its transcode job resolved.
    ///
    /// A transcoded rendition replaces url, size and MIME type; a kept original
    /// is recorded exactly as uploaded.
    pub fn from_outcome(upload: &UploadedMedia, outcome: &TranscodeOutcome) -> Self {
        let (path, size, mime_type) = match outcome {
            TranscodeOutcome::Transcoded {
                path,
                mime_type,
                size_bytes,
            } => (path.as_path(), *size_bytes, mime_type.clone()),
            TranscodeOutcome::KeptOriginal { .. } => (
                upload.stored_path.as_path(),
                upload.size_bytes,
                upload.mime_type.clone(),
            ),
        };

        Self {
            name: upload.original_filename.clone(),
            url: upload_url(path),
            kind: upload.kind(),
            size,
            mime_type,
        }
    }
}

fn upload_url(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/{}", UPLOADS_URL_PREFIX, file_name)
}

// ============================================================================
// Export Requests
// ============================================================================

/// Largest WebM buffer accepted for export (500 MiB)
pub const MAX_EXPORT_BYTES: usize = 500 * 1024 * 1024;

/// MIME types accepted as export input
pub const EXPORT_INPUT_MIME_TYPES: &[&str] = &["video/webm", "video/x-matroska"];

/// Content type of every export response
pub const EXPORT_CONTENT_TYPE: &str = "video/mp4";

/// A recorded project export, as received from the HTTP layer
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub original_filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ExportRequest {
    pub fn new(
        original_filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            original_filename: original_filename.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Check the request against the export boundary contract
    pub fn validate(&self) -> Result<()> {
        let mime_ok = EXPORT_INPUT_MIME_TYPES.contains(&self.mime_type.as_str());
        if !mime_ok && !self.original_filename.ends_with(".webm") {
            return Err(StudiokitError::UnsupportedExportInput(format!(
                "{} ({})",
                self.original_filename, self.mime_type
            )));
        }

        if self.data.is_empty() {
            return Err(StudiokitError::EmptyExport);
        }

        if self.data.len() > MAX_EXPORT_BYTES {
            return Err(StudiokitError::ExportTooLarge {
                size: self.data.len(),
                limit: MAX_EXPORT_BYTES,
            });
        }

        Ok(())
    }
}

/// Converted export, ready to be attached to a download response
#[derive(Debug, Clone)]
pub struct ExportResponse {
    pub body: Vec<u8>,
}

impl ExportResponse {
    pub fn new(body: Vec<u8>) -> Self {
        Self { body }
    }

    /// Response headers the HTTP layer must attach
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", EXPORT_CONTENT_TYPE.to_string()),
            (
                "Content-Disposition",
                "attachment; filename=\"export.mp4\"".to_string(),
            ),
            ("Content-Length", self.body.len().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::KeepReason;

    fn upload() -> UploadedMedia {
        UploadedMedia::new("/srv/uploads/1700000000-clip.mov", "clip.mov", "video/quicktime", 4096)
    }

    #[test]
    fn test_record_for_kept_original() {
        let outcome = TranscodeOutcome::KeptOriginal {
            reason: KeepReason::TranscodeFailed,
        };
        let record = AssetRecord::from_outcome(&upload(), &outcome);

        assert_eq!(record.name, "clip.mov");
        assert_eq!(record.url, "/uploads/1700000000-clip.mov");
        assert_eq!(record.kind, MediaKind::Video);
        assert_eq!(record.size, 4096);
        assert_eq!(record.mime_type, "video/quicktime");
    }

    #[test]
    fn test_record_for_transcoded() {
        let outcome = TranscodeOutcome::Transcoded {
            path: "/srv/uploads/1700000000-clip.web.mp4".into(),
            mime_type: "video/mp4".to_string(),
            size_bytes: 2048,
        };
        let record = AssetRecord::from_outcome(&upload(), &outcome);

        assert_eq!(record.name, "clip.mov");
        assert_eq!(record.url, "/uploads/1700000000-clip.web.mp4");
        assert_eq!(record.size, 2048);
        assert_eq!(record.mime_type, "video/mp4");
    }

    #[test]
    fn test_record_serializes_type_field() {
        let outcome = TranscodeOutcome::KeptOriginal {
            reason: KeepReason::NotTranscodable,
        };
        let image = UploadedMedia::new("/srv/uploads/a.png", "a.png", "image/png", 10);
        let value = serde_json::to_value(AssetRecord::from_outcome(&image, &outcome)).unwrap();

        assert_eq!(value["type"], "image");
        assert_eq!(value["mimeType"], "image/png");
    }

    #[test]
    fn test_export_request_accepts_webm() {
        let request = ExportRequest::new("export.bin", "video/webm", vec![1, 2, 3]);
        assert!(request.validate().is_ok());

        let by_name = ExportRequest::new("recording.webm", "application/octet-stream", vec![1]);
        assert!(by_name.validate().is_ok());
    }

    #[test]
    fn test_export_request_rejects_other_formats() {
        let request = ExportRequest::new("clip.mp4", "video/mp4", vec![1, 2, 3]);
        assert!(matches!(
            request.validate(),
            Err(StudiokitError::UnsupportedExportInput(_))
        ));
    }

    #[test]
    fn test_export_request_rejects_empty() {
        let request = ExportRequest::new("export.webm", "video/webm", Vec::new());
        assert!(matches!(request.validate(), Err(StudiokitError::EmptyExport)));
    }

    #[test]
    fn test_export_request_rejects_oversized() {
        let request = ExportRequest::new("export.webm", "video/webm", vec![0; MAX_EXPORT_BYTES + 1]);
        assert!(matches!(
            request.validate(),
            Err(StudiokitError::ExportTooLarge { .. })
        ));
    }

    #[test]
    fn test_export_response_headers() {
        let response = ExportResponse::new(vec![0; 42]);
        let headers = response.headers();

        assert!(headers.contains(&("Content-Type", "video/mp4".to_string())));
        assert!(headers.contains(&("Content-Length", "42".to_string())));
        assert!(headers
            .iter()
            .any(|(k, v)| *k == "Content-Disposition" && v.starts_with("attachment")));
    }
}
