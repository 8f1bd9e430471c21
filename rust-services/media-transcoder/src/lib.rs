//! Media Transcoder Library
//!
//! This library provides the media transcode pipeline:
//! - Codec policy per media kind, with ordered fallbacks
//! - FFmpeg invocation with timeouts and a concurrency ceiling
//! - Upload transcoding that never loses the original
//! - In-memory WebM to MP4 export conversion
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


pub mod encoder;
pub mod export;
pub mod policy;
pub mod probe;
pub mod scratch;
pub mod transcode;

use std::sync::Arc;
use studiokit_config::TranscoderConfig;

pub use encoder::{EncodeError, Encoder, FfmpegEncoder};
pub use export::{ExportError, Exporter};
pub use policy::{AudioCodec, Container, EncodeAttempt, EncodeOptions, VideoCodec};
pub use transcode::{TranscodeError, Transcoder};

/// Upload transcoding and export conversion sharing one encoder
///
/// Both orchestrators draw from the same encoder slots, so the concurrency
/// ceiling holds across uploads and exports.
#[derive(Clone)]
pub struct MediaPipeline {
    pub transcoder: Transcoder,
    pub exporter: Exporter,
}

impl MediaPipeline {
    pub fn new(encoder: Arc<dyn Encoder>, config: &TranscoderConfig) -> Self {
        Self {
            transcoder: Transcoder::new(encoder.clone()),
            exporter: Exporter::new(encoder, &config.temp_dir),
        }
    }

    /// Pipeline backed by the FFmpeg binary named in the configuration
    pub fn from_config(config: &TranscoderConfig) -> Self {
        Self::new(Arc::new(FfmpegEncoder::from_config(config)), config)
    }
}
