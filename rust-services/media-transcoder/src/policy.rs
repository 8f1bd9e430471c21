//! Codec policy - which encodes to attempt for a given upload
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


use studiokit_types::MediaKind;
use tracing::debug;

/// Constant-rate-factor target shared by every H.264 encode
pub const VIDEO_CRF: u8 = 23;
/// Audio bitrate for every audio track we produce
pub const AUDIO_BITRATE: &str = "128k";
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;
pub const AUDIO_CHANNELS: u8 = 2;

/// Video codec configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    H264, // H.264 (libx264) - plays everywhere
}

impl VideoCodec {
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
        }
    }
}

/// Audio codec configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    Aac, // AAC (default, best compatibility)
    Mp3, // MP3 (safety net for builds without an AAC encoder)
}

impl AudioCodec {
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Mp3 => "libmp3lame",
        }
    }
}

/// Output container of an encode attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Mp4,
    M4a,
    Mp3,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::M4a => "m4a",
            Container::Mp3 => "mp3",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Container::Mp4 => "video/mp4",
            Container::M4a => "audio/mp4",
            Container::Mp3 => "audio/mpeg",
        }
    }
}

/// Ordered FFmpeg output arguments for one encode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    args: Vec<String>,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a flag followed by its value
    pub fn opt(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.args.push(flag.to_string());
        self.args.push(value.into());
        self
    }

    /// Append a bare flag
    pub fn flag(mut self, flag: &str) -> Self {
        self.args.push(flag.to_string());
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn audio(self, codec: AudioCodec) -> Self {
        self.opt("-c:a", codec.ffmpeg_codec())
            .opt("-b:a", AUDIO_BITRATE)
            .opt("-ar", AUDIO_SAMPLE_RATE.to_string())
            .opt("-ac", AUDIO_CHANNELS.to_string())
    }
}

/// One step of a fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeAttempt {
    pub label: &'static str,
    pub container: Container,
    pub options: EncodeOptions,
}

/// Decide which encodes to try, in order, for an upload
///
/// An empty list means the original is already web-safe.
pub fn decide(kind: MediaKind, mime_type: &str) -> Vec<EncodeAttempt> {
    let attempts = match kind {
        MediaKind::Image => Vec::new(),
        MediaKind::Video => vec![video_attempt()],
        MediaKind::Audio => vec![
            audio_attempt("aac", AudioCodec::Aac, Container::M4a),
            audio_attempt("mp3", AudioCodec::Mp3, Container::Mp3),
        ],
    };

    debug!(
        kind = %kind,
        mime_type = mime_type,
        attempts = attempts.len(),
        "Selected codec policy"
    );

    attempts
}

fn video_attempt() -> EncodeAttempt {
    let options = EncodeOptions::new()
        .opt("-c:v", VideoCodec::H264.ffmpeg_codec())
        .opt("-preset", "veryfast")
        .opt("-crf", VIDEO_CRF.to_string())
        // libx264 with yuv420p needs even dimensions
        .opt("-vf", "scale=trunc(iw/2)*2:trunc(ih/2)*2")
        .opt("-pix_fmt", "yuv420p")
        .opt("-c:a", AudioCodec::Aac.ffmpeg_codec())
        .opt("-b:a", AUDIO_BITRATE)
        .opt("-movflags", "+faststart");

    EncodeAttempt {
        label: "h264",
        container: Container::Mp4,
        options,
    }
}

fn audio_attempt(label: &'static str, codec: AudioCodec, container: Container) -> EncodeAttempt {
    EncodeAttempt {
        label,
        container,
        options: EncodeOptions::new().flag("-vn").audio(codec),
    }
}

/// Fixed options for converting a recorded WebM export to MP4
///
/// The audio map is optional so video-only recordings still convert.
pub fn export_options() -> EncodeOptions {
    EncodeOptions::new()
        .opt("-c:v", VideoCodec::H264.ffmpeg_codec())
        .opt("-preset", "superfast")
        .opt("-crf", VIDEO_CRF.to_string())
        .opt("-movflags", "+faststart")
        .opt("-pix_fmt", "yuv420p")
        .audio(AudioCodec::Aac)
        .opt("-map", "0:v:0")
        .opt("-map", "0:a?")
        .flag("-shortest")
}
