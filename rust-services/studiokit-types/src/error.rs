//! Error types for Studiokit
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


use thiserror::Error;

/// Errors raised at the Studiokit service boundaries
#[derive(Error, Debug)]
pub enum StudiokitError {
    #[error("Only WebM video files are allowed: {0}")]
    UnsupportedExportInput(String),

    #[error("No video data provided")]
    EmptyExport,

    #[error("Export of {size} bytes exceeds the {limit} byte limit")]
    ExportTooLarge { size: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, StudiokitError>;
