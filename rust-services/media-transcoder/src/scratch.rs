//! Scratch files - paths removed when their owning job ends
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


use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Exclusive ownership of a file path for the duration of one job
///
/// The file (if any) is removed when the guard is dropped, on every exit
/// path, unless [`ScratchFile::persist`] was called. Removal failures are
/// logged and never propagated.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    armed: bool,
}

impl ScratchFile {
    /// Take ownership of `path`; nothing is created on disk
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    /// Create `path` exclusively and take ownership of it
    ///
    /// Fails with `AlreadyExists` when the name is taken, so the guard never
    /// removes a file another job produced.
    pub async fn claim(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file and hand its path to the caller
    pub fn persist(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }

    /// Remove the file now; the guard stays armed for a later rewrite
    pub fn discard(&self) {
        remove_quietly(&self.path);
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.armed {
            remove_quietly(&self.path);
        }
    }
}

/// Best-effort removal; a missing file is not an error
///
/// Synchronous because it runs from `Drop`. Unlinking a single scratch file
/// does not block the runtime for long.
pub(crate) fn remove_quietly(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed file");
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cleanup failed");
            false
        }
    }
}

/// Collision-free file stem: `<prefix>-<unix millis>-<uuid>`
pub fn unique_stem(prefix: &str) -> String {
    format!(
        "{}-{}-{}",
        prefix,
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_drop_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scratch.webm");
        std::fs::write(&path, b"data").unwrap();

        {
            let scratch = ScratchFile::new(&path);
            assert_eq!(scratch.path(), path.as_path());
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_drop_without_file() {
        let dir = TempDir::new().unwrap();
        let scratch = ScratchFile::new(dir.path().join("never-written.mp4"));
        drop(scratch);
    }

    #[test]
    fn test_persist_keeps_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.web.mp4");
        std::fs::write(&path, b"data").unwrap();

        let kept = ScratchFile::new(&path).persist();

        assert_eq!(kept, path);
        assert!(path.exists());
    }

    #[test]
    fn test_discard_removes_early() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("song.web.m4a");
        std::fs::write(&path, b"partial").unwrap();

        let scratch = ScratchFile::new(&path);
        scratch.discard();
        assert!(!path.exists());

        std::fs::write(&path, b"again").unwrap();
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_cleanup_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be removed with remove_file
        let path = dir.path().join("occupied");
        std::fs::create_dir(&path).unwrap();

        assert!(!remove_quietly(&path));
        drop(ScratchFile::new(&path));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_claim_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.web.mp4");

        let scratch = ScratchFile::claim(&path).await.unwrap();
        assert!(path.exists());

        drop(scratch);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_claim_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.web.mp4");
        std::fs::write(&path, b"someone else's rendition").unwrap();

        let err = ScratchFile::claim(&path).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&path).unwrap(), b"someone else's rendition");
    }

    #[test]
    fn test_unique_stems_differ() {
        let a = unique_stem("export");
        let b = unique_stem("export");

        assert!(a.starts_with("export-"));
        assert_ne!(a, b);
    }
}
