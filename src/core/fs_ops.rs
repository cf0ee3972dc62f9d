// src/core/fs_ops.rs
//! File system helpers for run inputs and generated artifacts

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

pub struct FsOps;

impl FsOps {
    /// Read a required input file (profile, job input)
    pub async fn read_input(path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read input file: {}", path.display()))
    }

    /// Read a user override (prompt catalog, template); `Ok(None)` when the file is absent
    pub async fn read_optional(path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read override: {}", path.display())),
        }
    }

    /// Write every `(path, content)` pair, creating parent directories and
    /// overwriting existing files. When one write fails, the files already
    /// written by this call are removed again before the error is returned.
    pub async fn write_all(files: &[(&Path, &str)]) -> Result<()> {
        let mut written: Vec<&Path> = Vec::with_capacity(files.len());

        for (path, content) in files {
            if let Err(e) = Self::write_one(path, content).await {
                for done in written {
                    if let Err(remove_err) = fs::remove_file(done).await {
                        warn!("Could not remove partial output {}: {}", done.display(), remove_err);
                    }
                }
                return Err(e);
            }
            written.push(*path);
        }
        Ok(())
    }

    async fn write_one(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
        }
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write artifact: {}", path.display()))?;
        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_all_creates_parent_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.md");

        FsOps::write_all(&[(path.as_path(), "first")]).await.unwrap();
        FsOps::write_all(&[(path.as_path(), "second")]).await.unwrap();

        assert_eq!(FsOps::read_input(&path).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_write_all_removes_earlier_files_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.md");
        // A directory in place of the second file makes its write fail
        let second = dir.path().join("b.md");
        std::fs::create_dir_all(&second).unwrap();

        let err = FsOps::write_all(&[(first.as_path(), "a"), (second.as_path(), "b")])
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("b.md"));
        assert!(!first.exists());
    }

    #[tokio::test]
    async fn test_read_optional_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        assert!(FsOps::read_optional(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_input_reports_path() {
        let err = FsOps::read_input(Path::new("/definitely/not/here.yaml"))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("/definitely/not/here.yaml"));
    }
}
