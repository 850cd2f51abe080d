//! Per-request scratch storage for generated images
//!
//! Every save lands in its own `<root>/<uuid>/` directory so concurrent
//! requests never see, overwrite or delete each other's files.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::core::file_utils::{image_filename, sweep_dir};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// An image written to scratch storage, owned by one request
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub path: PathBuf,
    pub filename: String,
    pub request_dir: PathBuf,
    pub prompt: String,
    pub created_at: DateTime<Local>,
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the scratch root and clear whatever a previous run left behind.
    ///
    /// Only call before any request is in flight: every request directory
    /// under the root is removed.
    pub async fn prepare(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::io(&self.root, e))?;

        let files = sweep_dir(&self.root)
            .await
            .map_err(|e| StorageError::io(&self.root, e))?;
        let dirs = self.clear_request_dirs().await?;
        if files + dirs > 0 {
            info!(
                "Cleared {files} stale files and {dirs} request directories from {}",
                self.root.display()
            );
        }
        Ok(())
    }

    /// Remove `<root>/<uuid>/` directories orphaned by a crash
    async fn clear_request_dirs(&self) -> Result<usize, StorageError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StorageError::io(&self.root, e))?;

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&self.root, e))?
        {
            let path = entry.path();
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| StorageError::io(&path, e))?
                .is_dir();
            let is_request_dir = entry
                .file_name()
                .to_str()
                .is_some_and(|name| Uuid::parse_str(name).is_ok());
            if !is_dir || !is_request_dir {
                continue;
            }

            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => {
                    debug!("Deleted orphaned {}", path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to delete {}: {e}", path.display()),
            }
        }
        Ok(removed)
    }

    /// Write `bytes` to a fresh request directory
    pub async fn save(&self, bytes: &[u8], prompt: &str) -> Result<StoredImage, StorageError> {
        let created_at = Local::now();
        let filename = image_filename(prompt, &created_at);
        let request_dir = self.root.join(Uuid::new_v4().to_string());

        tokio::fs::create_dir_all(&request_dir)
            .await
            .map_err(|e| StorageError::io(&request_dir, e))?;

        let path = request_dir.join(&filename);
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&request_dir).await {
                warn!(
                    "Failed to clean up {} after write error: {cleanup}",
                    request_dir.display()
                );
            }
            return Err(StorageError::io(&path, e));
        }

        info!("Image saved at: {}", path.display());
        Ok(StoredImage {
            path,
            filename,
            request_dir,
            prompt: prompt.to_string(),
            created_at,
        })
    }

    pub async fn read(&self, image: &StoredImage) -> Result<Vec<u8>, StorageError> {
        tokio::fs::read(&image.path)
            .await
            .map_err(|e| StorageError::io(&image.path, e))
    }

    /// Delete the image and its request directory; already gone is fine
    pub async fn remove(&self, image: &StoredImage) -> Result<(), StorageError> {
        match tokio::fs::remove_dir_all(&image.request_dir).await {
            Ok(()) => {
                debug!("Deleted {}", image.request_dir.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&image.request_dir, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_timestamped(filename: &str, stem: &str) -> bool {
        let Some(rest) = filename.strip_prefix(&format!("{stem}_")) else {
            return false;
        };
        let Some(digits) = rest.strip_suffix(".png") else {
            return false;
        };
        digits.len() == 14 && digits.chars().all(|c| c.is_ascii_digit())
    }

    #[tokio::test]
    async fn test_save_writes_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let stored = store.save(b"png-bytes", "a red fox").await.unwrap();

        assert!(is_timestamped(&stored.filename, "a_red_fox"), "{}", stored.filename);
        assert!(stored.path.starts_with(dir.path()));
        assert_eq!(stored.path.parent(), Some(stored.request_dir.as_path()));
        assert_eq!(store.read(&stored).await.unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn test_same_prompt_same_second_does_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let first = store.save(b"one", "same").await.unwrap();
        let second = store.save(b"two", "same").await.unwrap();

        assert_ne!(first.path, second.path);
        assert_eq!(store.read(&first).await.unwrap(), b"one");
        assert_eq!(store.read(&second).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_remove_only_touches_own_request() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let sent = store.save(b"sent", "first").await.unwrap();
        let inflight = store.save(b"inflight", "second").await.unwrap();

        store.remove(&sent).await.unwrap();

        assert!(!sent.path.exists());
        assert!(!sent.request_dir.exists());
        assert!(inflight.path.exists());
    }

    #[tokio::test]
    async fn test_remove_twice_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let stored = store.save(b"x", "x").await.unwrap();
        store.remove(&stored).await.unwrap();
        store.remove(&stored).await.unwrap();
    }

    #[tokio::test]
    async fn test_prepare_creates_root_and_clears_loose_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data").join("images");
        let store = ImageStore::new(&root);

        store.prepare().await.unwrap();
        assert!(root.is_dir());

        std::fs::write(root.join("stale.png"), b"old").unwrap();
        store.prepare().await.unwrap();
        assert!(!root.join("stale.png").exists());
    }

    #[tokio::test]
    async fn test_prepare_removes_orphaned_request_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        // saved but never removed, as after a crash mid-delivery
        let orphan = store.save(b"png", "a red fox").await.unwrap();
        std::fs::create_dir(dir.path().join("keep-me")).unwrap();

        store.prepare().await.unwrap();

        assert!(!orphan.request_dir.exists());
        let left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(left, vec![std::ffi::OsString::from("keep-me")]);
    }

    #[tokio::test]
    async fn test_prepare_leaves_empty_root_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        store.save(b"one", "first").await.unwrap();
        store.save(b"two", "second").await.unwrap();
        std::fs::write(dir.path().join("stale.png"), b"old").unwrap();

        store.prepare().await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_save_long_multibyte_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let prompt = "一只在雪地里奔跑的红狐狸".repeat(8);

        let stored = store.save(b"png", &prompt).await.unwrap();

        assert!(stored.filename.len() <= 255);
        assert_eq!(store.read(&stored).await.unwrap(), b"png");
    }

    #[tokio::test]
    async fn test_save_into_unwritable_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let store = ImageStore::new(&blocker);
        let err = store.save(b"x", "x").await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}
