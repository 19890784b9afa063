//! Local image persistence
//!
//! Images are addressed by a relative key such as `images/some-slug.png`.
//! The key doubles as the reference stored on the owning row.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Byte storage for featured images and avatars
pub trait ImageStore: Send + Sync {
    /// Returns true if bytes are already stored under `key`
    fn exists(&self, key: &str) -> bool;

    /// Stores `bytes` under `key` and returns the reference to record
    fn store(&self, key: &str, bytes: &[u8]) -> io::Result<String>;
}

/// Image store rooted at a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a key under the root, rejecting anything that could escape it
    fn resolve(&self, key: &str) -> io::Result<PathBuf> {
        let relative = Path::new(key);
        let well_formed = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !well_formed {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid image key '{}'", key),
            ));
        }

        Ok(self.root.join(relative))
    }
}

impl ImageStore for FsImageStore {
    fn exists(&self, key: &str) -> bool {
        self.resolve(key).map(|path| path.is_file()).unwrap_or(false)
    }

    fn store(&self, key: &str, bytes: &[u8]) -> io::Result<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        Ok(key.to_string())
    }
}
