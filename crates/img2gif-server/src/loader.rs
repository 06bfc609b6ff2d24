//! Source image loading

use crate::error::LoadError;
use image::{ImageReader, RgbaImage};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Resolves a request key to a decoded source image
pub trait SourceLoader: Send + Sync {
    fn load(&self, key: &str) -> Result<RgbaImage, LoadError>;
}

/// Loads sources from files under a root directory
pub struct FsSourceLoader {
    root: PathBuf,
}

impl FsSourceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a key to a path under the root. Keys that are absolute or step
    /// outside the root resolve to nothing.
    pub fn resolve(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let mut path = self.root.clone();
        let mut depth = 0usize;

        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }

        (depth > 0).then_some(path)
    }
}

impl SourceLoader for FsSourceLoader {
    fn load(&self, key: &str) -> Result<RgbaImage, LoadError> {
        let path = self
            .resolve(key)
            .ok_or_else(|| LoadError::NotFound(key.to_string()))?;

        if !path.is_file() {
            return Err(LoadError::NotFound(key.to_string()));
        }

        let reader = ImageReader::open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => LoadError::NotFound(key.to_string()),
                _ => LoadError::from(e),
            })?
            .with_guessed_format()?;

        let image = reader.decode()?.to_rgba8();
        debug!(key = %key, path = ?path, width = image.width(), height = image.height(), "Loaded source image");
        Ok(image)
    }
}
