//! Image files on disk.

use std::path::{Path, PathBuf};

use mise_types::{GeneratedImage, RunId};

use crate::Result;

/// Writes step images under `<root>/media/recipes/{run_id}/step_{index}.png`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a step image.
    pub fn image_path(&self, run_id: RunId, step_index: usize) -> PathBuf {
        self.root
            .join(GeneratedImage::relative_path(run_id, step_index))
    }

    /// Write a step image, creating parent directories and replacing any
    /// existing file. Returns the path relative to the media root.
    pub fn save_image(&self, run_id: RunId, step_index: usize, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.image_path(run_id, step_index);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        tracing::debug!(
            run_id,
            step_index,
            path = %path.display(),
            bytes = bytes.len(),
            "image written"
        );
        Ok(GeneratedImage::relative_path(run_id, step_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_image_creates_directories() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path());

        let relative = media.save_image(7, 0, b"png").unwrap();
        assert_eq!(relative, PathBuf::from("media/recipes/7/step_0.png"));
        assert_eq!(std::fs::read(dir.path().join(&relative)).unwrap(), b"png");
    }

    #[test]
    fn test_save_image_overwrites() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path());

        media.save_image(7, 1, b"first attempt").unwrap();
        media.save_image(7, 1, b"second").unwrap();

        let run_dir = dir.path().join("media/recipes/7");
        let files: Vec<_> = std::fs::read_dir(&run_dir).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(std::fs::read(media.image_path(7, 1)).unwrap(), b"second");
    }
}
