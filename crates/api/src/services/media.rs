//! Product image storage on the local filesystem.
//!
//! Files live under `{media_root}/productos/` with a random name and are
//! referenced from the database by their path relative to the media root.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Subdirectory for product images.
pub const PRODUCT_DIR: &str = "productos";

/// Accepted image extensions.
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Largest accepted upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("unsupported image type")]
    UnsupportedType,

    #[error("image exceeds {max} bytes")]
    TooLarge { max: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an uploaded product image and return its relative path.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::UnsupportedType` when the file name has no
    /// accepted extension and `MediaError::TooLarge` for oversized uploads.
    pub async fn save_product_image(
        &self,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let ext = check_image(file_name, bytes.len())?;

        let relative = format!("{PRODUCT_DIR}/{}.{ext}", Uuid::new_v4().simple());
        let dir = self.root.join(PRODUCT_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(self.root.join(&relative), bytes).await?;

        tracing::debug!(path = %relative, size = bytes.len(), "Stored product image");
        Ok(relative)
    }

    /// Remove a stored file. Missing files and paths escaping the media root
    /// are ignored.
    pub async fn remove(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            tracing::warn!(path = %relative, "Refusing to remove path outside media root");
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %relative, "Removed media file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %relative, error = %e, "Failed to remove media file"),
        }
    }

    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let rel = Path::new(relative);
        if relative.is_empty()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(rel))
    }
}

/// Accept or reject an upload by name and size, returning its extension.
///
/// # Errors
///
/// Returns `MediaError::TooLarge` above [`MAX_IMAGE_BYTES`] and
/// `MediaError::UnsupportedType` for anything but the accepted extensions.
pub fn check_image(file_name: Option<&str>, size: usize) -> Result<String, MediaError> {
    if size > MAX_IMAGE_BYTES {
        return Err(MediaError::TooLarge {
            max: MAX_IMAGE_BYTES,
        });
    }
    image_extension(file_name).ok_or(MediaError::UnsupportedType)
}

/// Lowercased extension of `file_name` if it is an accepted image type.
fn image_extension(file_name: Option<&str>) -> Option<String> {
    let ext = Path::new(file_name?)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_store() -> MediaStore {
        let dir = std::env::temp_dir().join(format!("davila-media-{}", Uuid::new_v4().simple()));
        MediaStore::new(dir)
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(Some("foto.JPG")).as_deref(), Some("jpg"));
        assert_eq!(image_extension(Some("a.b.webp")).as_deref(), Some("webp"));
        assert_eq!(image_extension(Some("script.sh")), None);
        assert_eq!(image_extension(Some("sin-extension")), None);
        assert_eq!(image_extension(None), None);
    }

    #[test]
    fn test_resolve_rejects_escaping_paths() {
        let store = MediaStore::new(PathBuf::from("/srv/media"));
        assert!(store.resolve("productos/a.png").is_some());
        assert!(store.resolve("../etc/passwd").is_none());
        assert!(store.resolve("/etc/passwd").is_none());
        assert!(store.resolve("").is_none());
    }

    #[tokio::test]
    async fn test_save_and_remove_product_image() {
        let store = temp_store();
        let rel = store
            .save_product_image(Some("casco.png"), b"\x89PNG fake")
            .await
            .unwrap();

        assert!(rel.starts_with("productos/"));
        assert!(rel.ends_with(".png"));
        let full = store.root().join(&rel);
        assert!(full.exists());

        store.remove(&rel).await;
        assert!(!full.exists());

        // Removing twice is harmless.
        store.remove(&rel).await;
        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn test_save_rejects_unsupported_and_oversized() {
        let store = temp_store();
        assert!(matches!(
            store.save_product_image(Some("doc.pdf"), b"x").await,
            Err(MediaError::UnsupportedType)
        ));
        let big = vec![0_u8; MAX_IMAGE_BYTES + 1];
        assert!(matches!(
            store.save_product_image(Some("a.png"), &big).await,
            Err(MediaError::TooLarge { .. })
        ));
    }
}
