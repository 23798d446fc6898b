use image::GenericImageView;
use rand::RngCore;
use std::path::{Path, PathBuf};

use super::error::{ServiceError, ServiceResult};
use crate::entities::user::DEFAULT_AVATAR;
use crate::models::Upload;
use crate::validation::image_extension;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Post,
    Avatar,
}

impl ImageKind {
    pub fn folder(self) -> &'static str {
        match self {
            ImageKind::Post => "posts",
            ImageKind::Avatar => "avatars",
        }
    }

    /// Largest width and height a stored image may have.
    pub fn bound(self) -> u32 {
        match self {
            ImageKind::Post => 800,
            ImageKind::Avatar => 200,
        }
    }

    pub fn from_folder(folder: &str) -> Option<Self> {
        match folder {
            "posts" => Some(ImageKind::Post),
            "avatars" => Some(ImageKind::Avatar),
            _ => None,
        }
    }
}

/// Uploaded images on local disk, one folder per [`ImageKind`].
///
/// Writes are not coordinated with database transactions: a failure between
/// the two leaves either an orphaned file or a row pointing at a missing one.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ImageStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `filename` of `kind` lives, or `None` for names that would escape
    /// the folder.
    pub fn path(&self, kind: ImageKind, filename: &str) -> Option<PathBuf> {
        let safe = !filename.is_empty()
            && !filename.contains(['/', '\\'])
            && !filename.starts_with('.');
        safe.then(|| self.root.join(kind.folder()).join(filename))
    }

    /// Decode, shrink to fit the kind's bound and write under a random name.
    /// Returns the stored filename.
    pub fn save(&self, kind: ImageKind, upload: &Upload) -> ServiceResult<String> {
        let ext = image_extension(&upload.filename).ok_or_else(|| {
            ServiceError::invalid(
                "image",
                "File does not have an approved extension: jpg, png, jpeg, gif",
            )
        })?;

        let img = image::load_from_memory(&upload.bytes)?;
        let bound = kind.bound();
        let (width, height) = img.dimensions();
        let img = if width > bound || height > bound {
            img.thumbnail(bound, bound)
        } else {
            img
        };
        // JPEG has no alpha channel.
        let img = if ext == "jpg" || ext == "jpeg" {
            image::DynamicImage::ImageRgb8(img.to_rgb8())
        } else {
            img
        };

        let filename = format!("{}.{}", random_hex(), ext);
        let dir = self.root.join(kind.folder());
        std::fs::create_dir_all(&dir)?;
        img.save(dir.join(&filename))?;

        log::debug!(
            "Stored {} image {} ({}x{})",
            kind.folder(),
            filename,
            img.width(),
            img.height()
        );
        Ok(filename)
    }

    /// Delete a stored image. Missing files are ignored and the default avatar
    /// is never removed.
    pub fn remove(&self, kind: ImageKind, filename: &str) {
        if kind == ImageKind::Avatar && filename == DEFAULT_AVATAR {
            return;
        }
        let Some(path) = self.path(kind, filename) else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => log::debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}

impl ImageStore {
    /// Create both folders and, when absent, a plain placeholder for
    /// [`DEFAULT_AVATAR`].
    pub fn prepare(&self) -> ServiceResult<()> {
        for kind in [ImageKind::Post, ImageKind::Avatar] {
            std::fs::create_dir_all(self.root.join(kind.folder()))?;
        }
        let default_avatar = self.root.join(ImageKind::Avatar.folder()).join(DEFAULT_AVATAR);
        if !default_avatar.exists() {
            let bound = ImageKind::Avatar.bound();
            let placeholder = image::RgbImage::from_pixel(bound, bound, image::Rgb([204, 204, 204]));
            placeholder.save(&default_avatar)?;
            log::info!("Created placeholder avatar at {}", default_avatar.display());
        }
        Ok(())
    }
}

fn random_hex() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    fn temp_store() -> ImageStore {
        let dir = std::env::temp_dir().join(format!("social-connect-uploads-{}", random_hex()));
        ImageStore::new(dir)
    }

    fn png(width: u32, height: u32) -> Upload {
        let img = ImageBuffer::from_pixel(width, height, Rgb([200u8, 10, 10]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        Upload {
            filename: "photo.PNG".to_string(),
            bytes,
        }
    }

    #[test]
    fn large_post_image_is_shrunk_preserving_aspect_ratio() {
        let store = temp_store();
        let name = store.save(ImageKind::Post, &png(1600, 400)).unwrap();
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 16 + ".png".len());

        let stored = image::open(store.path(ImageKind::Post, &name).unwrap()).unwrap();
        assert_eq!(stored.dimensions(), (800, 200));
        std::fs::remove_dir_all(store.root()).ok();
    }

    #[test]
    fn small_avatar_is_not_enlarged() {
        let store = temp_store();
        let name = store.save(ImageKind::Avatar, &png(50, 40)).unwrap();
        let stored = image::open(store.path(ImageKind::Avatar, &name).unwrap()).unwrap();
        assert_eq!(stored.dimensions(), (50, 40));
        std::fs::remove_dir_all(store.root()).ok();
    }

    #[test]
    fn rejects_disallowed_extension_and_undecodable_bytes() {
        let store = temp_store();
        let mut upload = png(10, 10);
        upload.filename = "photo.bmp".to_string();
        assert!(matches!(
            store.save(ImageKind::Post, &upload),
            Err(ServiceError::Validation(_))
        ));

        let garbage = Upload {
            filename: "photo.png".to_string(),
            bytes: b"definitely not a png".to_vec(),
        };
        assert!(matches!(
            store.save(ImageKind::Post, &garbage),
            Err(ServiceError::Image(_))
        ));
    }

    #[test]
    fn prepare_creates_folders_and_placeholder_once() {
        let store = temp_store();
        store.prepare().unwrap();
        let avatar = store.path(ImageKind::Avatar, DEFAULT_AVATAR).unwrap();
        assert_eq!(image::open(&avatar).unwrap().dimensions(), (200, 200));
        assert!(store.root().join("posts").is_dir());

        std::fs::write(&avatar, b"custom").unwrap();
        store.prepare().unwrap();
        assert_eq!(std::fs::read(&avatar).unwrap(), b"custom");
        std::fs::remove_dir_all(store.root()).ok();
    }

    #[test]
    fn remove_spares_default_avatar_and_ignores_missing_files() {
        let store = temp_store();
        let dir = store.root().join("avatars");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(DEFAULT_AVATAR), b"placeholder").unwrap();

        store.remove(ImageKind::Avatar, DEFAULT_AVATAR);
        assert!(dir.join(DEFAULT_AVATAR).exists());

        store.remove(ImageKind::Avatar, "missing.png");
        std::fs::remove_dir_all(store.root()).ok();
    }

    #[test]
    fn path_rejects_traversal() {
        let store = ImageStore::new("/srv/uploads");
        assert!(store.path(ImageKind::Post, "../secret").is_none());
        assert!(store.path(ImageKind::Post, ".hidden").is_none());
        assert!(store.path(ImageKind::Post, "a/b.png").is_none());
        assert_eq!(
            store.path(ImageKind::Post, "abc.png").unwrap(),
            PathBuf::from("/srv/uploads/posts/abc.png")
        );
    }
}
