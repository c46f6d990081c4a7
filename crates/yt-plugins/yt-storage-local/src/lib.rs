//! # yt-storage-local
//!
//! Local filesystem implementation of `MediaStore`.
//! Features: Content-addressable storage, directory sharding, and feed
//! thumbnails.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};
use tokio::fs;
use yt_core::traits::MediaStore;

/// Sub-directory of the media root that post illustrations live under.
pub const IMAGES_UPLOAD_PATH: &str = "posts";
pub const THUMBNAIL_WIDTH: u32 = 960;
pub const THUMBNAIL_HEIGHT: u32 = 339;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./media")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/media")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: impl Into<String>) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Generates a sharded media name: "posts/ab/cd/abcd...ef.gif"
    fn sharded_name(hash: &str, ext: &str) -> String {
        format!("{IMAGES_UPLOAD_PATH}/{}/{}/{hash}.{ext}", &hash[0..2], &hash[2..4])
    }

    /// "posts/ab/cd/abcd...ef.gif" -> "posts/ab/cd/thumb_abcd...ef.webp"
    fn thumbnail_name(name: &str) -> String {
        let (dir, file) = name.rsplit_once('/').unwrap_or(("", name));
        let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
        if dir.is_empty() {
            format!("thumb_{stem}.webp")
        } else {
            format!("{dir}/thumb_{stem}.webp")
        }
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root_path.join(name)
    }
}

fn extension_for(data: &[u8], filename: &str) -> String {
    image::guess_format(data)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .map(str::to_string)
        .or_else(|| {
            Path::new(filename)
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase)
        })
        .unwrap_or_else(|| "bin".to_string())
}

/// Center-cropped, upscaled-if-needed thumbnail encoded as WebP.
fn render_thumbnail(data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let img = image::load_from_memory(data).context("decoding upload")?;
    let thumb = img.resize_to_fill(THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT, FilterType::Lanczos3);
    let thumb = DynamicImage::ImageRgba8(thumb.to_rgba8());
    let mut out = Vec::new();
    thumb
        .write_to(&mut Cursor::new(&mut out), ImageFormat::WebP)
        .context("encoding thumbnail")?;
    Ok(out)
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    fn is_valid_image(&self, data: &[u8]) -> bool {
        !data.is_empty() && image::load_from_memory(data).is_ok()
    }

    /// Saves an upload using its SHA-256 hash as the filename.
    /// This automatically deduplicates files.
    async fn save_image(&self, data: Vec<u8>, filename: &str) -> anyhow::Result<String> {
        // 1. Calculate Hash
        let hash = hex::encode(Sha256::digest(&data));
        let name = Self::sharded_name(&hash, &extension_for(&data, filename));

        let target_path = self.path_of(&name);
        let parent = target_path
            .parent()
            .context("media path has no parent directory")?;

        // 2. Ensure directory exists
        fs::create_dir_all(parent).await?;

        // 3. Save Original (if not exists)
        if !fs::try_exists(&target_path).await? {
            fs::write(&target_path, &data).await?;
            tracing::info!(media = %name, original = filename, bytes = data.len(), "image stored");
        }

        // 4. Generate Thumbnail (if not exists)
        let thumb_path = self.path_of(&Self::thumbnail_name(&name));
        if !fs::try_exists(&thumb_path).await? {
            let thumb = tokio::task::spawn_blocking(move || render_thumbnail(&data)).await??;
            fs::write(&thumb_path, thumb).await?;
        }

        Ok(name)
    }

    fn url(&self, name: &str) -> String {
        format!("{}/{}", self.url_prefix, name)
    }

    fn thumbnail_url(&self, name: &str) -> String {
        format!("{}/{}", self.url_prefix, Self::thumbnail_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    #[test]
    fn thumbnail_name_sits_next_to_original() {
        assert_eq!(
            LocalMediaStore::thumbnail_name("posts/ab/cd/abcdef.gif"),
            "posts/ab/cd/thumb_abcdef.webp"
        );
    }

    #[test]
    fn validates_images() {
        let store = LocalMediaStore::new(PathBuf::from("unused"), "/media");
        assert!(store.is_valid_image(SMALL_GIF));
        assert!(!store.is_valid_image(b"definitely not an image"));
        assert!(!store.is_valid_image(b""));
    }

    #[tokio::test]
    async fn saves_original_and_thumbnail_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf(), "/media/");

        let name = store.save_image(SMALL_GIF.to_vec(), "small.gif").await.unwrap();
        assert!(name.starts_with("posts/"));
        assert!(name.ends_with(".gif"));
        assert!(dir.path().join(&name).exists());
        assert!(dir.path().join(LocalMediaStore::thumbnail_name(&name)).exists());

        let again = store.save_image(SMALL_GIF.to_vec(), "copy.gif").await.unwrap();
        assert_eq!(name, again);
        assert_eq!(store.url(&name), format!("/media/{name}"));
        assert!(store.thumbnail_url(&name).ends_with(".webp"));
    }
}
