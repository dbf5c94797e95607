//! Avatar and banner image selection
//!
//! Avatars are the regular, non-hidden files of the avatar directory. A
//! banner matches an avatar when the banner directory holds a file with the
//! same name.

use crate::error::UpdateError;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};

/// An image read from disk, ready to upload
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

/// The two image directories
#[derive(Debug, Clone)]
pub struct AssetLibrary {
    pfp_dir: PathBuf,
    banner_dir: PathBuf,
}

impl AssetLibrary {
    pub fn new(pfp_dir: impl Into<PathBuf>, banner_dir: impl Into<PathBuf>) -> Self {
        AssetLibrary {
            pfp_dir: pfp_dir.into(),
            banner_dir: banner_dir.into(),
        }
    }

    /// Names of every candidate avatar, sorted
    pub async fn avatar_names(&self) -> Result<Vec<String>, UpdateError> {
        let mut entries = tokio::fs::read_dir(&self.pfp_dir).await.map_err(|e| {
            UpdateError::upstream(
                &format!("Reading avatar directory {}", self.pfp_dir.display()),
                e,
            )
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| UpdateError::upstream("Listing avatar directory", e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if is_file && !name.starts_with('.') {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    /// Pick one avatar uniformly at random
    pub async fn pick_avatar(&self) -> Result<String, UpdateError> {
        let names = self.avatar_names().await?;
        names
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| {
                UpdateError::Upstream(format!(
                    "No avatar images found in {}",
                    self.pfp_dir.display()
                ))
            })
    }

    /// Read the avatar named `file_name`
    pub async fn load_avatar(&self, file_name: &str) -> Result<ImageAsset, UpdateError> {
        read_asset(&self.pfp_dir, file_name)
            .await
            .map_err(|e| UpdateError::upstream(&format!("Reading avatar {file_name}"), e))
    }

    /// Read the banner matching `file_name`, if there is one
    ///
    /// Any read failure means "no banner".
    pub async fn load_banner(&self, file_name: &str) -> Option<ImageAsset> {
        match read_asset(&self.banner_dir, file_name).await {
            Ok(asset) => Some(asset),
            Err(e) => {
                tracing::debug!("No banner for {}: {}", file_name, e);
                None
            }
        }
    }
}

async fn read_asset(dir: &Path, file_name: &str) -> std::io::Result<ImageAsset> {
    let bytes = tokio::fs::read(dir.join(file_name)).await?;
    Ok(ImageAsset {
        bytes,
        mime_type: mime_type_for(file_name),
    })
}

/// MIME type from the file extension, defaulting to PNG
pub fn mime_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn library() -> (tempfile::TempDir, AssetLibrary) {
        let root = tempfile::tempdir().unwrap();
        let pfps = root.path().join("pfps");
        let banners = root.path().join("banners");
        fs::create_dir(&pfps).unwrap();
        fs::create_dir(&banners).unwrap();
        let library = AssetLibrary::new(&pfps, &banners);
        (root, library)
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for("a.png"), "image/png");
        assert_eq!(mime_type_for("a.JPG"), "image/jpeg");
        assert_eq!(mime_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(mime_type_for("a.webp"), "image/webp");
        assert_eq!(mime_type_for("a.gif"), "image/gif");
        assert_eq!(mime_type_for("noext"), "image/png");
    }

    #[tokio::test]
    async fn test_avatar_names_skip_hidden_and_dirs() {
        let (root, library) = library();
        let pfps = root.path().join("pfps");
        fs::write(pfps.join("b.png"), b"b").unwrap();
        fs::write(pfps.join("a.png"), b"a").unwrap();
        fs::write(pfps.join(".DS_Store"), b"x").unwrap();
        fs::create_dir(pfps.join("nested")).unwrap();

        let names = library.avatar_names().await.unwrap();
        assert_eq!(names, vec!["a.png".to_string(), "b.png".to_string()]);
    }

    #[tokio::test]
    async fn test_pick_avatar_from_candidates() {
        let (root, library) = library();
        let pfps = root.path().join("pfps");
        for name in ["one.png", "two.png", "three.png"] {
            fs::write(pfps.join(name), name).unwrap();
        }

        for _ in 0..20 {
            let picked = library.pick_avatar().await.unwrap();
            assert!(["one.png", "two.png", "three.png"].contains(&picked.as_str()));
        }
    }

    #[tokio::test]
    async fn test_pick_avatar_empty_dir_fails() {
        let (_root, library) = library();
        let err = library.pick_avatar().await.unwrap_err();
        assert!(err.to_string().contains("No avatar images found"));
    }

    #[tokio::test]
    async fn test_missing_avatar_dir_fails() {
        let library = AssetLibrary::new("/definitely/not/here", "/nor/here");
        assert!(library.pick_avatar().await.is_err());
    }

    #[tokio::test]
    async fn test_banner_is_optional() {
        let (root, library) = library();
        fs::write(root.path().join("pfps/cat.png"), b"avatar").unwrap();
        fs::write(root.path().join("banners/cat.png"), b"banner").unwrap();
        fs::write(root.path().join("pfps/dog.jpg"), b"avatar").unwrap();

        let banner = library.load_banner("cat.png").await.unwrap();
        assert_eq!(banner.bytes, b"banner");
        assert_eq!(banner.mime_type, "image/png");

        assert!(library.load_banner("dog.jpg").await.is_none());

        let avatar = library.load_avatar("dog.jpg").await.unwrap();
        assert_eq!(avatar.mime_type, "image/jpeg");
    }
}
