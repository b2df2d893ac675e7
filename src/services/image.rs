use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::forms::Upload;

/// Why an upload was refused. Shown on the form's `image` field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("Image must be a picture file (png, jpg, gif, webp)")]
    NotAnImage,

    #[error("Image must be at most {0} bytes")]
    TooLarge(usize),
}

/// Uploaded game images on the local file system, keyed by filename.
///
/// Files are not tied to a database transaction: a file may be written and
/// its record never saved. [`ImageService::sweep_orphans`] reclaims those.
#[derive(Debug, Clone)]
pub struct ImageService {
    root: PathBuf,
    max_bytes: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
}

impl ImageService {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    pub fn check(&self, upload: &Upload) -> Result<(), UploadRejection> {
        let is_image = upload
            .content_type
            .as_deref()
            .and_then(|ct| ct.parse::<mime::Mime>().ok())
            .or_else(|| mime_guess::from_path(&upload.file_name).first())
            .is_some_and(|m| m.type_() == mime::IMAGE);

        if !is_image {
            return Err(UploadRejection::NotAnImage);
        }
        if upload.data.len() > self.max_bytes {
            return Err(UploadRejection::TooLarge(self.max_bytes));
        }
        Ok(())
    }

    /// Writes the upload under a fresh `<millis>-<random>.<ext>` name.
    pub async fn save(&self, upload: &Upload) -> Result<String> {
        let filename = generate_filename(&upload.file_name);

        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create {}", self.root.display()))?;

        let file_path = self.path_for(&filename);
        fs::write(&file_path, &upload.data)
            .await
            .with_context(|| format!("Failed to write image to {}", file_path.display()))?;

        info!(path = %file_path.display(), bytes = upload.data.len(), "Stored uploaded image");
        Ok(filename)
    }

    /// Best-effort delete. A missing file is not an error.
    pub async fn remove(&self, filename: &str) {
        if !is_plain_filename(filename) {
            warn!(filename = %filename, "Refusing to remove image outside the images directory");
            return;
        }

        let file_path = self.path_for(filename);
        match fs::remove_file(&file_path).await {
            Ok(()) => info!(path = %file_path.display(), "Removed image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %file_path.display(), "Image already gone");
            }
            Err(e) => warn!(path = %file_path.display(), error = %e, "Failed to remove image"),
        }
    }

    /// Deletes files no record references and that are older than `grace`.
    pub async fn sweep_orphans(
        &self,
        referenced: &HashSet<String>,
        grace: Duration,
    ) -> Result<SweepReport> {
        let root = self.root.clone();
        let referenced = referenced.clone();

        let candidates = tokio::task::spawn_blocking(move || {
            let now = SystemTime::now();
            let mut scanned = 0;
            let mut orphans = Vec::new();

            for entry in walkdir::WalkDir::new(&root)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_file())
            {
                scanned += 1;
                let name = entry.file_name().to_string_lossy().to_string();
                if referenced.contains(&name) {
                    continue;
                }

                let old_enough = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .and_then(|modified| now.duration_since(modified).ok())
                    .is_some_and(|age| age >= grace);

                if old_enough {
                    orphans.push(name);
                }
            }

            (scanned, orphans)
        })
        .await
        .context("Image sweep task panicked")?;

        let (scanned, orphans) = candidates;
        for name in &orphans {
            self.remove(name).await;
        }

        Ok(SweepReport {
            scanned,
            removed: orphans.len(),
        })
    }
}

fn generate_filename(original: &str) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(|| "jpg".to_string(), str::to_ascii_lowercase);

    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::random_range(0..1_000_000_000);
    format!("{millis}-{suffix}.{extension}")
}

fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != ".."
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn temp_service() -> ImageService {
        let dir = std::env::temp_dir().join(format!("game-store-images-{}", uuid::Uuid::new_v4()));
        ImageService::new(dir, 1024)
    }

    fn upload(name: &str, content_type: Option<&str>, size: usize) -> Upload {
        Upload {
            file_name: name.to_string(),
            content_type: content_type.map(ToString::to_string),
            data: Bytes::from(vec![7u8; size]),
        }
    }

    #[test]
    fn test_generated_filename_keeps_extension() {
        let name = generate_filename("Cover Art.PNG");
        assert!(name.ends_with(".png"));
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert!(rest.trim_end_matches(".png").parse::<u32>().is_ok());

        assert!(generate_filename("noext").ends_with(".jpg"));
    }

    #[test]
    fn test_check_rejects_non_images_and_large_files() {
        let service = temp_service();
        assert!(service.check(&upload("a.png", Some("image/png"), 10)).is_ok());
        assert!(service.check(&upload("a.png", None, 10)).is_ok());
        assert_eq!(
            service.check(&upload("a.txt", Some("text/plain"), 10)),
            Err(UploadRejection::NotAnImage)
        );
        assert_eq!(
            service.check(&upload("a.png", Some("image/png"), 2048)),
            Err(UploadRejection::TooLarge(1024))
        );
    }

    #[tokio::test]
    async fn test_save_then_remove() {
        let service = temp_service();
        let name = service
            .save(&upload("box.jpg", Some("image/jpeg"), 16))
            .await
            .unwrap();

        assert!(service.path_for(&name).exists());
        service.remove(&name).await;
        assert!(!service.path_for(&name).exists());

        // second remove is a no-op
        service.remove(&name).await;
    }

    #[tokio::test]
    async fn test_sweep_keeps_referenced_files() {
        let service = temp_service();
        let kept = service.save(&upload("a.jpg", None, 4)).await.unwrap();
        let orphan = service.save(&upload("b.jpg", None, 4)).await.unwrap();

        let referenced: HashSet<String> = [kept.clone()].into_iter().collect();

        let report = service
            .sweep_orphans(&referenced, Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(report.removed, 0, "fresh files are inside the grace period");

        let report = service
            .sweep_orphans(&referenced, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.removed, 1);
        assert!(service.path_for(&kept).exists());
        assert!(!service.path_for(&orphan).exists());
    }
}
