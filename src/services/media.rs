//! Media storage
//!
//! Writes uploaded files under the media root and returns paths relative to
//! it, suitable for storing in the database and serving under the media URL.

use crate::config::UploadConfig;
use tokio::fs;
use uuid::Uuid;

/// Directory for lesson attachments
pub const LESSON_FILES_DIR: &str = "lessons/files";
/// Directory for uploaded site logos
pub const LOGO_DIR: &str = "branding/logos";
/// Directory for website images
pub const WEBSITE_IMAGE_DIR: &str = "website/images";

/// A file received from a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Error types for media storage
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("File too large. Maximum size: {max_bytes} bytes ({} MB)", .max_bytes / 1024 / 1024)]
    TooLarge { max_bytes: u64 },

    #[error("Invalid file type: {0}")]
    InvalidType(String),

    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

/// Keep ASCII letters, digits, '.', '-' and '_'; anything else becomes '_'.
/// Path separators never survive, and an empty result becomes "file".
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// File store rooted at the configured media directory
#[derive(Debug, Clone)]
pub struct MediaStore {
    config: UploadConfig,
}

impl MediaStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Store a file as `<dir>/<uuid>-<sanitized name>` and return that
    /// relative path
    pub async fn save(&self, dir: &str, file: &UploadedFile) -> Result<String, MediaError> {
        if file.data.len() as u64 > self.config.max_file_size {
            return Err(MediaError::TooLarge {
                max_bytes: self.config.max_file_size,
            });
        }

        let relative = format!(
            "{}/{}-{}",
            dir,
            Uuid::new_v4().simple(),
            sanitize_file_name(&file.file_name)
        );
        let target = self.config.path.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, &file.data).await?;

        tracing::debug!("Stored upload at {}", target.display());
        Ok(relative)
    }

    /// Delete a file previously returned by [`MediaStore::save`]
    pub async fn remove(&self, relative: &str) -> Result<(), MediaError> {
        let target = self.config.path.join(relative);
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`MediaStore::save`], but only for allowed image types
    pub async fn save_image(&self, dir: &str, file: &UploadedFile) -> Result<String, MediaError> {
        let content_type = file.content_type.as_deref().unwrap_or("application/octet-stream");
        if !self.config.is_image_type_allowed(content_type) {
            return Err(MediaError::InvalidType(content_type.to_string()));
        }
        self.save(dir, file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir, max_file_size: u64) -> MediaStore {
        MediaStore::new(&UploadConfig {
            path: dir.path().to_path_buf(),
            max_file_size,
            ..Default::default()
        })
    }

    fn upload(name: &str, content_type: &str, data: &[u8]) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: Some(content_type.to_string()),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("notes v2.pdf"), "notes_v2.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\intro.pptx"), "intro.pptx");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name("présentation.pdf"), "pr_sentation.pdf");
    }

    #[tokio::test]
    async fn test_save_writes_under_root() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 1024);

        let path = store
            .save(LESSON_FILES_DIR, &upload("intro.pdf", "application/pdf", b"%PDF"))
            .await
            .unwrap();

        assert!(path.starts_with("lessons/files/"));
        assert!(path.ends_with("-intro.pdf"));
        assert_eq!(std::fs::read(dir.path().join(&path)).unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn test_remove_deletes_stored_file() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 1024);

        let path = store
            .save(LESSON_FILES_DIR, &upload("notes.txt", "text/plain", b"hi"))
            .await
            .unwrap();
        store.remove(&path).await.unwrap();
        assert!(!dir.path().join(&path).exists());

        // Already gone
        store.remove(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_rejects_oversized_file() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 4);

        let err = store
            .save(LESSON_FILES_DIR, &upload("big.bin", "application/octet-stream", b"12345"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::TooLarge { max_bytes: 4 }));
    }

    #[tokio::test]
    async fn test_save_image_checks_type() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 1024);

        assert!(store
            .save_image(LOGO_DIR, &upload("logo.png", "image/png", b"png"))
            .await
            .is_ok());
        assert!(matches!(
            store
                .save_image(LOGO_DIR, &upload("logo.exe", "application/x-msdownload", b"MZ"))
                .await,
            Err(MediaError::InvalidType(_))
        ));
    }
}
