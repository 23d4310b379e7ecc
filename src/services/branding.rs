//! Branding service
//!
//! Site name, logo and website images. Every rendered page receives a fresh
//! [`SiteAssets`] snapshot.

use crate::db::repositories::SiteRepository;
use crate::models::{PageSlot, SiteBranding, WebsiteImage, DEFAULT_SITE_NAME};
use crate::services::media::{MediaError, MediaStore, UploadedFile, LOGO_DIR, WEBSITE_IMAGE_DIR};
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;

/// Error types for branding operations
#[derive(Debug, thiserror::Error)]
pub enum BrandingServiceError {
    /// Form input rejected; the message is shown on the console
    #[error("{0}")]
    ValidationError(String),

    /// No image with that id
    #[error("Website image not found: {0}")]
    ImageNotFound(i64),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<MediaError> for BrandingServiceError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::Io(io) => BrandingServiceError::InternalError(
                anyhow::Error::new(io).context("Failed to store image"),
            ),
            other => BrandingServiceError::ValidationError(other.to_string()),
        }
    }
}

/// Read-only view of the site's branding for templates
#[derive(Debug, Clone, Serialize)]
pub struct SiteAssets {
    pub branding: Option<SiteBranding>,
    pub website_images: Vec<WebsiteImage>,
    pub default_logo_url: String,
    /// Public prefix of uploaded media
    pub media_url: String,
    /// Site name to display, falling back to the default
    pub site_name: String,
    /// Logo URL to display: uploaded logo or the default one
    pub logo_url: String,
}

impl SiteAssets {
    /// Snapshot used when the database cannot be read
    pub fn fallback(media_url: &str) -> Self {
        Self::build(None, Vec::new(), media_url)
    }

    fn build(branding: Option<SiteBranding>, website_images: Vec<WebsiteImage>, media_url: &str) -> Self {
        let default_logo_url = format!("{}logo.png", media_url);
        let site_name = branding
            .as_ref()
            .map(|b| b.site_name.clone())
            .unwrap_or_else(|| DEFAULT_SITE_NAME.to_string());
        let logo_url = branding
            .as_ref()
            .and_then(|b| b.logo_path.as_ref())
            .map(|path| format!("{}{}", media_url, path))
            .unwrap_or_else(|| default_logo_url.clone());

        Self {
            branding,
            website_images,
            default_logo_url,
            media_url: media_url.to_string(),
            site_name,
            logo_url,
        }
    }
}

/// Branding service
pub struct BrandingService {
    repo: Arc<dyn SiteRepository>,
    media: MediaStore,
    media_url: String,
}

impl BrandingService {
    /// Create a branding service; `media_url` must end with '/'
    pub fn new(repo: Arc<dyn SiteRepository>, media: MediaStore, media_url: impl Into<String>) -> Self {
        Self {
            repo,
            media,
            media_url: media_url.into(),
        }
    }

    /// Latest branding and active images, newest first
    pub async fn site_assets(&self) -> Result<SiteAssets, BrandingServiceError> {
        let branding = self
            .repo
            .latest_branding()
            .await
            .context("Failed to load site branding")?;
        let images = self
            .repo
            .list_active_images()
            .await
            .context("Failed to load website images")?;
        Ok(SiteAssets::build(branding, images, &self.media_url))
    }

    /// Every image, for the console
    pub async fn list_images(&self) -> Result<Vec<WebsiteImage>, BrandingServiceError> {
        let images = self.repo.list_images().await.context("Failed to list website images")?;
        Ok(images)
    }

    /// Change the site name and optionally the logo.
    ///
    /// Updates the latest branding row, or creates one if none exists. The
    /// current logo is kept when no new file is sent.
    pub async fn update_branding(
        &self,
        site_name: &str,
        logo: Option<&UploadedFile>,
    ) -> Result<SiteBranding, BrandingServiceError> {
        let site_name = site_name.trim();
        if site_name.is_empty() {
            return Err(BrandingServiceError::ValidationError(
                "Site name is required.".to_string(),
            ));
        }

        let logo_path = match logo.filter(|f| !f.file_name.is_empty()) {
            Some(file) => Some(self.media.save_image(LOGO_DIR, file).await?),
            None => None,
        };

        let current = self
            .repo
            .latest_branding()
            .await
            .context("Failed to load site branding")?;

        let branding = match current {
            Some(current) => {
                let logo_path = logo_path.or(current.logo_path);
                self.repo
                    .update_branding(current.id, site_name, logo_path.as_deref())
                    .await
                    .context("Failed to update site branding")?;
                self.repo
                    .latest_branding()
                    .await
                    .context("Failed to reload site branding")?
                    .context("Site branding disappeared")?
            }
            None => self
                .repo
                .create_branding(site_name, logo_path.as_deref())
                .await
                .context("Failed to create site branding")?,
        };

        tracing::info!("Site branding updated: {}", branding.site_name);
        Ok(branding)
    }

    /// Add an image to a page slot
    pub async fn add_image(
        &self,
        title: &str,
        page: &str,
        image: Option<&UploadedFile>,
    ) -> Result<WebsiteImage, BrandingServiceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BrandingServiceError::ValidationError(
                "Image title is required.".to_string(),
            ));
        }
        let Some(image) = image.filter(|f| !f.file_name.is_empty()) else {
            return Err(BrandingServiceError::ValidationError(
                "Choose an image to upload.".to_string(),
            ));
        };
        let page: PageSlot = page.parse().unwrap_or_default();

        let path = self.media.save_image(WEBSITE_IMAGE_DIR, image).await?;
        let created = self
            .repo
            .create_image(title, &path, page)
            .await
            .context("Failed to create website image")?;
        Ok(created)
    }

    /// Flip an image's active flag, returning the new state
    pub async fn toggle_image(&self, id: i64) -> Result<bool, BrandingServiceError> {
        let image = self
            .repo
            .get_image(id)
            .await
            .context("Failed to get website image")?
            .ok_or(BrandingServiceError::ImageNotFound(id))?;

        let active = !image.is_active;
        self.repo
            .set_image_active(id, active)
            .await
            .context("Failed to update website image")?;
        Ok(active)
    }
}
