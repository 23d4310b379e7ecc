//! Shared application state

use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxAttendanceRepository, SqlxCategoryRepository, SqlxCourseRepository,
    SqlxEnrollmentRepository, SqlxLessonRepository, SqlxSessionRepository, SqlxSiteRepository,
    SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    BrandingService, CatalogService, LedgerService, LessonService, MediaStore, SessionService,
    SiteAssets, UserService,
};
use crate::views::{ViewEngine, ViewError};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub views: Arc<ViewEngine>,
    pub user_service: Arc<UserService>,
    pub session_service: Arc<SessionService>,
    pub catalog_service: Arc<CatalogService>,
    pub ledger_service: Arc<LedgerService>,
    pub lesson_service: Arc<LessonService>,
    pub branding_service: Arc<BrandingService>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(pool: DynDatabasePool, config: Config) -> Result<Self, ViewError> {
        let views = ViewEngine::new(config.site.templates_path.as_deref())?;
        Ok(Self::with_views(pool, config, views))
    }

    /// Same as [`AppState::new`] with a ready-made view engine
    pub fn with_views(pool: DynDatabasePool, config: Config, views: ViewEngine) -> Self {
        let users = SqlxUserRepository::boxed(pool.clone());
        let sessions = SqlxSessionRepository::boxed(pool.clone());
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let courses = SqlxCourseRepository::boxed(pool.clone());
        let lessons = SqlxLessonRepository::boxed(pool.clone());
        let enrollments = SqlxEnrollmentRepository::boxed(pool.clone());
        let attendance = SqlxAttendanceRepository::boxed(pool.clone());
        let site = SqlxSiteRepository::boxed(pool);

        let media = MediaStore::new(&config.upload);

        Self {
            user_service: Arc::new(UserService::new(users)),
            session_service: Arc::new(SessionService::new(sessions, config.session.ttl_hours)),
            catalog_service: Arc::new(CatalogService::new(
                categories.clone(),
                courses.clone(),
                lessons.clone(),
                enrollments.clone(),
            )),
            ledger_service: Arc::new(LedgerService::new(
                courses.clone(),
                enrollments,
                attendance,
            )),
            lesson_service: Arc::new(LessonService::new(
                lessons,
                courses,
                categories,
                media.clone(),
            )),
            branding_service: Arc::new(BrandingService::new(
                site,
                media,
                config.site.media_url.clone(),
            )),
            views: Arc::new(views),
            config: Arc::new(config),
        }
    }

    /// Site assets for a render; a read failure degrades to the defaults
    pub async fn site_assets(&self) -> SiteAssets {
        match self.branding_service.site_assets().await {
            Ok(assets) => assets,
            Err(e) => {
                tracing::warn!("Failed to load site assets: {}", e);
                SiteAssets::fallback(&self.config.site.media_url)
            }
        }
    }
}
