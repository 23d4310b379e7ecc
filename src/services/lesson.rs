//! Lesson service
//!
//! Handles the faculty lesson upload form: validation, optional attachment
//! storage under the media root, and the confirmation message.

use crate::db::repositories::{CategoryRepository, CourseRepository, LessonRepository};
use crate::models::{Lesson, LessonVisibility, NewLesson};
use crate::services::media::{MediaError, MediaStore, UploadedFile, LESSON_FILES_DIR};
use anyhow::Context;
use std::sync::Arc;

/// Error types for lesson service operations
#[derive(Debug, thiserror::Error)]
pub enum LessonServiceError {
    /// Form input rejected; the message is shown on the form
    #[error("{0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<MediaError> for LessonServiceError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::Io(io) => LessonServiceError::InternalError(
                anyhow::Error::new(io).context("Failed to store lesson file"),
            ),
            other => LessonServiceError::ValidationError(other.to_string()),
        }
    }
}

/// Raw lesson upload form input
#[derive(Debug, Clone, Default)]
pub struct LessonUploadInput {
    pub title: String,
    pub course_id: Option<String>,
    pub description: String,
    pub visibility: String,
    pub file: Option<UploadedFile>,
    pub created_by: Option<i64>,
}

/// A stored lesson and the confirmation shown on the form
#[derive(Debug, Clone)]
pub struct UploadedLesson {
    pub lesson: Lesson,
    pub message: String,
}

/// Lesson service
pub struct LessonService {
    lessons: Arc<dyn LessonRepository>,
    courses: Arc<dyn CourseRepository>,
    categories: Arc<dyn CategoryRepository>,
    media: MediaStore,
}

impl LessonService {
    /// Create a new lesson service
    pub fn new(
        lessons: Arc<dyn LessonRepository>,
        courses: Arc<dyn CourseRepository>,
        categories: Arc<dyn CategoryRepository>,
        media: MediaStore,
    ) -> Self {
        Self {
            lessons,
            courses,
            categories,
            media,
        }
    }

    /// Add a lesson to a course, storing its attachment if one was sent
    pub async fn upload(&self, input: LessonUploadInput) -> Result<UploadedLesson, LessonServiceError> {
        let title = input.title.trim();

        let course_id = input
            .course_id
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok());
        let course = match course_id {
            Some(id) => self.courses.get_by_id(id).await.context("Failed to get course")?,
            None => None,
        };

        if title.is_empty() {
            return Err(LessonServiceError::ValidationError(
                "Lesson title is required.".to_string(),
            ));
        }
        let Some(course) = course else {
            return Err(LessonServiceError::ValidationError(
                "Select a valid course.".to_string(),
            ));
        };

        let category = self
            .categories
            .get_by_id(course.category_id)
            .await
            .context("Failed to get course category")?
            .context("Course has no category")?;

        let file_path = match input.file.as_ref().filter(|f| !f.file_name.is_empty()) {
            Some(file) => Some(self.media.save(LESSON_FILES_DIR, file).await?),
            None => None,
        };

        let created = self
            .lessons
            .create(&NewLesson {
                course_id: course.id,
                title: title.to_string(),
                description: input.description.trim().to_string(),
                file_path: file_path.clone(),
                visibility: LessonVisibility::parse_or_default(&input.visibility),
                created_by: input.created_by,
            })
            .await;
        let lesson = match created {
            Ok(lesson) => lesson,
            Err(e) => {
                if let Some(path) = file_path {
                    if let Err(remove_err) = self.media.remove(&path).await {
                        tracing::warn!("Failed to remove orphaned upload {}: {}", path, remove_err);
                    }
                }
                return Err(e.context("Failed to create lesson").into());
            }
        };

        tracing::info!("Added lesson {} to course {}", lesson.title, course.title);
        Ok(UploadedLesson {
            message: format!(
                "Lesson \"{}\" added under \"{} > {}\".",
                lesson.title, category.name, course.title
            ),
            lesson,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;
    use crate::db::repositories::{
        SqlxCategoryRepository, SqlxCourseRepository, SqlxLessonRepository,
    };
    use crate::db::{create_test_pool, migrations, DatabasePool, DynDatabasePool};
    use tempfile::TempDir;

    async fn setup_test_service(media_root: &TempDir, max_file_size: u64) -> (DynDatabasePool, LessonService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let media = MediaStore::new(&UploadConfig {
            path: media_root.path().to_path_buf(),
            max_file_size,
            ..Default::default()
        });
        let service = LessonService::new(
            SqlxLessonRepository::boxed(pool.clone()),
            SqlxCourseRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool.clone()),
            media,
        );
        (pool, service)
    }

    async fn course_id(pool: &DynDatabasePool, title: &str) -> String {
        let row: (i64,) = sqlx::query_as("SELECT id FROM courses WHERE title = ?")
            .bind(title)
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        row.0.to_string()
    }

    #[tokio::test]
    async fn test_upload_with_file() {
        let media = TempDir::new().unwrap();
        let (pool, service) = setup_test_service(&media, 1024).await;

        let uploaded = service
            .upload(LessonUploadInput {
                title: " Intro to Pandas ".to_string(),
                course_id: Some(course_id(&pool, "Data Analysis").await),
                description: "First steps".to_string(),
                visibility: "private".to_string(),
                file: Some(UploadedFile {
                    file_name: "pandas intro.pdf".to_string(),
                    content_type: Some("application/pdf".to_string()),
                    data: b"%PDF-1.4".to_vec(),
                }),
                created_by: None,
            })
            .await
            .unwrap();

        assert_eq!(
            uploaded.message,
            "Lesson \"Intro to Pandas\" added under \"Analysis > Data Analysis\"."
        );
        assert_eq!(uploaded.lesson.visibility, LessonVisibility::Private);
        let path = uploaded.lesson.file_path.expect("stored file");
        assert!(path.starts_with("lessons/files/"));
        assert!(path.ends_with("-pandas_intro.pdf"));
        assert!(media.path().join(path).exists());
    }

    #[tokio::test]
    async fn test_failed_insert_removes_stored_file() {
        let media = TempDir::new().unwrap();
        let (pool, service) = setup_test_service(&media, 1024).await;
        let css = course_id(&pool, "CSS").await;
        pool.execute("DROP TABLE lessons").await.unwrap();

        let err = service
            .upload(LessonUploadInput {
                title: "Selectors".to_string(),
                course_id: Some(css),
                file: Some(UploadedFile {
                    file_name: "selectors.pdf".to_string(),
                    content_type: Some("application/pdf".to_string()),
                    data: b"%PDF".to_vec(),
                }),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LessonServiceError::InternalError(_)));

        let dir = media.path().join(LESSON_FILES_DIR);
        let left = std::fs::read_dir(&dir).map(|entries| entries.count()).unwrap_or(0);
        assert_eq!(left, 0);
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let media = TempDir::new().unwrap();
        let (pool, service) = setup_test_service(&media, 1024).await;

        let err = service
            .upload(LessonUploadInput {
                title: "  ".to_string(),
                course_id: Some(course_id(&pool, "CSS").await),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Lesson title is required.");

        for bad in [None, Some("abc".to_string()), Some("9999".to_string())] {
            let err = service
                .upload(LessonUploadInput {
                    title: "Flexbox".to_string(),
                    course_id: bad,
                    ..Default::default()
                })
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "Select a valid course.");
        }
    }

    #[tokio::test]
    async fn test_unknown_visibility_is_public_and_oversized_file_rejected() {
        let media = TempDir::new().unwrap();
        let (pool, service) = setup_test_service(&media, 2).await;
        let css = course_id(&pool, "CSS").await;

        let plain = service
            .upload(LessonUploadInput {
                title: "Grid".to_string(),
                course_id: Some(css.clone()),
                visibility: "secret".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(plain.lesson.visibility, LessonVisibility::Public);
        assert!(plain.lesson.file_path.is_none());

        let err = service
            .upload(LessonUploadInput {
                title: "Big".to_string(),
                course_id: Some(css),
                file: Some(UploadedFile {
                    file_name: "big.zip".to_string(),
                    content_type: None,
                    data: vec![0; 3],
                }),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LessonServiceError::ValidationError(_)));
    }
}
