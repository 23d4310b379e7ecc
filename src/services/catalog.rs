//! Catalog service
//!
//! Categories and courses:
//! - category resolution for the course creation form
//! - course creation with the form's validation messages
//! - grouped listings for the faculty overview and the student catalog
//! - deletion from the administrative console

use crate::db::repositories::{
    CategoryRepository, CourseRepository, EnrollmentRepository, LessonRepository,
};
use crate::models::{
    normalize_category_name, parse_duration_hours, CatalogCounts, CatalogCourse, CategoryGroup,
    Course, CourseCategory, CourseLevel, CourseStats, CourseWithCategory, LessonFilter,
    LessonWithCourse, NewCourse,
};
use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;

/// Number of lessons shown on the upload page
pub const RECENT_LESSON_LIMIT: i64 = 10;

/// Rows shown on the administrative lesson listing
pub const LESSON_LISTING_LIMIT: i64 = 200;

/// Error types for catalog service operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogServiceError {
    /// Form input rejected; the message is shown on the form
    #[error("{0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Raw course creation form input
#[derive(Debug, Clone, Default)]
pub struct CreateCourseInput {
    pub title: String,
    pub description: String,
    pub level: String,
    pub duration_hours: String,
    pub category_id: Option<String>,
    pub new_category_name: Option<String>,
    pub created_by: Option<i64>,
}

/// A freshly created course and the category it landed in
#[derive(Debug, Clone)]
pub struct CreatedCourse {
    pub course: Course,
    pub category: CourseCategory,
}

impl CreatedCourse {
    /// Confirmation shown on the creation form
    pub fn message(&self) -> String {
        format!(
            "Course \"{}\" created under \"{}\".",
            self.course.title, self.category.name
        )
    }
}

/// Catalog service
pub struct CatalogService {
    categories: Arc<dyn CategoryRepository>,
    courses: Arc<dyn CourseRepository>,
    lessons: Arc<dyn LessonRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl CatalogService {
    /// Create a new catalog service
    pub fn new(
        categories: Arc<dyn CategoryRepository>,
        courses: Arc<dyn CourseRepository>,
        lessons: Arc<dyn LessonRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            categories,
            courses,
            lessons,
            enrollments,
        }
    }

    /// Resolve the category picked (or typed) on the course creation form.
    ///
    /// A non-blank new name wins: an existing category with the same name in
    /// any case is reused, otherwise it is created. Without one, the selected
    /// id is looked up; a non-numeric or unknown id resolves to none.
    pub async fn resolve_category(
        &self,
        category_id: Option<&str>,
        new_category_name: Option<&str>,
    ) -> Result<Option<CourseCategory>, CatalogServiceError> {
        if let Some(name) = new_category_name.and_then(normalize_category_name) {
            let category = self
                .categories
                .create_or_get(&name)
                .await
                .context("Failed to resolve category by name")?;
            return Ok(Some(category));
        }

        let Some(id) = category_id.and_then(|raw| raw.trim().parse::<i64>().ok()) else {
            return Ok(None);
        };

        let category = self
            .categories
            .get_by_id(id)
            .await
            .context("Failed to get category")?;
        Ok(category)
    }

    /// Create a course from the creation form.
    ///
    /// The category is resolved (and possibly created) before the title is
    /// checked.
    pub async fn create_course(
        &self,
        input: CreateCourseInput,
    ) -> Result<CreatedCourse, CatalogServiceError> {
        let category = self
            .resolve_category(
                input.category_id.as_deref(),
                input.new_category_name.as_deref(),
            )
            .await?;

        let title = input.title.trim();
        if title.is_empty() {
            return Err(CatalogServiceError::ValidationError(
                "Course title is required.".to_string(),
            ));
        }
        let Some(category) = category else {
            return Err(CatalogServiceError::ValidationError(
                "Select a category or create a new one.".to_string(),
            ));
        };

        let new_course = NewCourse {
            category_id: category.id,
            title: title.to_string(),
            description: input.description.trim().to_string(),
            level: CourseLevel::parse_or_default(&input.level),
            duration_hours: parse_duration_hours(&input.duration_hours),
            created_by: input.created_by,
        };

        let Some(course) = self
            .courses
            .create_if_absent(&new_course)
            .await
            .context("Failed to create course")?
        else {
            return Err(CatalogServiceError::ValidationError(
                "This course already exists in the selected category.".to_string(),
            ));
        };

        tracing::info!("Created course {} under {}", course.title, category.name);
        Ok(CreatedCourse { course, category })
    }

    /// All categories by name
    pub async fn list_categories(&self) -> Result<Vec<CourseCategory>, CatalogServiceError> {
        let categories = self.categories.list().await.context("Failed to list categories")?;
        Ok(categories)
    }

    /// Faculty dashboard counters
    pub async fn counts(&self) -> Result<CatalogCounts, CatalogServiceError> {
        Ok(CatalogCounts {
            category_count: self.categories.count().await.context("Failed to count categories")?,
            course_count: self.courses.count().await.context("Failed to count courses")?,
            lesson_count: self.lessons.count().await.context("Failed to count lessons")?,
            enrollment_count: self
                .enrollments
                .count()
                .await
                .context("Failed to count enrollments")?,
        })
    }

    /// Every category with its active courses and their counters
    pub async fn faculty_overview(
        &self,
    ) -> Result<Vec<CategoryGroup<CourseStats>>, CatalogServiceError> {
        let categories = self.list_categories().await?;
        let stats = self
            .courses
            .list_active_stats()
            .await
            .context("Failed to list course statistics")?;

        Ok(group_by_category(categories, stats, |s| s.course.category_id))
    }

    /// Every category with its active courses, each carrying its public
    /// lessons newest first
    pub async fn student_catalog(
        &self,
    ) -> Result<Vec<CategoryGroup<CatalogCourse>>, CatalogServiceError> {
        let categories = self.list_categories().await?;
        let stats = self
            .courses
            .list_active_stats()
            .await
            .context("Failed to list course statistics")?;

        let mut lessons_by_course: HashMap<i64, Vec<_>> = HashMap::new();
        for lesson in self
            .lessons
            .list_public()
            .await
            .context("Failed to list public lessons")?
        {
            lessons_by_course.entry(lesson.course_id).or_default().push(lesson);
        }

        let courses = stats
            .into_iter()
            .map(|stats| CatalogCourse {
                lessons: lessons_by_course.remove(&stats.course.id).unwrap_or_default(),
                stats,
            })
            .collect();

        Ok(group_by_category(categories, courses, |c| {
            c.stats.course.category_id
        }))
    }

    /// Active courses ordered by category name then title
    pub async fn active_courses(&self) -> Result<Vec<CourseWithCategory>, CatalogServiceError> {
        let courses = self
            .courses
            .list_active_with_category()
            .await
            .context("Failed to list active courses")?;
        Ok(courses)
    }

    /// Every course, active or not, ordered by category name then title
    pub async fn all_courses(&self) -> Result<Vec<CourseWithCategory>, CatalogServiceError> {
        let courses = self
            .courses
            .list_with_category()
            .await
            .context("Failed to list courses")?;
        Ok(courses)
    }

    /// The most recently added lessons
    pub async fn recent_lessons(&self) -> Result<Vec<LessonWithCourse>, CatalogServiceError> {
        let lessons = self
            .lessons
            .list_recent(RECENT_LESSON_LIMIT)
            .await
            .context("Failed to list recent lessons")?;
        Ok(lessons)
    }

    /// Lessons for the admin listing, newest first
    pub async fn list_lessons(
        &self,
        filter: &LessonFilter,
    ) -> Result<Vec<LessonWithCourse>, CatalogServiceError> {
        let lessons = self
            .lessons
            .list_filtered(filter, LESSON_LISTING_LIMIT)
            .await
            .context("Failed to list lessons")?;
        Ok(lessons)
    }

    /// Delete a category with its courses, lessons, enrollments and attendance
    pub async fn delete_category(&self, id: i64) -> Result<bool, CatalogServiceError> {
        let deleted = self
            .categories
            .delete(id)
            .await
            .context("Failed to delete category")?;
        if deleted {
            tracing::info!("Deleted category {}", id);
        }
        Ok(deleted)
    }

    /// Delete a course with its lessons, enrollments and attendance
    pub async fn delete_course(&self, id: i64) -> Result<bool, CatalogServiceError> {
        let deleted = self.courses.delete(id).await.context("Failed to delete course")?;
        if deleted {
            tracing::info!("Deleted course {}", id);
        }
        Ok(deleted)
    }
}

/// Attach items to their category, keeping both orders. Categories without
/// items are kept with an empty list.
fn group_by_category<T>(
    categories: Vec<CourseCategory>,
    items: Vec<T>,
    category_of: impl Fn(&T) -> i64,
) -> Vec<CategoryGroup<T>> {
    let mut by_category: HashMap<i64, Vec<T>> = HashMap::new();
    for item in items {
        by_category.entry(category_of(&item)).or_default().push(item);
    }

    categories
        .into_iter()
        .map(|category| CategoryGroup {
            courses: by_category.remove(&category.id).unwrap_or_default(),
            category,
        })
        .collect()
}
