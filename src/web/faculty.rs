//! Faculty area

use axum::{
    extract::{Multipart, OriginalUri, State},
    response::Html,
    routing::get,
    Form, Router,
};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::models::{CourseLevel, LessonVisibility, LessonWithCourse, User};
use crate::services::{CatalogServiceError, CreateCourseInput, LessonServiceError, LessonUploadInput};

use super::{
    file_too_large_message, render, AppState, MultipartForm, RequireFaculty, Topic, WebError,
};

const LEVELS: [CourseLevel; 3] = [
    CourseLevel::Beginner,
    CourseLevel::Intermediate,
    CourseLevel::Advanced,
];

const VISIBILITIES: [LessonVisibility; 3] = [
    LessonVisibility::Public,
    LessonVisibility::Private,
    LessonVisibility::Draft,
];

const WEB_COURSES: Topic = Topic {
    title: "Web Development",
    summary: "Front-end and back-end tracks for building websites.",
    items: &["HTML and CSS foundations", "JavaScript essentials", "Server-side frameworks"],
};

const PYTHON_COURSES: Topic = Topic {
    title: "Python",
    summary: "Python programming from syntax to small projects.",
    items: &["Syntax and data types", "Functions and modules", "Working with files"],
};

const DATA_COURSES: Topic = Topic {
    title: "Data Analysis",
    summary: "Spreadsheets, SQL and visualisation.",
    items: &["Excel for analysis", "SQL queries", "Charts and dashboards"],
};

const MODULES: Topic = Topic {
    title: "Course Modules",
    summary: "Modules are organised per course; add lessons to build them up.",
    items: &["Plan the module outline", "Upload lesson material", "Review student attendance"],
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/faculty", get(dashboard))
        .route("/faculty/", get(dashboard))
        .route("/faculty/courses", get(courses))
        .route("/faculty/courses/web", get(web_courses))
        .route("/faculty/courses/python", get(python_courses))
        .route("/faculty/courses/data", get(data_courses))
        .route("/faculty/modules", get(modules))
        .route("/faculty/courses/new", get(course_creation_page).post(create_course))
        .route("/faculty/lessons/upload", get(lesson_upload_page).post(upload_lesson))
}

async fn dashboard(
    State(state): State<AppState>,
    RequireFaculty(user): RequireFaculty,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    let mut context = TeraContext::new();
    context.insert("counts", &state.catalog_service.counts().await?);
    render(&state, Some(&user), uri.path(), "faculty/dashboard.html", &context).await
}

async fn courses(
    State(state): State<AppState>,
    RequireFaculty(user): RequireFaculty,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    let mut context = TeraContext::new();
    context.insert("categories", &state.catalog_service.faculty_overview().await?);
    render(&state, Some(&user), uri.path(), "faculty/courses.html", &context).await
}

async fn topic_page(state: &AppState, user: &User, path: &str, topic: Topic) -> Result<Html<String>, WebError> {
    let mut context = TeraContext::new();
    context.insert("topic", &topic);
    render(state, Some(user), path, "faculty/topic.html", &context).await
}

async fn web_courses(
    State(state): State<AppState>,
    RequireFaculty(user): RequireFaculty,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    topic_page(&state, &user, uri.path(), WEB_COURSES).await
}

async fn python_courses(
    State(state): State<AppState>,
    RequireFaculty(user): RequireFaculty,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    topic_page(&state, &user, uri.path(), PYTHON_COURSES).await
}

async fn data_courses(
    State(state): State<AppState>,
    RequireFaculty(user): RequireFaculty,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    topic_page(&state, &user, uri.path(), DATA_COURSES).await
}

async fn modules(
    State(state): State<AppState>,
    RequireFaculty(user): RequireFaculty,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    topic_page(&state, &user, uri.path(), MODULES).await
}

// ============================================================================
// Course creation
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CourseForm {
    title: String,
    description: String,
    level: String,
    duration_hours: String,
    category_id: String,
    new_category_name: String,
}

impl CourseForm {
    fn into_input(self, created_by: i64) -> CreateCourseInput {
        CreateCourseInput {
            title: self.title,
            description: self.description,
            level: self.level,
            duration_hours: self.duration_hours,
            category_id: Some(self.category_id).filter(|id| !id.trim().is_empty()),
            new_category_name: Some(self.new_category_name).filter(|name| !name.trim().is_empty()),
            created_by: Some(created_by),
        }
    }
}

async fn render_course_creation(
    state: &AppState,
    user: &User,
    path: &str,
    message: &str,
    error: &str,
) -> Result<Html<String>, WebError> {
    let levels: Vec<&str> = LEVELS.iter().map(CourseLevel::as_str).collect();
    let mut context = TeraContext::new();
    context.insert("message", message);
    context.insert("error", error);
    context.insert("levels", &levels);
    context.insert("categories", &state.catalog_service.list_categories().await?);
    render(state, Some(user), path, "faculty/course_creation.html", &context).await
}

async fn course_creation_page(
    State(state): State<AppState>,
    RequireFaculty(user): RequireFaculty,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    render_course_creation(&state, &user, uri.path(), "", "").await
}

async fn create_course(
    State(state): State<AppState>,
    RequireFaculty(user): RequireFaculty,
    uri: OriginalUri,
    Form(form): Form<CourseForm>,
) -> Result<Html<String>, WebError> {
    match state.catalog_service.create_course(form.into_input(user.id)).await {
        Ok(created) => {
            render_course_creation(&state, &user, uri.path(), &created.message(), "").await
        }
        Err(CatalogServiceError::ValidationError(message)) => {
            render_course_creation(&state, &user, uri.path(), "", &message).await
        }
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Lesson upload
// ============================================================================

/// A recent lesson flattened for the upload page table
#[derive(Debug, Serialize)]
struct RecentLesson {
    title: String,
    category_name: String,
    course_title: String,
    visibility: LessonVisibility,
    file_path: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<LessonWithCourse> for RecentLesson {
    fn from(entry: LessonWithCourse) -> Self {
        Self {
            title: entry.lesson.title,
            category_name: entry.category_name,
            course_title: entry.course_title,
            visibility: entry.lesson.visibility,
            file_path: entry.lesson.file_path,
            created_at: entry.lesson.created_at,
        }
    }
}

async fn render_lesson_upload(
    state: &AppState,
    user: &User,
    path: &str,
    message: &str,
    error: &str,
) -> Result<Html<String>, WebError> {
    let visibilities: Vec<&str> = VISIBILITIES.iter().map(LessonVisibility::as_str).collect();
    let recent: Vec<RecentLesson> = state
        .catalog_service
        .recent_lessons()
        .await?
        .into_iter()
        .map(RecentLesson::from)
        .collect();

    let mut context = TeraContext::new();
    context.insert("message", message);
    context.insert("error", error);
    context.insert("courses", &state.catalog_service.active_courses().await?);
    context.insert("visibilities", &visibilities);
    context.insert("recent_lessons", &recent);
    render(state, Some(user), path, "faculty/lesson_upload.html", &context).await
}

async fn lesson_upload_page(
    State(state): State<AppState>,
    RequireFaculty(user): RequireFaculty,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    render_lesson_upload(&state, &user, uri.path(), "", "").await
}

async fn upload_lesson(
    State(state): State<AppState>,
    RequireFaculty(user): RequireFaculty,
    uri: OriginalUri,
    multipart: Multipart,
) -> Result<Html<String>, WebError> {
    let mut form = MultipartForm::read(multipart).await?;
    if form.too_large() {
        let message = file_too_large_message(&state);
        return render_lesson_upload(&state, &user, uri.path(), "", &message).await;
    }
    let input = LessonUploadInput {
        title: form.text("lesson_title").to_string(),
        course_id: Some(form.text("course_id").to_string()).filter(|id| !id.trim().is_empty()),
        description: form.text("description").to_string(),
        visibility: form.text("visibility").to_string(),
        file: form.take_file("lesson_file"),
        created_by: Some(user.id),
    };

    match state.lesson_service.upload(input).await {
        Ok(uploaded) => render_lesson_upload(&state, &user, uri.path(), &uploaded.message, "").await,
        Err(LessonServiceError::ValidationError(message)) => {
            render_lesson_upload(&state, &user, uri.path(), "", &message).await
        }
        Err(e) => Err(e.into()),
    }
}
