//! Student area

use axum::{
    extract::{OriginalUri, Path, State},
    http::Method,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{any, get},
    Router,
};
use tera::Context as TeraContext;

use crate::models::User;
use crate::services::{LedgerOutcome, STUDENT_NOTICE_KEY};

use super::{render, AppState, CurrentSession, RequireStudent, Topic, WebError};

const CATALOG_URL: &str = "/student/courses";

const PYTHON: Topic = Topic {
    title: "Python",
    summary: "Practice Python step by step.",
    items: &["Variables and types", "Loops and conditions", "Functions"],
};

const SQL: Topic = Topic {
    title: "SQL",
    summary: "Query and shape data with SQL.",
    items: &["SELECT and WHERE", "Joins", "Grouping and aggregates"],
};

const HTML: Topic = Topic {
    title: "HTML",
    summary: "Structure web pages with HTML.",
    items: &["Document structure", "Links and images", "Forms"],
};

const CSS: Topic = Topic {
    title: "CSS",
    summary: "Style web pages with CSS.",
    items: &["Selectors", "Box model", "Flexbox and grid"],
};

const QUIZ: Topic = Topic {
    title: "Quiz",
    summary: "Check what you have learned so far.",
    items: &["Python basics", "SQL basics", "HTML and CSS basics"],
};

const PROGRESS: Topic = Topic {
    title: "Progress",
    summary: "Your attendance page shows the days you attended each course.",
    items: &["Enroll in a course", "Enter it on the days you study", "Review your attendance"],
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/student", get(dashboard))
        .route("/student/", get(dashboard))
        .route("/student/courses", get(courses))
        .route("/student/course/{id}/enroll", any(enroll))
        .route("/student/course/{id}/enter", any(enter))
        .route("/student/python", get(python))
        .route("/student/sql", get(sql))
        .route("/student/html", get(html))
        .route("/student/css", get(css))
        .route("/student/quiz", get(quiz))
        .route("/student/progress", get(progress))
        .route("/student/attendance", get(attendance))
}

async fn dashboard(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    render(&state, Some(&user), uri.path(), "student/dashboard.html", &TeraContext::new()).await
}

/// Catalog grouped by category, with the notice left by enroll/enter
async fn courses(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    current: CurrentSession,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    let notice = match current.session {
        Some(mut session) => state
            .session_service
            .take(&mut session, STUDENT_NOTICE_KEY)
            .await?
            .unwrap_or_default(),
        None => String::new(),
    };

    let mut enrolled_ids: Vec<i64> = state
        .ledger_service
        .enrolled_course_ids(user.id)
        .await?
        .into_iter()
        .collect();
    enrolled_ids.sort_unstable();

    let mut context = TeraContext::new();
    context.insert("notice", &notice);
    context.insert("categories", &state.catalog_service.student_catalog().await?);
    context.insert("enrolled_ids", &enrolled_ids);
    render(&state, Some(&user), uri.path(), "student/courses.html", &context).await
}

/// Path ids that are not numbers name no course
fn course_id(raw: &str) -> Result<i64, WebError> {
    raw.parse()
        .map_err(|_| WebError::not_found(format!("course {}", raw)))
}

/// Store the ledger notice and go back to the catalog
async fn back_to_catalog(
    state: &AppState,
    current: CurrentSession,
    outcome: LedgerOutcome,
) -> Result<Response, WebError> {
    if let Some(mut session) = current.session {
        state
            .session_service
            .set(&mut session, STUDENT_NOTICE_KEY, outcome.notice)
            .await?;
    }
    Ok(Redirect::to(CATALOG_URL).into_response())
}

/// Enroll; only POST acts, other methods land on the catalog
async fn enroll(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    current: CurrentSession,
    method: Method,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    if method != Method::POST {
        return Ok(Redirect::to(CATALOG_URL).into_response());
    }
    let outcome = state.ledger_service.enroll(user.id, course_id(&id)?).await?;
    back_to_catalog(&state, current, outcome).await
}

/// Enter a course with any method
async fn enter(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    current: CurrentSession,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    let outcome = state.ledger_service.enter(user.id, course_id(&id)?).await?;
    back_to_catalog(&state, current, outcome).await
}

async fn topic_page(state: &AppState, user: &User, path: &str, topic: Topic) -> Result<Html<String>, WebError> {
    let mut context = TeraContext::new();
    context.insert("topic", &topic);
    render(state, Some(user), path, "student/topic.html", &context).await
}

async fn python(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    topic_page(&state, &user, uri.path(), PYTHON).await
}

async fn sql(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    topic_page(&state, &user, uri.path(), SQL).await
}

async fn html(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    topic_page(&state, &user, uri.path(), HTML).await
}

async fn css(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    topic_page(&state, &user, uri.path(), CSS).await
}

async fn quiz(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    topic_page(&state, &user, uri.path(), QUIZ).await
}

async fn progress(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    topic_page(&state, &user, uri.path(), PROGRESS).await
}

async fn attendance(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    let mut context = TeraContext::new();
    context.insert("rows", &state.ledger_service.attendance_summary(user.id).await?);
    context.insert("history", &state.ledger_service.attendance_history(user.id).await?);
    render(&state, Some(&user), uri.path(), "student/attendance.html", &context).await
}
