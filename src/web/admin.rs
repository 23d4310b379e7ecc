//! Administrative console
//!
//! Every form posts back to its own route and the console is rendered again
//! with the outcome. Lessons, enrollments and attendance have read-only
//! listings filtered through the query string.

use axum::{
    extract::{Multipart, OriginalUri, Path, Query, State},
    response::Html,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::models::{AttendanceSource, LedgerFilter, LessonFilter, LessonVisibility, PageSlot, User};
use crate::services::BrandingServiceError;

use super::{file_too_large_message, render, AppState, MultipartForm, RequireStaff, WebError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(console))
        .route("/admin/", get(console))
        .route("/admin/branding", post(update_branding))
        .route("/admin/images", post(add_image))
        .route("/admin/images/{id}/toggle", post(toggle_image))
        .route("/admin/categories/{id}/delete", post(delete_category))
        .route("/admin/courses/{id}/delete", post(delete_course))
        .route("/admin/lessons", get(list_lessons))
        .route("/admin/enrollments", get(list_enrollments))
        .route("/admin/attendance", get(list_attendance))
}

/// Filter form of the read-only listings. Unparseable values are ignored.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct ListingQuery {
    category: String,
    q: String,
    source: String,
    date: String,
    visibility: String,
}

impl ListingQuery {
    fn category_id(&self) -> Option<i64> {
        parse_id(self.category.trim())
    }

    fn search(&self) -> Option<String> {
        let q = self.q.trim();
        (!q.is_empty()).then(|| q.to_string())
    }

    fn ledger_filter(&self) -> LedgerFilter {
        LedgerFilter {
            category_id: self.category_id(),
            search: self.search(),
            source: self.source.trim().parse::<AttendanceSource>().ok(),
            date: NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok(),
        }
    }

    fn lesson_filter(&self) -> LessonFilter {
        LessonFilter {
            category_id: self.category_id(),
            visibility: self.visibility.trim().parse::<LessonVisibility>().ok(),
            search: self.search(),
        }
    }
}

/// Context shared by the listing pages
async fn listing_context(state: &AppState, query: &ListingQuery) -> Result<TeraContext, WebError> {
    let mut context = TeraContext::new();
    context.insert("filter", query);
    context.insert("selected_category", &query.category_id());
    context.insert("categories", &state.catalog_service.list_categories().await?);
    Ok(context)
}

#[derive(Debug, Serialize)]
struct SlotOption {
    value: &'static str,
    label: &'static str,
}

/// Outcome line shown above the console
enum Flash {
    None,
    Message(String),
    Error(String),
}

async fn render_console(
    state: &AppState,
    user: &User,
    path: &str,
    flash: Flash,
) -> Result<Html<String>, WebError> {
    let (message, error) = match flash {
        Flash::None => (String::new(), String::new()),
        Flash::Message(message) => (message, String::new()),
        Flash::Error(error) => (String::new(), error),
    };
    let page_slots: Vec<SlotOption> = PageSlot::ALL
        .iter()
        .map(|slot| SlotOption {
            value: slot.as_str(),
            label: slot.label(),
        })
        .collect();

    let mut context = TeraContext::new();
    context.insert("message", &message);
    context.insert("error", &error);
    context.insert("counts", &state.catalog_service.counts().await?);
    context.insert("page_slots", &page_slots);
    context.insert("images", &state.branding_service.list_images().await?);
    context.insert("categories", &state.catalog_service.list_categories().await?);
    context.insert("courses", &state.catalog_service.all_courses().await?);
    render(state, Some(user), path, "admin/console.html", &context).await
}

/// Turn a branding outcome into a console flash
fn flash_from(result: Result<String, BrandingServiceError>) -> Result<Flash, WebError> {
    match result {
        Ok(message) => Ok(Flash::Message(message)),
        Err(BrandingServiceError::ValidationError(error)) => Ok(Flash::Error(error)),
        Err(BrandingServiceError::ImageNotFound(_)) => Ok(Flash::Error("Image not found.".to_string())),
        Err(e) => Err(e.into()),
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

async fn console(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    render_console(&state, &user, uri.path(), Flash::None).await
}

async fn update_branding(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    uri: OriginalUri,
    multipart: Multipart,
) -> Result<Html<String>, WebError> {
    let mut form = MultipartForm::read(multipart).await?;
    if form.too_large() {
        let flash = Flash::Error(file_too_large_message(&state));
        return render_console(&state, &user, uri.path(), flash).await;
    }
    let logo = form.take_file("logo");
    let result = state
        .branding_service
        .update_branding(form.text("site_name"), logo.as_ref())
        .await
        .map(|branding| format!("Site name set to \"{}\".", branding.site_name));
    let flash = flash_from(result)?;
    render_console(&state, &user, uri.path(), flash).await
}

async fn add_image(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    uri: OriginalUri,
    multipart: Multipart,
) -> Result<Html<String>, WebError> {
    let mut form = MultipartForm::read(multipart).await?;
    if form.too_large() {
        let flash = Flash::Error(file_too_large_message(&state));
        return render_console(&state, &user, uri.path(), flash).await;
    }
    let image = form.take_file("image");
    let result = state
        .branding_service
        .add_image(form.text("title"), form.text("page"), image.as_ref())
        .await
        .map(|image| format!("Image \"{}\" added to {}.", image.title, image.page.label()));
    let flash = flash_from(result)?;
    render_console(&state, &user, uri.path(), flash).await
}

async fn toggle_image(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    uri: OriginalUri,
    Path(id): Path<String>,
) -> Result<Html<String>, WebError> {
    let flash = match parse_id(&id) {
        Some(id) => flash_from(state.branding_service.toggle_image(id).await.map(|active| {
            if active {
                "Image activated.".to_string()
            } else {
                "Image deactivated.".to_string()
            }
        }))?,
        None => Flash::Error("Image not found.".to_string()),
    };
    render_console(&state, &user, uri.path(), flash).await
}

async fn delete_category(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    uri: OriginalUri,
    Path(id): Path<String>,
) -> Result<Html<String>, WebError> {
    let deleted = match parse_id(&id) {
        Some(id) => state.catalog_service.delete_category(id).await?,
        None => false,
    };
    let flash = if deleted {
        tracing::info!("Category {} deleted by {}", id, user.username);
        Flash::Message("Category deleted with its courses.".to_string())
    } else {
        Flash::Error("Category not found.".to_string())
    };
    render_console(&state, &user, uri.path(), flash).await
}

async fn delete_course(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    uri: OriginalUri,
    Path(id): Path<String>,
) -> Result<Html<String>, WebError> {
    let deleted = match parse_id(&id) {
        Some(id) => state.catalog_service.delete_course(id).await?,
        None => false,
    };
    let flash = if deleted {
        tracing::info!("Course {} deleted by {}", id, user.username);
        Flash::Message("Course deleted.".to_string())
    } else {
        Flash::Error("Course not found.".to_string())
    };
    render_console(&state, &user, uri.path(), flash).await
}

async fn list_lessons(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    uri: OriginalUri,
    Query(query): Query<ListingQuery>,
) -> Result<Html<String>, WebError> {
    let mut context = listing_context(&state, &query).await?;
    context.insert(
        "lessons",
        &state.catalog_service.list_lessons(&query.lesson_filter()).await?,
    );
    render(&state, Some(&user), uri.path(), "admin/lessons.html", &context).await
}

async fn list_enrollments(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    uri: OriginalUri,
    Query(query): Query<ListingQuery>,
) -> Result<Html<String>, WebError> {
    let mut context = listing_context(&state, &query).await?;
    context.insert(
        "enrollments",
        &state.ledger_service.list_enrollments(&query.ledger_filter()).await?,
    );
    render(&state, Some(&user), uri.path(), "admin/enrollments.html", &context).await
}

async fn list_attendance(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    uri: OriginalUri,
    Query(query): Query<ListingQuery>,
) -> Result<Html<String>, WebError> {
    let mut context = listing_context(&state, &query).await?;
    context.insert(
        "records",
        &state.ledger_service.list_attendance(&query.ledger_filter()).await?,
    );
    render(&state, Some(&user), uri.path(), "admin/attendance.html", &context).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_filter_parses_known_values() {
        let query = ListingQuery {
            category: "3".to_string(),
            q: " student1 ".to_string(),
            source: "enroll".to_string(),
            date: "2024-01-05".to_string(),
            ..Default::default()
        };
        let filter = query.ledger_filter();
        assert_eq!(filter.category_id, Some(3));
        assert_eq!(filter.search.as_deref(), Some("student1"));
        assert_eq!(filter.source, Some(AttendanceSource::Enroll));
        assert_eq!(filter.date, NaiveDate::from_ymd_opt(2024, 1, 5));
    }

    #[test]
    fn test_unparseable_values_match_everything() {
        let query = ListingQuery {
            category: "abc".to_string(),
            q: "   ".to_string(),
            source: "teleport".to_string(),
            date: "05/01/2024".to_string(),
            visibility: "secret".to_string(),
        };
        assert_eq!(query.ledger_filter(), LedgerFilter::default());
        assert_eq!(query.lesson_filter(), LessonFilter::default());

        let drafts = ListingQuery {
            visibility: "draft".to_string(),
            ..Default::default()
        };
        assert_eq!(drafts.lesson_filter().visibility, Some(LessonVisibility::Draft));
    }
}
