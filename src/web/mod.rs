//! Web layer - HTTP handlers and routing
//!
//! Server-rendered pages for SkillHub:
//! - Public pages and the login flow
//! - Faculty area (catalog management, lesson uploads)
//! - Student area (catalog, enrollment, attendance)
//! - Administrative console
//! - Uploaded media under the configured media URL

pub mod admin;
pub mod auth;
pub mod error;
pub mod faculty;
pub mod middleware;
pub mod pages;
pub mod state;
pub mod student;

use std::collections::HashMap;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart},
    http::StatusCode,
    middleware as axum_middleware,
    response::Html,
    Router,
};
use serde::Serialize;
use tera::Context as TeraContext;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::models::User;
use crate::services::{MediaError, UploadedFile};
use crate::views::PageVars;

pub use error::WebError;
pub use middleware::{CurrentSession, RequireFaculty, RequireStaff, RequireStudent};
pub use state::AppState;

/// Multipart overhead allowed on top of the largest accepted file
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();
    let body_limit = usize::try_from(config.upload.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let mut router = Router::new()
        .merge(pages::router())
        .merge(auth::router())
        .merge(faculty::router())
        .merge(student::router())
        .merge(admin::router());

    let media_prefix = config.site.media_url.trim_end_matches('/');
    if media_prefix.starts_with('/') && media_prefix.len() > 1 {
        router = router.nest_service(media_prefix, ServeDir::new(&config.upload.path));
    } else {
        tracing::warn!(
            "Media URL {} is not a local path; uploaded files are not served",
            config.site.media_url
        );
    }

    router
        .fallback(middleware::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::load_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Render a page with the site assets and the current user
pub(crate) async fn render(
    state: &AppState,
    user: Option<&User>,
    path: &str,
    template: &str,
    context: &TeraContext,
) -> Result<Html<String>, WebError> {
    let vars = PageVars::new(state.site_assets().await, path).with_user(user);
    let html = state.views.render_page(template, context, &vars)?;
    Ok(Html(html))
}

/// Text fields and files of a multipart form
#[derive(Debug, Default)]
pub(crate) struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
    too_large: bool,
}

/// Whether reading stopped at the request body limit
enum FieldRead<T> {
    Value(T),
    OverLimit,
}

fn field_read<T>(result: Result<T, MultipartError>) -> Result<FieldRead<T>, WebError> {
    match result {
        Ok(value) => Ok(FieldRead::Value(value)),
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => Ok(FieldRead::OverLimit),
        Err(e) => Err(WebError::BadRequest(format!("Failed to read form: {}", e))),
    }
}

impl MultipartForm {
    /// Read every field; parts with a file name are kept as files. A body
    /// over the size limit stops the read and marks the form as too large.
    pub async fn read(mut multipart: Multipart) -> Result<Self, WebError> {
        let mut form = Self::default();

        loop {
            let field = match field_read(multipart.next_field().await)? {
                FieldRead::Value(Some(field)) => field,
                FieldRead::Value(None) => break,
                FieldRead::OverLimit => {
                    form.too_large = true;
                    break;
                }
            };

            let name = field.name().unwrap_or("").to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let FieldRead::Value(data) = field_read(field.bytes().await)? else {
                        form.too_large = true;
                        break;
                    };
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            data: data.to_vec(),
                        },
                    );
                }
                None => {
                    let FieldRead::Value(value) = field_read(field.text().await)? else {
                        form.too_large = true;
                        break;
                    };
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// True when the body hit the upload limit; the form is incomplete
    pub fn too_large(&self) -> bool {
        self.too_large
    }

    /// A text field, empty if absent
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// A file field, absent when nothing was chosen
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name).filter(|file| !file.file_name.is_empty())
    }
}

/// Inline message for an upload over `upload.max_file_size`
pub(crate) fn file_too_large_message(state: &AppState) -> String {
    MediaError::TooLarge {
        max_bytes: state.config.upload.max_file_size,
    }
    .to_string()
}

/// Placeholder page content for topics without their own screens yet
#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct Topic {
    pub title: &'static str,
    pub summary: &'static str,
    pub items: &'static [&'static str],
}
