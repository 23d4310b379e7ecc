//! Public pages

use axum::{
    extract::{OriginalUri, State},
    response::Html,
    routing::get,
    Router,
};
use tera::Context as TeraContext;

use super::{render, AppState, CurrentSession, WebError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(front))
        .route("/about", get(about))
        .route("/course", get(course))
        .route("/contact", get(contact))
        .route("/testimonials", get(testimonials))
        .route("/bastion", get(bastion))
        .route("/privacy", get(privacy))
        .route("/terms", get(terms))
}

async fn static_page(
    state: &AppState,
    current: &CurrentSession,
    uri: &OriginalUri,
    template: &str,
) -> Result<Html<String>, WebError> {
    render(state, current.user(), uri.path(), template, &TeraContext::new()).await
}

async fn front(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    static_page(&state, &current, &uri, "pages/front.html").await
}

async fn about(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    static_page(&state, &current, &uri, "pages/about.html").await
}

async fn course(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    static_page(&state, &current, &uri, "pages/course.html").await
}

async fn contact(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    static_page(&state, &current, &uri, "pages/contact.html").await
}

async fn testimonials(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    static_page(&state, &current, &uri, "pages/testimonials.html").await
}

async fn bastion(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    static_page(&state, &current, &uri, "pages/bastion.html").await
}

async fn privacy(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    static_page(&state, &current, &uri, "pages/privacy.html").await
}

async fn terms(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
) -> Result<Html<String>, WebError> {
    static_page(&state, &current, &uri, "pages/terms.html").await
}
