//! Request middleware and extractors
//!
//! - `load_session` resolves the session cookie into a [`CurrentSession`]
//! - `render_error_pages` turns [`ErrorPage`] responses into full pages
//! - `RequireFaculty`, `RequireStudent` and `RequireStaff` run the access
//!   guard; a refusal is a `303 See Other` redirect

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue},
    middleware::Next,
    response::{Redirect, Response},
};

use crate::models::{Role, Session, User};
use crate::services::guard::{self, GuardOutcome};
use crate::views::PageVars;

use super::error::{ErrorPage, WebError};
use super::state::AppState;

/// Session and user resolved from the request cookie
#[derive(Debug, Clone, Default)]
pub struct CurrentSession {
    pub session: Option<Session>,
    pub user: Option<User>,
}

impl CurrentSession {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentSession>().cloned().unwrap_or_default())
    }
}

/// Extract the value of cookie `name`
pub fn extract_session_cookie(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    let prefix = format!("{}=", name);
    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(prefix.as_str()))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// `Set-Cookie` value for a session
pub fn session_cookie(name: &str, session: &Session, ttl_hours: i64) -> Result<HeaderValue, WebError> {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name,
        session.id,
        ttl_hours.max(0) * 60 * 60
    );
    HeaderValue::from_str(&cookie)
        .map_err(|e| WebError::Internal(anyhow::anyhow!("Invalid session cookie: {}", e)))
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(name: &str) -> Result<HeaderValue, WebError> {
    HeaderValue::from_str(&format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name))
        .map_err(|e| WebError::Internal(anyhow::anyhow!("Invalid session cookie: {}", e)))
}

/// Load the session named by the cookie and its user, if any
pub async fn load_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let mut current = CurrentSession::default();

    if let Some(id) = extract_session_cookie(request.headers(), &state.config.session.cookie_name) {
        if let Some(session) = state.session_service.load(&id).await? {
            if let Some(user_id) = session.user_id {
                current.user = state.user_service.get_by_id(user_id).await?;
            }
            current.session = Some(session);
        }
    }

    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

/// Render `error.html` for responses produced by [`WebError`]
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let user = request
        .extensions()
        .get::<CurrentSession>()
        .and_then(|current| current.user.clone());
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let Some(page) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };

    let vars = PageVars::new(state.site_assets().await, path).with_user(user.as_ref());
    let html = state
        .views
        .render_error_page(page.status.as_u16(), page.title, &page.message, &vars);

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Fallback for unmatched routes
pub async fn not_found(request: Request) -> WebError {
    WebError::not_found(request.uri().path().to_string())
}

fn guarded(parts: &Parts, check: impl Fn(Option<&User>) -> GuardOutcome) -> Result<User, Redirect> {
    let user = parts
        .extensions
        .get::<CurrentSession>()
        .and_then(|current| current.user.as_ref());

    match (check(user), user) {
        (GuardOutcome::Proceed, Some(user)) => Ok(user.clone()),
        (GuardOutcome::Proceed, None) => Err(Redirect::to(guard::LOGIN_URL)),
        (GuardOutcome::Redirect(to), _) => Err(Redirect::to(to)),
    }
}

/// A logged-in user holding the Faculty role
#[derive(Debug, Clone)]
pub struct RequireFaculty(pub User);

impl<S: Send + Sync> FromRequestParts<S> for RequireFaculty {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        guarded(parts, |user| guard::check(user, Role::Faculty)).map(RequireFaculty)
    }
}

/// A logged-in user holding the Student role
#[derive(Debug, Clone)]
pub struct RequireStudent(pub User);

impl<S: Send + Sync> FromRequestParts<S> for RequireStudent {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        guarded(parts, |user| guard::check(user, Role::Student)).map(RequireStudent)
    }
}

/// A logged-in staff or superuser account
#[derive(Debug, Clone)]
pub struct RequireStaff(pub User);

impl<S: Send + Sync> FromRequestParts<S> for RequireStaff {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        guarded(parts, guard::check_staff).map(RequireStaff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, Request as HttpRequest, StatusCode};
    use axum::response::IntoResponse;
    use chrono::Duration;
    use std::collections::BTreeSet;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn parts_with(user: Option<User>) -> Parts {
        let (mut parts, _) = HttpRequest::builder().uri("/x").body(()).unwrap().into_parts();
        parts.extensions.insert(CurrentSession { session: None, user });
        parts
    }

    fn user(roles: &[Role], is_staff: bool) -> User {
        User {
            id: 1,
            username: "someone".to_string(),
            email: String::new(),
            first_name: String::new(),
            password_hash: String::new(),
            is_staff,
            is_superuser: false,
            roles: roles.iter().copied().collect::<BTreeSet<_>>(),
            created_at: chrono::Utc::now(),
        }
    }

    fn location(redirect: Redirect) -> String {
        let response = redirect.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        response.headers()[header::LOCATION].to_str().unwrap().to_string()
    }

    #[test]
    fn test_extract_session_cookie() {
        let headers = headers_with_cookie("theme=dark; sessionid=abc123; other=1");
        assert_eq!(extract_session_cookie(&headers, "sessionid"), Some("abc123".to_string()));
        assert_eq!(extract_session_cookie(&headers, "session"), None);
        assert_eq!(extract_session_cookie(&headers_with_cookie("sessionid="), "sessionid"), None);
        assert_eq!(extract_session_cookie(&HeaderMap::new(), "sessionid"), None);
    }

    #[test]
    fn test_session_cookie_format() {
        let session = Session::new(Duration::hours(1));
        let cookie = session_cookie("sessionid", &session, 336).unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with(&format!("sessionid={};", session.id)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=1209600"));

        let cleared = clear_session_cookie("sessionid").unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_require_faculty_redirects() {
        let mut anonymous = parts_with(None);
        let err = RequireFaculty::from_request_parts(&mut anonymous, &()).await.unwrap_err();
        assert_eq!(location(err), "/login");

        let mut student = parts_with(Some(user(&[Role::Student], false)));
        let err = RequireFaculty::from_request_parts(&mut student, &()).await.unwrap_err();
        assert_eq!(location(err), "/student/");

        let mut faculty = parts_with(Some(user(&[Role::Faculty], false)));
        assert!(RequireFaculty::from_request_parts(&mut faculty, &()).await.is_ok());
    }

    #[tokio::test]
    async fn test_require_student_sends_staff_to_console() {
        let mut staff = parts_with(Some(user(&[], true)));
        let err = RequireStudent::from_request_parts(&mut staff, &()).await.unwrap_err();
        assert_eq!(location(err), "/admin/");
    }

    #[tokio::test]
    async fn test_require_staff() {
        let mut anonymous = parts_with(None);
        let err = RequireStaff::from_request_parts(&mut anonymous, &()).await.unwrap_err();
        assert_eq!(location(err), "/admin/login");

        let mut student = parts_with(Some(user(&[Role::Student], false)));
        let err = RequireStaff::from_request_parts(&mut student, &()).await.unwrap_err();
        assert_eq!(location(err), "/login");

        let mut staff = parts_with(Some(user(&[], true)));
        assert!(RequireStaff::from_request_parts(&mut staff, &()).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_extension_is_anonymous() {
        let (mut parts, _) = HttpRequest::builder().uri("/").body(()).unwrap().into_parts();
        let current = CurrentSession::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(current.user().is_none());
        assert!(current.session.is_none());
    }
}
