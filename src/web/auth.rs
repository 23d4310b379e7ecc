//! Role selection, login and logout

use axum::{
    extract::{OriginalUri, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::models::{Role, User};
use crate::services::guard::{self, ADMIN_LOGIN_URL, ADMIN_URL, LOGIN_URL};
use crate::services::{UserServiceError, SELECTED_ROLE_KEY};

use super::middleware::{clear_session_cookie, session_cookie};
use super::{render, AppState, CurrentSession, WebError};

const PORTAL_URL: &str = "/portal";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/portal", get(portal_page).post(choose_portal))
        .route("/login", get(login_page).post(login))
        .route("/logout", axum::routing::post(logout))
        .route("/forget-password", get(forget_password))
        .route("/admin/login", get(admin_login_page).post(admin_login))
}

#[derive(Debug, Deserialize)]
struct PortalForm {
    #[serde(default)]
    role: String,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn portal_page(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
) -> Result<Response, WebError> {
    let html = render(&state, current.user(), uri.path(), "auth/portal.html", &TeraContext::new()).await?;
    Ok(html.into_response())
}

/// Remember which portal was picked, then continue to the login form
async fn choose_portal(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
    Form(form): Form<PortalForm>,
) -> Result<Response, WebError> {
    let choice = form.role.trim().to_lowercase();
    if choice == "admin" {
        return Ok(Redirect::to(ADMIN_LOGIN_URL).into_response());
    }

    let Ok(role) = choice.parse::<Role>() else {
        return portal_page(State(state), current, uri).await;
    };

    let (mut session, is_new) = match current.session {
        Some(session) => (session, false),
        None => (state.session_service.start().await?, true),
    };
    state
        .session_service
        .set(&mut session, SELECTED_ROLE_KEY, role.as_str().to_lowercase())
        .await?;

    let redirect = Redirect::to(LOGIN_URL);
    if is_new {
        let cookie = session_cookie(
            &state.config.session.cookie_name,
            &session,
            state.config.session.ttl_hours,
        )?;
        Ok(([(header::SET_COOKIE, cookie)], redirect).into_response())
    } else {
        Ok(redirect.into_response())
    }
}

fn selected_role(current: &CurrentSession) -> Option<Role> {
    current
        .session
        .as_ref()
        .and_then(|session| session.get(SELECTED_ROLE_KEY))
        .and_then(|role| role.parse().ok())
}

async fn render_login(
    state: &AppState,
    current: &CurrentSession,
    path: &str,
    username: &str,
    error: &str,
) -> Result<Response, WebError> {
    let mut context = TeraContext::new();
    context.insert(
        "selected_role",
        &selected_role(current).map(|role| role.as_str().to_lowercase()),
    );
    context.insert("username", username);
    context.insert("error", error);
    Ok(render(state, current.user(), path, "auth/login.html", &context)
        .await?
        .into_response())
}

async fn login_page(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
) -> Result<Response, WebError> {
    render_login(&state, &current, uri.path(), "", "").await
}

/// Rotate the session to a fresh id bound to `user`
async fn start_user_session(
    state: &AppState,
    current: &CurrentSession,
    user: &User,
) -> Result<axum::http::HeaderValue, WebError> {
    let session = state
        .session_service
        .attach_user(current.session.as_ref(), user.id)
        .await?;
    tracing::info!("User {} logged in", user.username);
    session_cookie(
        &state.config.session.cookie_name,
        &session,
        state.config.session.ttl_hours,
    )
}

async fn login(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let username = form.username.trim();
    let user = match state
        .user_service
        .login(username, &form.password, selected_role(&current))
        .await
    {
        Ok(user) => user,
        Err(UserServiceError::InternalError(e)) => return Err(WebError::Internal(e)),
        Err(e) => return render_login(&state, &current, uri.path(), username, &e.to_string()).await,
    };

    let cookie = start_user_session(&state, &current, &user).await?;

    match guard::landing_url(&user) {
        Some(url) => Ok(([(header::SET_COOKIE, cookie)], Redirect::to(url)).into_response()),
        None => {
            // Still logged in; the form explains why nothing opened.
            let logged_in = CurrentSession {
                session: None,
                user: Some(user),
            };
            let page = render_login(
                &state,
                &logged_in,
                uri.path(),
                username,
                "No role assigned to this account.",
            )
            .await?;
            Ok(([(header::SET_COOKIE, cookie)], page).into_response())
        }
    }
}

async fn logout(State(state): State<AppState>, current: CurrentSession) -> Result<Response, WebError> {
    if let Some(session) = &current.session {
        state.session_service.destroy(&session.id).await?;
    }
    if let Some(user) = current.user() {
        tracing::info!("User {} logged out", user.username);
    }
    let cookie = clear_session_cookie(&state.config.session.cookie_name)?;
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to(PORTAL_URL)).into_response())
}

async fn forget_password(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
) -> Result<Response, WebError> {
    let html = render(
        &state,
        current.user(),
        uri.path(),
        "auth/forget_password.html",
        &TeraContext::new(),
    )
    .await?;
    Ok(html.into_response())
}

async fn render_admin_login(
    state: &AppState,
    current: &CurrentSession,
    path: &str,
    username: &str,
    error: &str,
) -> Result<Response, WebError> {
    let mut context = TeraContext::new();
    context.insert("username", username);
    context.insert("error", error);
    Ok(render(state, current.user(), path, "auth/admin_login.html", &context)
        .await?
        .into_response())
}

async fn admin_login_page(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
) -> Result<Response, WebError> {
    render_admin_login(&state, &current, uri.path(), "", "").await
}

async fn admin_login(
    State(state): State<AppState>,
    current: CurrentSession,
    uri: OriginalUri,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let username = form.username.trim();
    let user = match state.user_service.admin_login(username, &form.password).await {
        Ok(user) => user,
        Err(UserServiceError::InternalError(e)) => return Err(WebError::Internal(e)),
        Err(e) => {
            return render_admin_login(&state, &current, uri.path(), username, &e.to_string()).await
        }
    };

    let cookie = start_user_session(&state, &current, &user).await?;
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to(ADMIN_URL)).into_response())
}
