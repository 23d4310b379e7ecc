//! Web error type
//!
//! Handlers return `WebError`; its response carries an [`ErrorPage`]
//! extension that the error page middleware renders with the site layout.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::services::{
    BrandingServiceError, CatalogServiceError, LedgerServiceError, LessonServiceError,
    SessionServiceError, UserServiceError,
};
use crate::views::{simple_error_page, ViewError};

/// Errors that end a request with an error page
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl WebError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Details for the error page middleware
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub title: &'static str,
    pub message: String,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let page = match &self {
            WebError::NotFound(what) => {
                tracing::debug!("Not found: {}", what);
                ErrorPage {
                    status,
                    title: "Page not found",
                    message: "The page you requested does not exist.".to_string(),
                }
            }
            WebError::BadRequest(message) => ErrorPage {
                status,
                title: "Bad request",
                message: message.clone(),
            },
            WebError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                ErrorPage {
                    status,
                    title: "Something went wrong",
                    message: "The page could not be displayed.".to_string(),
                }
            }
        };

        let mut response =
            (status, Html(simple_error_page(status.as_u16(), &page.message))).into_response();
        response.extensions_mut().insert(page);
        response
    }
}

impl From<ViewError> for WebError {
    fn from(e: ViewError) -> Self {
        WebError::Internal(anyhow::Error::new(e))
    }
}

impl From<SessionServiceError> for WebError {
    fn from(e: SessionServiceError) -> Self {
        match e {
            SessionServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<UserServiceError> for WebError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::BadRequest(other.to_string()),
        }
    }
}

impl From<CatalogServiceError> for WebError {
    fn from(e: CatalogServiceError) -> Self {
        match e {
            CatalogServiceError::ValidationError(message) => WebError::BadRequest(message),
            CatalogServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<LedgerServiceError> for WebError {
    fn from(e: LedgerServiceError) -> Self {
        match e {
            LedgerServiceError::CourseNotFound(id) => WebError::NotFound(format!("course {}", id)),
            LedgerServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<LessonServiceError> for WebError {
    fn from(e: LessonServiceError) -> Self {
        match e {
            LessonServiceError::ValidationError(message) => WebError::BadRequest(message),
            LessonServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<BrandingServiceError> for WebError {
    fn from(e: BrandingServiceError) -> Self {
        match e {
            BrandingServiceError::ValidationError(message) => WebError::BadRequest(message),
            BrandingServiceError::ImageNotFound(id) => WebError::NotFound(format!("image {}", id)),
            BrandingServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}
