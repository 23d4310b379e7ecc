//! View engine error types

use thiserror::Error;

/// Template loading and rendering errors
#[derive(Debug, Error)]
pub enum ViewError {
    /// Template not registered
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Template parse or render failure
    #[error("Template error: {0}")]
    TemplateError(String),

    /// IO error while reading override templates
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
