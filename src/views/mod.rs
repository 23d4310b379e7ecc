//! View engine
//!
//! Server-side rendering with Tera.
//! - Templates are embedded from `templates/` at build time
//! - An optional override directory replaces embedded templates by name
//! - Every page receives the site assets and the current user
//! - Error pages degrade to plain HTML when `error.html` cannot render

use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::Serialize;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

use crate::models::User;
use crate::services::SiteAssets;

mod error;

pub use error::ViewError;

/// Templates compiled into the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Template renderer
pub struct ViewEngine {
    tera: Tera,
}

impl ViewEngine {
    /// Load the embedded templates, then any `.html` files under
    /// `override_dir` on top of them.
    pub fn new(override_dir: Option<&Path>) -> Result<Self, ViewError> {
        let mut templates: Vec<(String, String)> = EmbeddedTemplates::iter()
            .filter_map(|name| {
                let file = EmbeddedTemplates::get(&name)?;
                let content = String::from_utf8_lossy(&file.data).into_owned();
                Some((name.into_owned(), content))
            })
            .collect();

        if let Some(dir) = override_dir {
            let mut overrides = Vec::new();
            collect_templates_from_dir(dir, dir, &mut overrides)?;
            tracing::info!(
                "Loaded {} override templates from {}",
                overrides.len(),
                dir.display()
            );
            for (name, content) in overrides {
                templates.retain(|(existing, _)| existing != &name);
                templates.push((name, content));
            }
        }

        Self::from_templates(templates)
    }

    /// Build an engine from (name, source) pairs
    pub fn from_templates(templates: Vec<(String, String)>) -> Result<Self, ViewError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ViewError::TemplateError(describe(&e)))?;
        Ok(Self { tera })
    }

    /// Check if a template is registered
    pub fn has_template(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|name| name == template)
    }

    /// Render a template with a context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, ViewError> {
        if !self.has_template(template) {
            return Err(ViewError::NotFound(template.to_string()));
        }
        self.tera.render(template, context).map_err(|e| {
            ViewError::TemplateError(format!("Failed to render '{}': {}", template, describe(&e)))
        })
    }

    /// Render a page with the shared page variables added
    pub fn render_page(
        &self,
        template: &str,
        context: &TeraContext,
        vars: &PageVars,
    ) -> Result<String, ViewError> {
        let mut full_context = context.clone();
        full_context.insert("site", &vars.site);
        full_context.insert("current_user", &vars.current_user);
        full_context.insert("request_path", &vars.request_path);
        full_context.insert("year", &vars.year);
        self.render(template, &full_context)
    }

    /// Render `error.html`, or a plain HTML page if that fails too.
    pub fn render_error_page(&self, status: u16, title: &str, message: &str, vars: &PageVars) -> String {
        let mut context = TeraContext::new();
        context.insert("status", &status);
        context.insert("title", title);
        context.insert("message", message);

        match self.render_page("error.html", &context, vars) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to render error template: {}", e);
                simple_error_page(status, message)
            }
        }
    }
}

/// Join a Tera error with its causes on one line
fn describe(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(": ");
        message.push_str(&s.to_string());
        source = s.source();
    }
    message
}

/// Collect `.html` files under `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), ViewError> {
    if !current_path.exists() {
        tracing::warn!("Template override directory {} does not exist", current_path.display());
        return Ok(());
    }

    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative_path = path.strip_prefix(base_path).map_err(|_| {
                ViewError::TemplateError(format!("Template outside override dir: {}", path.display()))
            })?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");
            templates.push((template_name, fs::read_to_string(&path)?));
        }
    }

    Ok(())
}

/// Last-resort HTML when no template can be rendered
pub fn simple_error_page(status: u16, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Error {status}</title>
    <style>
        body {{ font-family: sans-serif; max-width: 600px; margin: 50px auto; padding: 20px; }}
        h1 {{ color: #c0392b; }}
    </style>
</head>
<body>
    <h1>Error {status}</h1>
    <p>{message}</p>
    <p><a href="/">Back to home</a></p>
</body>
</html>"#,
        status = status,
        message = tera::escape_html(message)
    )
}

/// Variables injected into every page
#[derive(Debug, Clone, Serialize)]
pub struct PageVars {
    pub site: SiteAssets,
    pub current_user: Option<CurrentUser>,
    pub request_path: String,
    pub year: i32,
}

impl PageVars {
    pub fn new(site: SiteAssets, request_path: impl Into<String>) -> Self {
        Self {
            site,
            current_user: None,
            request_path: request_path.into(),
            year: chrono::Local::now().year(),
        }
    }

    pub fn with_user(mut self, user: Option<&User>) -> Self {
        self.current_user = user.map(CurrentUser::from);
        self
    }
}

/// Current user information for templates
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    /// First name, or the username when blank
    pub display_name: String,
    pub roles: Vec<String>,
    pub is_admin: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        let display_name = if user.first_name.trim().is_empty() {
            user.username.clone()
        } else {
            user.first_name.clone()
        };
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name,
            roles: user.roles.iter().map(|r| r.as_str().to_string()).collect(),
            is_admin: user.is_admin(),
        }
    }
}
