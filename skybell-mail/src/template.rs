//! Template rendering for email bodies.

use handlebars::Handlebars;
use std::path::Path;
use tracing::debug;

use crate::{MailError, Result};

/// Name of the subscription confirmation template.
pub const CONFIRMATION_TEMPLATE: &str = "confirmation";

/// Name of the periodic weather update template.
pub const WEATHER_UPDATE_TEMPLATE: &str = "weather_update";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        CONFIRMATION_TEMPLATE,
        include_str!("../templates/confirmation.hbs"),
    ),
    (
        WEATHER_UPDATE_TEMPLATE,
        include_str!("../templates/weather_update.hbs"),
    ),
];

/// Renders a named template against JSON data.
///
/// Failures are returned as errors; implementations must not panic on bad
/// data or unknown templates.
pub trait TemplateRenderer: Send + Sync {
    /// Render `template` with `data`.
    fn render(&self, template: &str, data: &serde_json::Value) -> Result<String>;

    /// Check if a template exists.
    fn has_template(&self, template: &str) -> bool;
}

/// Handlebars-based renderer.
///
/// Runs in strict mode, so a template that references a missing field fails
/// instead of rendering an empty string.
pub struct HandlebarsRenderer {
    handlebars: Handlebars<'static>,
}

impl HandlebarsRenderer {
    /// Create a renderer with no templates.
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        Self { handlebars }
    }

    /// Create a renderer with the built-in notification templates.
    pub fn with_builtin_templates() -> Result<Self> {
        let mut renderer = Self::new();
        for (name, content) in BUILTIN_TEMPLATES {
            renderer.register_template(name, content)?;
        }
        Ok(renderer)
    }

    /// Load the built-in templates, then every `*.hbs` file in `path`.
    ///
    /// Files are registered under their stem, so `confirmation.hbs`
    /// replaces the built-in confirmation template.
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(MailError::Config(format!(
                "Template directory not found: {}",
                path.display()
            )));
        }

        let mut renderer = Self::with_builtin_templates()?;
        for entry in std::fs::read_dir(path)? {
            let file = entry?.path();
            if file.extension().and_then(|e| e.to_str()) != Some("hbs") {
                continue;
            }

            let name = file
                .file_stem()
                .and_then(|n| n.to_str())
                .ok_or_else(|| MailError::Config(format!("Invalid template name: {}", file.display())))?
                .to_string();
            let content = std::fs::read_to_string(&file)?;
            renderer.register_template(&name, &content)?;
            debug!(template = %name, path = %file.display(), "Loaded email template");
        }

        Ok(renderer)
    }

    /// Register a template from a string, replacing any with the same name.
    pub fn register_template(&mut self, name: &str, content: &str) -> Result<()> {
        self.handlebars.register_template_string(name, content)?;
        Ok(())
    }

    /// Names of all registered templates, sorted.
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.handlebars.get_templates().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, template: &str, data: &serde_json::Value) -> Result<String> {
        if !self.handlebars.has_template(template) {
            return Err(MailError::TemplateNotFound(template.to_string()));
        }
        Ok(self.handlebars.render(template, data)?)
    }

    fn has_template(&self, template: &str) -> bool {
        self.handlebars.has_template(template)
    }
}
