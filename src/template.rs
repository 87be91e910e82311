//! Template interpolation for YAML configs
//!
//! Handles `{{ variable }}` interpolation in export definitions, with an
//! optional fallback: `{{ env.DB_HOST | localhost }}`.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ path.to.var | default }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*(?:\|\s*([^}]*?)\s*)?\}\}",
    )
    .expect("template regex is valid")
});

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Environment variables, addressed as `env.NAME`
    pub env: HashMap<String, String>,
    /// Additional variables, addressed as `vars.NAME` or bare `NAME`
    pub vars: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context holding the current process environment
    pub fn from_env() -> Self {
        Self {
            env: std::env::vars().collect(),
            ..Default::default()
        }
    }

    /// Set an environment variable
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set an additional variable
    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Get a value by path (e.g., "env.DB_HOST")
    pub fn get(&self, path: &str) -> Option<&str> {
        match path.split_once('.') {
            Some(("env", name)) => self.env.get(name),
            Some(("vars", name)) => self.vars.get(name),
            Some(_) => None,
            None => self.vars.get(path),
        }
        .map(String::as_str)
    }
}

/// Render a template string with the given context
///
/// Variables without a value fall back to their `| default`; variables with
/// neither are reported together in one error.
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut errors = Vec::new();

    let result = TEMPLATE_REGEX.replace_all(template, |cap: &regex::Captures<'_>| {
        let var_path = &cap[1];
        match (ctx.get(var_path), cap.get(2)) {
            (Some(value), _) => value.to_string(),
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => {
                errors.push(var_path.to_string());
                String::new()
            }
        }
    });

    if errors.is_empty() {
        Ok(result.into_owned())
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Render an optional template field
pub fn render_opt(template: Option<&str>, ctx: &TemplateContext) -> Result<Option<String>> {
    template.map(|t| render(t, ctx)).transpose()
}

/// Load `KEY=value` lines from a dotenv file into the process environment
///
/// Variables already set in the environment keep their value. Returns
/// `false` when there is no file at `path`.
pub fn load_env_file(path: &Path) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    dotenvy::from_path(path)
        .map_err(|e| Error::config(format!("Failed to load {}: {e}", path.display())))?;
    tracing::debug!("Loaded environment from {}", path.display());
    Ok(true)
}
