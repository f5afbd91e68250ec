//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.fitcoach/prompts/`)
    user_dir: Option<PathBuf>,
}

fn engine() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();
    // Prompts are plain text; profile and context values must not be HTML-escaped
    hbs.register_escape_fn(handlebars::no_escape);
    hbs
}

impl PromptLoader {
    /// Create a loader that checks `{root}/.fitcoach/prompts/` before the embedded prompts
    pub fn new(root: impl AsRef<Path>) -> Self {
        let user_dir = root.as_ref().join(".fitcoach/prompts");
        let user_dir_exists = user_dir.exists();
        debug!(?user_dir, %user_dir_exists, "PromptLoader::new: called");

        Self {
            hbs: engine(),
            user_dir: user_dir_exists.then_some(user_dir),
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: engine(),
            user_dir: None,
        }
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.fitcoach/prompts/{name}.pmt`
    /// 2. Embedded fallback
    pub fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_render_does_not_escape() {
        let loader = PromptLoader::embedded_only();
        let out = loader
            .render("intent", &json!({"query": "Tom's \"lean\" <bulk> & cut"}))
            .unwrap();
        assert!(out.contains("User Query: Tom's \"lean\" <bulk> & cut"));
    }

    #[test]
    fn test_user_override_wins() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".fitcoach/prompts");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("intent.pmt"), "custom: {{query}}").unwrap();

        let loader = PromptLoader::new(temp.path());
        assert_eq!(loader.render("intent", &json!({"query": "hi"})).unwrap(), "custom: hi");
        // Templates without an override still come from the embedded set
        assert!(loader.load_template("system").unwrap().contains("nutrition"));
    }

    #[test]
    fn test_unknown_template() {
        let loader = PromptLoader::embedded_only();
        assert!(loader.load_template("nonexistent-template").is_err());
    }
}
