//! Prompt templates
//!
//! Every `*.txt` file in the templates directory is a template named after its
//! file stem. Placeholders are written `{name}`; a literal brace is doubled
//! (`{{` or `}}`).

use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct PromptGenerator {
    templates: BTreeMap<String, String>,
}

impl PromptGenerator {
    /// Load all templates from a directory
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| {
            Error::config_error(format!("Cannot read templates directory {:?}: {}", dir, e))
        })?;

        let mut templates = BTreeMap::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                templates.insert(stem.to_string(), fs::read_to_string(&path)?);
            }
        }

        tracing::debug!(dir = ?dir, count = templates.len(), "Loaded prompt templates");
        Ok(Self { templates })
    }

    /// Build from in-memory templates
    pub fn from_templates<I, K, V>(templates: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            templates: templates
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Template names, sorted
    pub fn template_names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Fill a template's placeholders
    ///
    /// # Errors
    /// Unknown template names and placeholders without a value are configuration errors.
    pub fn render(&self, name: &str, vars: &[(&str, &str)]) -> Result<String> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| Error::config_error(format!("Unknown prompt template '{}'", name)))?;

        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut key = String::new();
                    let mut closed = false;
                    for k in chars.by_ref() {
                        if k == '}' {
                            closed = true;
                            break;
                        }
                        key.push(k);
                    }
                    if !closed {
                        return Err(Error::config_error(format!(
                            "Unclosed placeholder in template '{}'",
                            name
                        )));
                    }
                    let value = vars
                        .iter()
                        .find(|(k, _)| *k == key)
                        .map(|(_, v)| *v)
                        .ok_or_else(|| {
                            Error::config_error(format!(
                                "Template '{}' needs a value for '{{{}}}'",
                                name, key
                            ))
                        })?;
                    out.push_str(value);
                }
                other => out.push(other),
            }
        }

        Ok(out)
    }
}
