//! Embedding-based synonym expansion

use crate::embeddings::EmbeddingSpace;
use sqlgen_core::{EmbeddingConfig, EmbeddingModelConfig, Error, Result};
use std::sync::{Arc, RwLock};

/// Expands keywords with their nearest neighbours in the active embedding space
///
/// The active space can be switched at runtime. Readers clone the current
/// `Arc` under a short read lock; a switch loads the new space without holding
/// the lock and swaps it in afterwards.
pub struct SynonymExpander {
    models: Vec<EmbeddingModelConfig>,
    active: RwLock<Option<Arc<EmbeddingSpace>>>,
}

impl SynonymExpander {
    /// Expander over a single, already-loaded space
    pub fn new(space: EmbeddingSpace) -> Self {
        Self {
            models: Vec::new(),
            active: RwLock::new(Some(Arc::new(space))),
        }
    }

    /// Expander with no space loaded; every keyword expands to nothing
    pub fn disabled(models: Vec<EmbeddingModelConfig>) -> Self {
        Self {
            models,
            active: RwLock::new(None),
        }
    }

    /// Load the startup space named by the configuration
    ///
    /// With no models configured the expander is disabled. A configured space
    /// that fails to load is [`Error::Model`].
    pub async fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let expander = Self::disabled(config.models.clone());
        match config.startup_model() {
            Some(name) => {
                expander.set_model(name).await?;
            }
            None => {
                tracing::info!("No embedding models configured; synonym expansion disabled");
            }
        }
        Ok(expander)
    }

    /// Up to `max_synonyms` neighbours of `keyword`, most similar first
    ///
    /// Zero requested synonyms, an unknown keyword and a disabled expander all
    /// yield an empty list.
    pub fn expand(&self, keyword: &str, max_synonyms: usize) -> Vec<String> {
        if max_synonyms == 0 {
            return Vec::new();
        }
        let Some(space) = self.space() else {
            return Vec::new();
        };
        space
            .most_similar(keyword, max_synonyms)
            .into_iter()
            .map(|(word, _)| word)
            .collect()
    }

    /// The currently active space
    pub fn space(&self) -> Option<Arc<EmbeddingSpace>> {
        self.active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn available_models(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name.clone()).collect()
    }

    pub fn active_model(&self) -> Option<String> {
        self.space().map(|space| space.name().to_string())
    }

    /// Switch to another configured space
    ///
    /// Unknown names are [`Error::Config`]. Switching to the active space is a
    /// no-op. Loading happens on a blocking thread; queries keep using the old
    /// space until the new one is ready.
    pub async fn set_model(&self, name: &str) -> Result<()> {
        let model = self
            .models
            .iter()
            .find(|m| m.name == name)
            .cloned()
            .ok_or_else(|| {
                Error::config_error(format!(
                    "Embedding model '{}' not found in available models: {:?}",
                    name,
                    self.available_models()
                ))
            })?;

        if self.active_model().as_deref() == Some(name) {
            tracing::debug!(model = name, "Embedding model already active");
            return Ok(());
        }

        let space = tokio::task::spawn_blocking(move || EmbeddingSpace::load(model.name, &model.path))
            .await
            .map_err(|e| Error::model(format!("Embedding load task failed: {}", e)))??;

        self.install(space);
        Ok(())
    }

    /// Swap in an already-loaded space
    pub fn install(&self, space: EmbeddingSpace) {
        let name = space.name().to_string();
        *self
            .active
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::new(space));
        tracing::info!(model = %name, "Switched embedding model");
    }
}
