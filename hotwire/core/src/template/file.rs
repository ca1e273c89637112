//! File-backed template renderer
//!
//! Resolves `{directory}/{name}.{extension}` with async file IO and renders
//! it with the configured [`TemplateEngine`].

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{RenderError, RenderState, TemplateConfig, TemplateRenderer};

/// Renders templates stored as files in one directory
#[derive(Debug)]
pub struct FileTemplateRenderer {
    config: TemplateConfig,
    /// Template sources by resolved path, populated when caching is enabled
    sources: DashMap<PathBuf, Arc<str>>,
}

impl FileTemplateRenderer {
    /// Create a renderer for the given configuration
    #[must_use]
    pub fn new(config: TemplateConfig) -> Self {
        Self {
            config,
            sources: DashMap::new(),
        }
    }

    /// The configuration this renderer was built with
    #[must_use]
    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Resolve a template name to its file path
    #[must_use]
    pub fn template_path(&self, name: &str) -> PathBuf {
        self.config
            .directory
            .join(format!("{name}.{}", self.config.extension))
    }

    /// Number of cached template sources
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.sources.len()
    }

    /// Drop all cached template sources
    pub fn clear_cache(&self) {
        self.sources.clear();
    }

    async fn load(&self, name: &str) -> Result<Arc<str>, RenderError> {
        let path = self.template_path(name);

        if self.config.cache {
            if let Some(source) = self.sources.get(&path) {
                return Ok(Arc::clone(source.value()));
            }
        }

        let source: Arc<str> = match tokio::fs::read_to_string(&path).await {
            Ok(source) => source.into(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RenderError::NotFound {
                    name: name.to_string(),
                    path,
                });
            }
            Err(source) => {
                return Err(RenderError::Io {
                    name: name.to_string(),
                    path,
                    source,
                });
            }
        };

        if self.config.cache {
            self.sources.insert(path, Arc::clone(&source));
        }
        Ok(source)
    }
}

#[async_trait]
impl TemplateRenderer for FileTemplateRenderer {
    async fn render_template(&self, name: &str, state: &RenderState) -> Result<String, RenderError> {
        let source = self.load(name).await?;
        tracing::trace!(template = name, engine = %self.config.engine, "Rendering template");
        self.config.engine.render(name, &source, state)
    }
}
