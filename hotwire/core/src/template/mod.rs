//! Template Rendering
//!
//! Trait definitions and the file-backed default implementation for turning
//! a [`Fragment`] plus a [`RenderState`] into HTML.
//!
//! # Design Philosophy
//!
//! The frame and stream dispatchers only ever see the [`TemplateRenderer`]
//! trait. Anything that can produce a string from a template name and a JSON
//! state can be plugged in: the bundled [`FileTemplateRenderer`], a stub in
//! tests, or an adapter over another template engine.
//!
//! Render failures are returned as [`RenderError`] and are never swallowed by
//! the dispatchers: a missing template is a configuration bug, not a request
//! condition.

mod file;
mod mustache;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::fragment::{wrap_in_frame, Fragment};

pub use file::FileTemplateRenderer;

/// Errors raised while rendering a template
#[derive(Debug, Error)]
pub enum RenderError {
    /// No template file exists for this name
    #[error("Template '{name}' not found at {}", path.display())]
    NotFound {
        /// Template name as requested
        name: String,
        /// Resolved file path
        path: PathBuf,
    },

    /// The template file exists but could not be read
    #[error("Failed to read template '{name}' at {}: {source}", path.display())]
    Io {
        /// Template name as requested
        name: String,
        /// Resolved file path
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// The template engine rejected the template
    #[error("Template '{name}' failed to render: {message}")]
    Engine {
        /// Template name as requested
        name: String,
        /// Engine diagnostic
        message: String,
    },
}

/// Immutable state passed to every render call
///
/// Cloning is cheap and shares the same snapshot. Once built, a render state
/// cannot change, so a [`crate::Wire`] created from it keeps rendering
/// exactly what the handler saw.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderState(Arc<Value>);

impl RenderState {
    /// Wrap a JSON value
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// An empty object
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Value::Object(Map::new()))
    }

    /// Snapshot any serializable value
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::new)
    }

    /// The underlying JSON value
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl Default for RenderState {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for RenderState {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Supported template engines
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateEngine {
    /// Logic-less mustache templates
    #[default]
    #[serde(alias = "hogan")]
    Mustache,
    /// File contents are emitted verbatim
    Raw,
}

impl TemplateEngine {
    /// Lowercase identifier used in configuration
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mustache => "mustache",
            Self::Raw => "raw",
        }
    }

    /// Render template source against a state
    pub fn render(&self, name: &str, source: &str, state: &RenderState) -> Result<String, RenderError> {
        match self {
            Self::Raw => Ok(source.to_string()),
            Self::Mustache => {
                mustache::render(source, state.value()).map_err(|message| RenderError::Engine {
                    name: name.to_string(),
                    message,
                })
            }
        }
    }
}

impl fmt::Display for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TemplateEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mustache" | "hogan" => Ok(Self::Mustache),
            "raw" | "static" => Ok(Self::Raw),
            other => Err(format!("unsupported template engine: {other}")),
        }
    }
}

/// Where templates live and how they are rendered
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Directory templates are resolved against
    pub directory: PathBuf,
    /// Engine used for every template
    pub engine: TemplateEngine,
    /// File extension appended to template names (without the dot)
    pub extension: String,
    /// Keep template sources in memory after the first read
    pub cache: bool,
}

impl TemplateConfig {
    /// Mustache templates with the `html` extension in `directory`
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            engine: TemplateEngine::default(),
            extension: "html".to_string(),
            cache: false,
        }
    }

    /// Set the engine
    #[must_use]
    pub fn with_engine(mut self, engine: TemplateEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Set the file extension
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Enable or disable the source cache
    #[must_use]
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }
}

/// Template renderer trait
///
/// Implement this trait to plug in a different way of producing markup.
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    /// Render a template by name
    async fn render_template(&self, name: &str, state: &RenderState) -> Result<String, RenderError>;

    /// Render a fragment, wrapping frames in their `<turbo-frame>` container
    async fn render(&self, fragment: &Fragment, state: &RenderState) -> Result<String, RenderError> {
        let contents = self.render_template(fragment.view_id(), state).await?;
        match fragment.frame_id() {
            Some(id) => Ok(wrap_in_frame(id, &contents)),
            None => Ok(contents),
        }
    }
}
