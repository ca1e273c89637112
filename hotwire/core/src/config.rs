//! TOML Configuration File Support
//!
//! Loads hotwire settings from `~/.config/hotwire/hotwire.toml`, the
//! environment and command-line overrides.
//!
//! # Configuration Priority
//!
//! Highest first:
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [templates]
//! directory = "templates"
//! engine = "mustache"
//! extension = "html"
//! cache = true
//!
//! [frames]
//! header = "turbo-frame"
//!
//! [server]
//! bind_address = "127.0.0.1:3000"
//! wire_path = "/wire"
//! connection_channel_capacity = 64
//! ```
//!
//! # Environment Variables
//!
//! - `HOTWIRE_TEMPLATE_DIR` - template directory
//! - `HOTWIRE_TEMPLATE_ENGINE` - `mustache` (alias `hogan`) or `raw`
//! - `HOTWIRE_BIND` - server bind address
//! - `HOTWIRE_FRAME_HEADER` - request header selecting a frame

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::HeaderName;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::DEFAULT_FRAME_HEADER;
use crate::template::{TemplateConfig, TemplateEngine};

/// Environment variable naming the template directory
pub const ENV_TEMPLATE_DIR: &str = "HOTWIRE_TEMPLATE_DIR";
/// Environment variable naming the template engine
pub const ENV_TEMPLATE_ENGINE: &str = "HOTWIRE_TEMPLATE_ENGINE";
/// Environment variable with the server bind address
pub const ENV_BIND: &str = "HOTWIRE_BIND";
/// Environment variable naming the frame header
pub const ENV_FRAME_HEADER: &str = "HOTWIRE_FRAME_HEADER";

const DEFAULT_TEMPLATE_DIR: &str = "templates";
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";
const DEFAULT_WIRE_PATH: &str = "/wire";
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Tracks where the configuration last got a value from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Command-line argument
    Cli,
    /// Environment variable
    Env,
    /// TOML configuration file
    File,
    /// Built-in default
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[templates]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesToml {
    /// Directory holding template files
    pub directory: Option<PathBuf>,
    /// Template engine
    pub engine: Option<TemplateEngine>,
    /// File extension, without the dot
    pub extension: Option<String>,
    /// Cache template sources after the first read
    pub cache: Option<bool>,
}

/// `[frames]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FramesToml {
    /// Request header selecting a frame
    pub header: Option<String>,
}

/// `[server]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Address the HTTP server binds to
    pub bind_address: Option<String>,
    /// Route serving wire WebSockets
    pub wire_path: Option<String>,
    /// Outbound queue size per WebSocket connection
    pub connection_channel_capacity: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HotwireToml {
    /// Template settings
    pub templates: TemplatesToml,
    /// Frame settings
    pub frames: FramesToml,
    /// Server settings
    pub server: ServerToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved hotwire configuration
#[derive(Clone, Debug)]
pub struct HotwireConfig {
    /// Template renderer settings
    pub templates: TemplateConfig,
    /// Request header selecting a frame
    pub frame_header: String,
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Route serving wire WebSockets
    pub wire_path: String,
    /// Outbound queue size per WebSocket connection
    pub connection_channel_capacity: usize,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for HotwireConfig {
    fn default() -> Self {
        Self {
            templates: TemplateConfig::new(DEFAULT_TEMPLATE_DIR),
            frame_header: DEFAULT_FRAME_HEADER.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            wire_path: DEFAULT_WIRE_PATH.to_string(),
            connection_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl HotwireConfig {
    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the most recently applied value came from
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Parsed bind address
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the address is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_address.parse().map_err(|e| {
            ConfigError::ValidationError(format!(
                "bind_address `{}` is not a socket address: {e}",
                self.bind_address
            ))
        })
    }

    /// Apply command-line overrides, then validate
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an unknown engine name or if the
    /// resulting configuration is invalid.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(ref dir) = overrides.template_dir {
            self.templates.directory.clone_from(dir);
            self.source = ConfigSource::Cli;
        }
        if let Some(ref engine) = overrides.engine {
            self.templates.engine = engine.parse().map_err(ConfigError::ValidationError)?;
            self.source = ConfigSource::Cli;
        }
        if let Some(ref bind) = overrides.bind_address {
            self.bind_address.clone_from(bind);
            self.source = ConfigSource::Cli;
        }
        if let Some(ref header) = overrides.frame_header {
            self.frame_header.clone_from(header);
            self.source = ConfigSource::Cli;
        }
        self.validate()
    }

    /// Check values that would otherwise fail later at request time
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_header.is_empty() {
            return Err(ConfigError::ValidationError(
                "frame header must not be empty".to_string(),
            ));
        }
        if self.frame_header.chars().any(char::is_uppercase) {
            return Err(ConfigError::ValidationError(format!(
                "frame header `{}` must be lower-case",
                self.frame_header
            )));
        }
        if HeaderName::from_lowercase(self.frame_header.as_bytes()).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "frame header `{}` is not a valid header name",
                self.frame_header
            )));
        }
        if self.templates.extension.is_empty() {
            return Err(ConfigError::ValidationError(
                "template extension must not be empty".to_string(),
            ));
        }
        if !self.wire_path.starts_with('/') || self.wire_path == "/" {
            return Err(ConfigError::ValidationError(format!(
                "wire_path `{}` must be an absolute path other than `/`",
                self.wire_path
            )));
        }
        if self.connection_channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "connection_channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Values given on the command line
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// `--templates`
    pub template_dir: Option<PathBuf>,
    /// `--engine`
    pub engine: Option<String>,
    /// `--bind`
    pub bind_address: Option<String>,
    /// Frame header override
    pub frame_header: Option<String>,
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/hotwire/hotwire.toml`, typically
/// `~/.config/hotwire/hotwire.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("hotwire").join("hotwire.toml"))
}

/// Load configuration from the default path and the environment
///
/// CLI overrides are applied afterwards by the caller via
/// [`HotwireConfig::apply_overrides`].
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the result fails validation. A missing file is not an error.
pub fn load_config() -> Result<HotwireConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the environment
///
/// Reads the file synchronously; call this before starting the runtime.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the result
/// fails validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<HotwireConfig, ConfigError> {
    let mut config = HotwireConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: HotwireToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

fn apply_toml_config(config: &mut HotwireConfig, toml: &HotwireToml) {
    if let Some(ref dir) = toml.templates.directory {
        config.templates.directory.clone_from(dir);
    }
    if let Some(engine) = toml.templates.engine {
        config.templates.engine = engine;
    }
    if let Some(ref extension) = toml.templates.extension {
        config.templates.extension.clone_from(extension);
    }
    if let Some(cache) = toml.templates.cache {
        config.templates.cache = cache;
    }

    if let Some(ref header) = toml.frames.header {
        config.frame_header.clone_from(header);
    }

    if let Some(ref bind) = toml.server.bind_address {
        config.bind_address.clone_from(bind);
    }
    if let Some(ref path) = toml.server.wire_path {
        config.wire_path.clone_from(path);
    }
    if let Some(capacity) = toml.server.connection_channel_capacity {
        config.connection_channel_capacity = capacity;
    }
}

/// Apply environment overrides, reading variables through `lookup`
fn apply_env_config<F>(config: &mut HotwireConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(ENV_TEMPLATE_DIR) {
        config.templates.directory = PathBuf::from(dir);
        config.source = ConfigSource::Env;
    }
    if let Some(engine) = lookup(ENV_TEMPLATE_ENGINE) {
        match engine.parse::<TemplateEngine>() {
            Ok(engine) => {
                config.templates.engine = engine;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(
                variable = ENV_TEMPLATE_ENGINE,
                error = %e,
                "Ignoring invalid template engine"
            ),
        }
    }
    if let Some(bind) = lookup(ENV_BIND) {
        config.bind_address = bind;
        config.source = ConfigSource::Env;
    }
    if let Some(header) = lookup(ENV_FRAME_HEADER) {
        config.frame_header = header;
        config.source = ConfigSource::Env;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = HotwireConfig::default();
        assert_eq!(config.templates.directory, PathBuf::from("templates"));
        assert_eq!(config.templates.engine, TemplateEngine::Mustache);
        assert_eq!(config.templates.extension, "html");
        assert!(!config.templates.cache);
        assert_eq!(config.frame_header, "turbo-frame");
        assert_eq!(config.bind_address, "127.0.0.1:3000");
        assert_eq!(config.wire_path, "/wire");
        assert_eq!(config.connection_channel_capacity, 64);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            load_config_from_path(Some(PathBuf::from("/nonexistent/hotwire.toml"))).unwrap();
        assert!(config.config_file_path.is_none());
        assert_eq!(config.wire_path, "/wire");
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [templates]
            directory = "views"
            engine = "hogan"
            extension = "mustache"
            cache = true

            [frames]
            header = "x-frame"

            [server]
            bind_address = "0.0.0.0:8080"
            wire_path = "/cable"
            connection_channel_capacity = 8
        "#;

        let toml: HotwireToml = toml::from_str(toml_str).unwrap();
        let mut config = HotwireConfig::default();
        apply_toml_config(&mut config, &toml);

        assert_eq!(config.templates.directory, PathBuf::from("views"));
        assert_eq!(config.templates.engine, TemplateEngine::Mustache);
        assert_eq!(config.templates.extension, "mustache");
        assert!(config.templates.cache);
        assert_eq!(config.frame_header, "x-frame");
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.wire_path, "/cable");
        assert_eq!(config.connection_channel_capacity, 8);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml: HotwireToml = toml::from_str("[templates]\nengine = \"raw\"\n").unwrap();
        let mut config = HotwireConfig::default();
        apply_toml_config(&mut config, &toml);

        assert_eq!(config.templates.engine, TemplateEngine::Raw);
        assert_eq!(config.templates.extension, "html");
        assert_eq!(config.frame_header, "turbo-frame");
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config("[server]\nwire_path = \"/streams\"\n");
        let config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();

        assert_eq!(config.wire_path, "/streams");
        assert_eq!(config.config_file_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let file = write_config("[server\nwire_path = ");
        let err = load_config_from_path(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_unknown_engine_in_file_is_parse_error() {
        let file = write_config("[templates]\nengine = \"handlebars\"\n");
        let err = load_config_from_path(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let file = write_config("[server]\nconnection_channel_capacity = 0\n");
        let err = load_config_from_path(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let toml: HotwireToml = toml::from_str("[frames]\nheader = \"x-frame\"\n").unwrap();
        let mut config = HotwireConfig::default();
        apply_toml_config(&mut config, &toml);
        config.source = ConfigSource::File;

        apply_env_config(
            &mut config,
            env(&[
                (ENV_FRAME_HEADER, "turbo-frame"),
                (ENV_TEMPLATE_DIR, "/srv/views"),
                (ENV_TEMPLATE_ENGINE, "raw"),
                (ENV_BIND, "127.0.0.1:9000"),
            ]),
        );

        assert_eq!(config.frame_header, "turbo-frame");
        assert_eq!(config.templates.directory, PathBuf::from("/srv/views"));
        assert_eq!(config.templates.engine, TemplateEngine::Raw);
        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_invalid_env_engine_is_ignored() {
        let mut config = HotwireConfig::default();
        apply_env_config(&mut config, env(&[(ENV_TEMPLATE_ENGINE, "jinja")]));

        assert_eq!(config.templates.engine, TemplateEngine::Mustache);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = HotwireConfig::default();
        apply_env_config(&mut config, env(&[(ENV_BIND, "127.0.0.1:9000")]));

        let overrides = ConfigOverrides {
            bind_address: Some("127.0.0.1:9001".to_string()),
            engine: Some("hogan".to_string()),
            ..ConfigOverrides::default()
        };
        config.apply_overrides(&overrides).unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:9001");
        assert_eq!(config.source(), ConfigSource::Cli);
        assert_eq!(config.socket_addr().unwrap().port(), 9001);
    }

    #[test]
    fn test_cli_unknown_engine_is_rejected() {
        let mut config = HotwireConfig::default();
        let overrides = ConfigOverrides {
            engine: Some("jinja".to_string()),
            ..ConfigOverrides::default()
        };
        let err = config.apply_overrides(&overrides).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_header_validation() {
        let mut config = HotwireConfig::default();

        config.frame_header = String::new();
        assert!(config.validate().is_err());

        config.frame_header = "Turbo-Frame".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("lower-case"));

        config.frame_header = "turbo frame".to_string();
        assert!(config.validate().is_err());

        config.frame_header = "x-turbo-frame".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_extension_and_wire_path_validation() {
        let mut config = HotwireConfig::default();
        config.templates.extension = String::new();
        assert!(config.validate().is_err());

        let mut config = HotwireConfig::default();
        config.wire_path = "wire".to_string();
        assert!(config.validate().is_err());
        config.wire_path = "/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_socket_addr() {
        let config = HotwireConfig {
            bind_address: "localhost".to_string(),
            ..HotwireConfig::default()
        };
        assert!(matches!(
            config.socket_addr(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("hotwire/hotwire.toml"));
        }
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI");
        assert_eq!(ConfigSource::Env.to_string(), "environment");
        assert_eq!(ConfigSource::File.to_string(), "config file");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }
}
