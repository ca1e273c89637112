//! Hotwire Daemon
//!
//! Demo chat server built on hotwire frames and wires.
//!
//! # Usage
//!
//! ```bash
//! # Serve ./templates on 127.0.0.1:3000
//! hotwire-daemon
//!
//! # Custom templates and address
//! hotwire-daemon --templates hotwire/daemon/templates --bind 0.0.0.0:8080
//!
//! # With verbose logging
//! RUST_LOG=debug hotwire-daemon
//! ```
//!
//! # Environment Variables
//!
//! - `HOTWIRE_CONFIG`: config file path (default `~/.config/hotwire/hotwire.toml`)
//! - `HOTWIRE_TEMPLATE_DIR`, `HOTWIRE_TEMPLATE_ENGINE`, `HOTWIRE_BIND`,
//!   `HOTWIRE_FRAME_HEADER`: see `hotwire_core::config`
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - SIGTERM/SIGINT: Graceful shutdown

mod server;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use hotwire_core::{load_config, load_config_from_path, ConfigOverrides, HotwireConfig};

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "hotwire-daemon", version, about = "Turbo frames and streams demo server")]
struct Cli {
    /// Configuration file
    #[arg(long, env = "HOTWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind, e.g. 127.0.0.1:3000
    #[arg(long)]
    bind: Option<String>,

    /// Template directory
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Template engine (mustache, hogan, raw)
    #[arg(long)]
    engine: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            template_dir: self.templates.clone(),
            engine: self.engine.clone(),
            bind_address: self.bind.clone(),
            frame_header: None,
        }
    }

    /// Load file and environment configuration, then apply CLI overrides
    fn resolve_config(&self) -> anyhow::Result<HotwireConfig> {
        let mut config = match self.config {
            Some(ref path) => load_config_from_path(Some(path.clone()))
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => load_config().context("Failed to load config")?,
        };
        config
            .apply_overrides(&self.overrides())
            .context("Invalid command-line arguments")?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hotwire_daemon=info".parse()?)
                .add_directive("hotwire_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    info!(
        source = %config.source(),
        file = ?config.config_file_path,
        "Starting Hotwire Daemon"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;
    runtime.block_on(server::run(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotwire_core::{ConfigSource, TemplateEngine};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "hotwire-daemon",
            "--bind",
            "0.0.0.0:8080",
            "--templates",
            "views",
            "--engine",
            "raw",
        ])
        .unwrap();

        assert_eq!(cli.bind.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(cli.templates, Some(PathBuf::from("views")));
        assert_eq!(cli.engine.as_deref(), Some("raw"));
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[server]\nbind_address = \"127.0.0.1:4000\"\nwire_path = \"/cable\"\n")
            .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::try_parse_from([
            "hotwire-daemon",
            "--config",
            path.as_str(),
            "--bind",
            "127.0.0.1:5000",
            "--engine",
            "hogan",
        ])
        .unwrap();
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:5000");
        assert_eq!(config.wire_path, "/cable");
        assert_eq!(config.templates.engine, TemplateEngine::Mustache);
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_unknown_engine_is_an_error() {
        let cli = Cli::try_parse_from(["hotwire-daemon", "--engine", "jinja"]).unwrap();
        let mut config = HotwireConfig::default();
        assert!(config.apply_overrides(&cli.overrides()).is_err());
    }
}
