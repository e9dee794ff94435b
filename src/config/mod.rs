//! Configuration management for `livepatch.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── markup     # [markup]
//! │   ├── sanitize   # [sanitize]
//! │   └── serve      # [serve]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── handle     # Global config handle
//! └── mod.rs         # LivepatchConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section      | Purpose                                            |
//! |--------------|----------------------------------------------------|
//! | `[markup]`   | Instrumentation attributes and boundary classes    |
//! | `[sanitize]` | Extra forbidden tags, comment handling             |
//! | `[serve]`    | Live preview server (interface, port, ws_port)     |
//!
//! The file is optional: without one every section takes its defaults.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{MarkupConfig, SanitizeConfig, ServeConfig};
pub use types::{ConfigDiagnostics, ConfigError, cfg, init_config};

use crate::cli::{Cli, Commands};
use crate::log;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing livepatch.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LivepatchConfig {
    /// Absolute path to the config file, empty when none was found (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Authoring instrumentation vocabulary
    #[serde(default)]
    pub markup: MarkupConfig,

    /// Sanitizer settings
    #[serde(default)]
    pub sanitize: SanitizeConfig,

    /// Live preview server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl LivepatchConfig {
    /// Load configuration for the given CLI invocation.
    ///
    /// Searches upward from cwd for the config file. A missing file is not an
    /// error; command-line overrides are applied on top either way.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)
                    .with_context(|| format!("failed to load {}", path.display()))?;
                config.config_path = path;
                config
            }
            None => Self::default(),
        };
        config.apply_command_options(cli);
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Apply command-line overrides (CLI > config file > defaults).
    fn apply_command_options(&mut self, cli: &Cli) {
        if let Commands::Serve {
            interface,
            port,
            ws_port,
            ..
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.ws_port, ws_port.as_ref());
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Validate configuration.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.markup.validate(&mut diag);
        self.serve.validate(&mut diag);

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config from a TOML snippet.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> LivepatchConfig {
    let (parsed, ignored) = LivepatchConfig::parse_with_ignored(extra).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(LivepatchConfig::from_str("[markup\npage_root = \"main\"").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = LivepatchConfig::default();
        assert_eq!(config.config_path, PathBuf::new());
        assert_eq!(config.markup.page_root, "main");
        assert_eq!(config.serve.port, 5278);
        assert!(!config.sanitize.keep_comments);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[markup]\npage_root = \"main\"\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = LivepatchConfig::parse_with_ignored(content).unwrap();
        assert_eq!(config.markup.page_root, "main");
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_load_from_file_with_cli_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("livepatch.toml");
        fs::write(&path, "[serve]\nport = 6000\nws_port = 6001\n").unwrap();

        let cli = Cli::parse_from([
            "livepatch",
            "-C",
            path.to_str().unwrap(),
            "serve",
            "page.html",
            "--ws-port",
            "7001",
        ]);
        let config = LivepatchConfig::load(&cli).unwrap();
        assert_eq!(config.config_path, path);
        assert_eq!(config.serve.port, 6000);
        assert_eq!(config.serve.ws_port, 7001);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let cli = Cli::parse_from([
            "livepatch",
            "-C",
            missing.to_str().unwrap(),
            "apply",
            "page.html",
            "--events",
            "events.jsonl",
        ]);
        let config = LivepatchConfig::load(&cli).unwrap();
        assert_eq!(config.config_path, PathBuf::new());
        assert_eq!(config.markup, MarkupConfig::default());
    }
}
