//! Configuration management for the structure engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (mddf.toml)
//! - Environment variables (MDDF__*)
//!
//! ## Example config file (mddf.toml):
//! ```toml
//! [rules]
//! directory = "./rules"
//! use_builtin = false
//!
//! [validation]
//! strict_variables = true
//!
//! [logging]
//! filter = "mddf_structure=debug"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::namespace::SchemaFamily;
use crate::rules::RuleCatalog;
use crate::validation::ValidationEngine;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rule catalog sources
    #[serde(default)]
    pub rules: RulesConfig,

    /// Constraint evaluation settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Log output of the command line tool
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where rule catalogs come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Directory of `*.json` catalogs; replaces the built-in catalogs when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Fall back to catalogs compiled into the binary
    #[serde(default = "default_true")]
    pub use_builtin: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Report variables whose defining path matched nothing
    #[serde(default)]
    pub strict_variables: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_true() -> bool {
    true
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            directory: None,
            use_builtin: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        for location in ["mddf.toml", ".mddf.toml", "config/mddf.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("org", "movielabs", "mddf") {
            let xdg_config = dirs.config_dir().join("mddf.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // MDDF__VALIDATION__STRICT_VARIABLES=true
        builder = builder.add_source(
            Environment::with_prefix("MDDF")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Rule catalog for a schema family and version, per the `[rules]` section
    pub fn rule_catalog(&self, family: SchemaFamily, version: &str) -> Result<RuleCatalog> {
        match &self.rules.directory {
            Some(dir) => RuleCatalog::from_directory(dir),
            None if self.rules.use_builtin => RuleCatalog::builtin(family, version),
            None => Ok(RuleCatalog::default()),
        }
    }

    pub fn validation_engine(&self) -> ValidationEngine {
        ValidationEngine::from_config(&self.validation)
    }
}
