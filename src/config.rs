//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. Built-in defaults
//! 2. User config: `~/.config/extrabind/config.toml` (XDG) or platform config dir
//! 3. Project config: `extrabind.toml`
//! 4. Environment variables: `EXTRABIND_*`, sections separated by `__`
//!    (`EXTRABIND_GENERATE__OUT_DIR=gen`)
//!
//! # Example
//!
//! ```toml
//! [project]
//! crate_name = "my_app"
//!
//! [generate]
//! source_dir = "src"
//! out_dir = "target/extrabind"
//! registrations_file = "registrations.rs"
//! ```
//!
//! Without `project.crate_name` the crate name is read from the `[package]`
//! table of the manifest.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Project config file name, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "extrabind.toml";

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub generate: GenerateConfig,
}

/// The crate being scanned.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProjectConfig {
    /// Crate name used as the first segment of every type path.
    #[serde(default)]
    pub crate_name: Option<String>,
    /// Manifest the crate name falls back to.
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            crate_name: None,
            manifest: default_manifest(),
        }
    }
}

/// Where sources are read from and binders written to.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GenerateConfig {
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    /// File name, inside `out_dir`, of the `register_binders` function.
    #[serde(default = "default_registrations_file")]
    pub registrations_file: String,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            out_dir: default_out_dir(),
            registrations_file: default_registrations_file(),
        }
    }
}

fn default_manifest() -> PathBuf {
    PathBuf::from("Cargo.toml")
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("target/extrabind")
}

fn default_registrations_file() -> String {
    "registrations.rs".to_string()
}

impl ProjectConfig {
    /// Configured crate name, or the manifest's package name with `-`
    /// replaced by `_`.
    pub fn crate_name(&self) -> Result<String, ConfigError> {
        if let Some(name) = &self.crate_name {
            return Ok(name.clone());
        }
        let name: String = Figment::from(Toml::file(&self.manifest)).extract_inner("package.name")?;
        Ok(name.replace('-', "_"))
    }
}

impl Config {
    /// Load config with layered resolution (defaults → user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment(&Self::user_config_path())
            .extract()
            .map_err(ConfigError::from)
    }

    fn figment(user_config: &Path) -> Figment {
        Figment::new()
            // Layer 1: Built-in defaults (lowest priority)
            .merge(Serialized::defaults(Config::default()))
            // Layer 2: User config
            .merge(Toml::file(user_config))
            // Layer 3: Project config
            .merge(Toml::file(PROJECT_CONFIG_FILE))
            // Layer 4: Environment variables (highest priority)
            .merge(Env::prefixed("EXTRABIND_").split("__"))
    }

    /// User config path: ~/.config/extrabind/config.toml (XDG) or platform config dir.
    fn user_config_path() -> PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("extrabind").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        // Fall back to platform-specific config dir
        dirs::config_dir()
            .map(|p| p.join("extrabind").join("config.toml"))
            .unwrap_or_default()
    }
}
