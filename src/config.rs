//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/navcompose/navcompose.toml`
//! 3. Local config: explicit path (e.g. `--config`)
//! 4. Environment variables: `NAVCOMPOSE__*` prefix

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// What the engine does when a contributor's source fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Leave the failing contributor out of this round and keep the rest.
    #[default]
    Isolate,
    /// Any failure fails the whole build or refresh.
    FailTogether,
}

impl std::str::FromStr for FailurePolicy {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "isolate" => Ok(Self::Isolate),
            "fail_together" => Ok(Self::FailTogether),
            other => Err(ApplicationError::Config {
                message: format!("unknown failure policy: {}", other),
            }),
        }
    }
}

/// Composition engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub failure_policy: FailurePolicy,
    /// Run a full refresh right after the initial build
    pub refresh_on_build: bool,
    /// Capacity of the data-change broadcast channel
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Isolate,
            refresh_on_build: true,
            event_buffer: 64,
        }
    }
}

/// Per-contributor override, keyed by contributor name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContributorOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ContributorOverride {
    fn merge(&self, overlay: &ContributorOverride) -> Self {
        Self {
            order: overlay.order.or(self.order),
            enabled: overlay.enabled.or(self.enabled),
        }
    }
}

/// Raw engine config for intermediate parsing (None = not specified).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawEngineConfig {
    pub failure_policy: Option<FailurePolicy>,
    pub refresh_on_build: Option<bool>,
    pub event_buffer: Option<usize>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub manifest: Option<PathBuf>,
    pub engine: RawEngineConfig,
    pub features: BTreeMap<String, bool>,
    pub contributors: BTreeMap<String, ContributorOverride>,
}

/// Unified configuration for navcompose.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Default contributor manifest for the CLI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
    pub engine: EngineConfig,
    /// Initial values of the session feature flags
    pub features: BTreeMap<String, bool>,
    pub contributors: BTreeMap<String, ContributorOverride>,
}

/// Get the XDG config directory for navcompose.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "navcompose").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("navcompose.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

impl Settings {
    /// Override for a contributor, if configured.
    pub fn contributor(&self, name: &str) -> Option<&ContributorOverride> {
        self.contributors.get(name)
    }

    /// Merge overlay config onto self (base).
    ///
    /// - Scalar options: overlay wins if Some, otherwise keep base
    /// - Maps: merged key-wise, overlay entries win
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let mut features = self.features.clone();
        features.extend(overlay.features.iter().map(|(k, v)| (k.clone(), *v)));

        let mut contributors = self.contributors.clone();
        for (name, over) in &overlay.contributors {
            let merged = contributors
                .get(name)
                .map(|base| base.merge(over))
                .unwrap_or_else(|| over.clone());
            contributors.insert(name.clone(), merged);
        }

        Self {
            manifest: overlay.manifest.clone().or_else(|| self.manifest.clone()),
            engine: EngineConfig {
                failure_policy: overlay
                    .engine
                    .failure_policy
                    .unwrap_or(self.engine.failure_policy),
                refresh_on_build: overlay
                    .engine
                    .refresh_on_build
                    .unwrap_or(self.engine.refresh_on_build),
                event_buffer: overlay
                    .engine
                    .event_buffer
                    .unwrap_or(self.engine.event_buffer),
            },
            features,
            contributors,
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Optional config file layered on top of the global one
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(path) = local {
            let path = expand_path(path);
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            let raw = load_raw_settings(&path)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;

        if let Some(manifest) = &current.manifest {
            current.manifest = Some(expand_path(manifest));
        }

        Ok(current)
    }

    /// Load from a single TOML string on top of defaults (no global, no env).
    pub fn from_toml(content: &str) -> Result<Self, ApplicationError> {
        let raw: RawSettings = toml::from_str(content).map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })?;
        Ok(Self::default().merge_with(&raw))
    }

    /// Apply NAVCOMPOSE__* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("NAVCOMPOSE").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("manifest") {
            settings.manifest = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("engine.failure_policy") {
            settings.engine.failure_policy = val.parse()?;
        }
        if let Ok(val) = config.get_bool("engine.refresh_on_build") {
            settings.engine.refresh_on_build = val;
        }
        if let Ok(val) = config.get_int("engine.event_buffer") {
            settings.engine.event_buffer = usize::try_from(val).map_err(|_| {
                ApplicationError::Config {
                    message: format!("invalid event buffer: {}", val),
                }
            })?;
        }
        if let Ok(table) = config.get_table("features") {
            for (name, value) in table {
                let enabled = value.into_bool().map_err(config_err)?;
                settings.features.insert(name, enabled);
            }
        }

        Ok(settings)
    }

    /// Render as TOML for `config show`.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })
    }
}
