//! Runtime configuration
//!
//! [`SyncConfig`] is built once at startup and passed explicitly to the
//! engine, the adapters and the scheduler. Sources in order of precedence:
//!
//! 1. a configuration file (`--config`, TOML/JSON/YAML by extension)
//! 2. the `CONFIG_YAML` environment variable
//! 3. environment-only defaults (`SYNC_INTERVAL`, `CONFIG_MAPPINGS`,
//!    `VAULTSYNC_DOCS_ROOT`, `VAULTSYNC_VAULT_ROOT`)
//!
//! `VAULTSYNC_STATE_FILE` and `VAULTSYNC_CONFLICT_LOG` override the file
//! locations whichever source was used.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vaultsync_fs::{ConfigFormat, ConfigStore};

use crate::mapping::{
    DEFAULT_MAPPINGS_VAR, EnvMappings, MappingSource, StaticMappings, TableMappings,
};
use crate::model::Mapping;
use crate::time::{DEFAULT_MTIME_TOLERANCE_MS, MtimeTolerance};
use crate::{Error, Result};

pub const CONFIG_YAML_VAR: &str = "CONFIG_YAML";
pub const SYNC_INTERVAL_VAR: &str = "SYNC_INTERVAL";
pub const DOCS_ROOT_VAR: &str = "VAULTSYNC_DOCS_ROOT";
pub const VAULT_ROOT_VAR: &str = "VAULTSYNC_VAULT_ROOT";
pub const STATE_FILE_VAR: &str = "VAULTSYNC_STATE_FILE";
pub const CONFLICT_LOG_VAR: &str = "VAULTSYNC_CONFLICT_LOG";

pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_STATE_FILE: &str = ".sync_state.json";
pub const DEFAULT_CONFLICT_LOG: &str = "conflicts.log";

/// Location of one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRoot {
    pub root: PathBuf,
}

/// Where mappings come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingsConfig {
    Inline(Vec<Mapping>),
    Source(MappingSourceConfig),
}

impl Default for MappingsConfig {
    fn default() -> Self {
        Self::Inline(Vec::new())
    }
}

/// An external mapping source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum MappingSourceConfig {
    Env {
        #[serde(default = "default_mappings_var")]
        var: String,
    },
    Table {
        path: PathBuf,
    },
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between cycles.
    #[serde(default = "default_sync_interval")]
    pub sync_interval: u64,

    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    #[serde(default = "default_conflict_log")]
    pub conflict_log: PathBuf,

    #[serde(default = "default_tolerance_ms")]
    pub mtime_tolerance_ms: u64,

    pub documents: StoreRoot,

    pub vault: StoreRoot,

    #[serde(default)]
    pub mappings: MappingsConfig,
}

fn default_sync_interval() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}

fn default_state_file() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_FILE)
}

fn default_conflict_log() -> PathBuf {
    PathBuf::from(DEFAULT_CONFLICT_LOG)
}

fn default_tolerance_ms() -> u64 {
    DEFAULT_MTIME_TOLERANCE_MS
}

fn default_mappings_var() -> String {
    DEFAULT_MAPPINGS_VAR.to_string()
}

impl SyncConfig {
    /// Load configuration using the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load configuration with an explicit environment lookup.
    pub fn load_with(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let store = ConfigStore::new();

        let mut config = match path {
            Some(path) if path.is_file() => {
                info!(path = %path.display(), "Loading configuration file");
                store.load::<Self>(path)?
            }
            _ => {
                if let Some(path) = path {
                    warn!(path = %path.display(), "Configuration file not found, using environment");
                }
                match env(CONFIG_YAML_VAR) {
                    Some(yaml) => {
                        info!("Loading configuration from {}", CONFIG_YAML_VAR);
                        store.parse::<Self>(&yaml, ConfigFormat::Yaml, Path::new(CONFIG_YAML_VAR))?
                    }
                    None => Self::from_env(&env)?,
                }
            }
        };

        if let Some(state_file) = env(STATE_FILE_VAR) {
            config.state_file = PathBuf::from(state_file);
        }
        if let Some(conflict_log) = env(CONFLICT_LOG_VAR) {
            config.conflict_log = PathBuf::from(conflict_log);
        }

        config.validate()?;
        Ok(config)
    }

    fn from_env(env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            env(key).ok_or_else(|| {
                Error::config(format!(
                    "no configuration file, {CONFIG_YAML_VAR} is unset and {key} is missing"
                ))
            })
        };

        let sync_interval = match env(SYNC_INTERVAL_VAR) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                Error::config(format!(
                    "{SYNC_INTERVAL_VAR} must be a whole number of seconds, got '{raw}'"
                ))
            })?,
            None => DEFAULT_SYNC_INTERVAL_SECS,
        };

        Ok(Self {
            sync_interval,
            state_file: default_state_file(),
            conflict_log: default_conflict_log(),
            mtime_tolerance_ms: DEFAULT_MTIME_TOLERANCE_MS,
            documents: StoreRoot {
                root: PathBuf::from(required(DOCS_ROOT_VAR)?),
            },
            vault: StoreRoot {
                root: PathBuf::from(required(VAULT_ROOT_VAR)?),
            },
            mappings: MappingsConfig::Source(MappingSourceConfig::Env {
                var: default_mappings_var(),
            }),
        })
    }

    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<()> {
        if self.sync_interval == 0 {
            return Err(Error::config("sync_interval must be greater than zero"));
        }
        if self.documents.root.as_os_str().is_empty() {
            return Err(Error::config("documents.root must be set"));
        }
        if self.vault.root.as_os_str().is_empty() {
            return Err(Error::config("vault.root must be set"));
        }
        match &self.mappings {
            MappingsConfig::Inline(list) if list.is_empty() => {
                Err(Error::config("no mappings configured"))
            }
            MappingsConfig::Source(MappingSourceConfig::Env { var }) if var.trim().is_empty() => {
                Err(Error::config("mapping environment variable name is empty"))
            }
            MappingsConfig::Source(MappingSourceConfig::Table { path })
                if path.as_os_str().is_empty() =>
            {
                Err(Error::config("mapping table path is empty"))
            }
            _ => Ok(()),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval)
    }

    pub fn tolerance(&self) -> MtimeTolerance {
        MtimeTolerance::from_millis(self.mtime_tolerance_ms)
    }

    /// The authoritative mapping source for this configuration.
    pub fn mapping_source(&self) -> Box<dyn MappingSource> {
        match &self.mappings {
            MappingsConfig::Inline(list) => Box::new(StaticMappings::new(list.clone())),
            MappingsConfig::Source(MappingSourceConfig::Env { var }) => {
                Box::new(EnvMappings::new(var.clone()))
            }
            MappingsConfig::Source(MappingSourceConfig::Table { path }) => {
                Box::new(TableMappings::new(path.clone()))
            }
        }
    }
}
