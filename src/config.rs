//! Configuration file support.
//!
//! ```toml
//! database_url = "postgres://localhost/app"
//! statements_dir = "sql"
//!
//! [pool]
//! max_connections = 5
//! acquire_timeout_secs = 30
//!
//! [statements.createTable]
//! transactional = false
//!
//! [statements.findOrCreatePerson]
//! single = true
//! ```

use crate::error::{SqlFnError, SqlFnResult};
use crate::policy::PolicyConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SqlFnsConfig {
    /// Database connection URL
    #[serde(default)]
    pub database_url: Option<String>,

    /// Directory holding the `.sql` statement files
    #[serde(default = "default_statements_dir")]
    pub statements_dir: PathBuf,

    #[serde(default)]
    pub pool: PoolSettings,

    /// Per-statement policy overrides, keyed by statement name
    #[serde(default)]
    pub statements: HashMap<String, StatementOverride>,
}

/// Connection pool sizing handed to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PoolSettings {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

/// Explicit policy for one statement. Unset fields fall back to the
/// predicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct StatementOverride {
    pub transactional: Option<bool>,
    pub single: Option<bool>,
}

fn default_statements_dir() -> PathBuf {
    PathBuf::from("sql")
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

impl Default for SqlFnsConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            statements_dir: default_statements_dir(),
            pool: PoolSettings::default(),
            statements: HashMap::new(),
        }
    }
}

impl SqlFnsConfig {
    /// Load a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> SqlFnResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SqlFnError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> SqlFnResult<Self> {
        toml::from_str(content)
            .map_err(|e| SqlFnError::Config(format!("Failed to parse config: {}", e)))
    }

    /// `~/.config/sqlfns/config.toml` (platform equivalent).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sqlfns").join("config.toml"))
    }

    /// Load from [`default_path`](Self::default_path) if that file exists,
    /// otherwise use defaults.
    pub fn load_default() -> SqlFnResult<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Policy configuration with the default predicates and this file's
    /// overrides.
    pub fn policy(&self) -> PolicyConfig {
        let mut policy = PolicyConfig::default();
        for (name, o) in &self.statements {
            if let Some(tx) = o.transactional {
                policy = policy.transactional(name.clone(), tx);
            }
            if let Some(single) = o.single {
                policy = policy.single_result(name.clone(), single);
            }
        }
        policy
    }
}
