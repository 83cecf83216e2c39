//! Configuration for the reading list.
//!
//! Values are layered, later sources winning:
//! 1. built-in defaults,
//! 2. a configuration file (TOML, YAML or JSON, picked by extension),
//! 3. environment variables prefixed with `READINGLIST_`
//!    (e.g. `READINGLIST_DATABASE=/tmp/books.sqlite`).

pub mod error;

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "READINGLIST_";
// `READINGLIST_CONFIG` names the file itself and must not leak in as a key.
const ENV_KEYS: &[&str] = &["environment", "database", "max_connections"];
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "readinglist.sqlite";

/// Deployment environment, reported by the status command.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[serde(alias = "dev")]
    #[display("development")]
    Development,
    #[serde(alias = "stage")]
    #[display("staging")]
    Staging,
    #[serde(alias = "prod")]
    #[display("production")]
    Production,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub environment: Environment,
    /// Path to the SQLite database file. Created if it doesn't exist.
    pub database: PathBuf,
    /// Upper bound on pooled database connections. Leave unset for the
    /// store's default.
    pub max_connections: Option<u32>,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            database: project_dirs()
                .map(|dirs| dirs.data_dir().join(DATABASE_FILE))
                .unwrap_or_else(|| PathBuf::from(DATABASE_FILE)),
            max_connections: None,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "readinglist")
}

fn file_provider(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::Invalid),
    })
}

impl Config {
    /// Where the configuration file is looked for when none is given.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Build the layered configuration sources without extracting them.
    ///
    /// An explicit `path` must exist. The default path is only used if a file
    /// is actually there.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => file_provider(figment, path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => file_provider(figment, &path)?,
                None => figment,
            },
        };
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).only(ENV_KEYS)))
    }

    /// Load the configuration from all sources.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::extract(Self::figment(path)?)
    }

    /// Extract and validate a configuration from prepared sources.
    pub fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Invalid)?;
        if config.max_connections == Some(0) {
            exn::bail!(ErrorKind::Invalid);
        }
        tracing::debug!(environment = %config.environment, database = %config.database.display(), "configuration loaded");
        Ok(config)
    }
}
