// Configuration store: a small JSON file in the user's config directory
// that keeps the rotating auth credentials between runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default origin of the time-tracking API.
pub const DEFAULT_API_ROOT: &str = "https://api.getlabor.com.br";

const CONFIG_FILE: &str = "config.json";

/// Errors raised while reading or writing the config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// The rotating credential set issued by the server on every response.
///
/// Field names on disk match the HTTP header names the server uses.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    #[serde(rename = "token-type", default)]
    pub token_type: String,
    #[serde(rename = "access-token", default)]
    pub access_token: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub uid: String,
}

impl Credentials {
    /// True when no field carries a value, i.e. nobody is logged in.
    pub fn is_empty(&self) -> bool {
        self.token_type.is_empty()
            && self.access_token.is_empty()
            && self.client.is_empty()
            && self.uid.is_empty()
    }

    /// Header name / value pairs in the order they are sent.
    pub fn header_pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("token-type", &self.token_type),
            ("access-token", &self.access_token),
            ("client", &self.client),
            ("uid", &self.uid),
        ]
    }
}

/// Everything persisted between runs.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Credentials>,
}

/// Partial update for [`ConfigStore::set`]. `None` fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigPatch {
    pub auth: Option<Option<Credentials>>,
}

impl ConfigPatch {
    pub fn auth(credentials: Credentials) -> Self {
        ConfigPatch {
            auth: Some(Some(credentials)),
        }
    }

    pub fn clear_auth() -> Self {
        ConfigPatch { auth: Some(None) }
    }
}

/// Loads, merges and saves [`Config`]. A store without a path lives only in
/// memory.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    config: Config,
}

impl ConfigStore {
    /// Open the store at the default location (see [`config_path`]).
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::open(config_path())
    }

    /// Open the store backed by `path`. A missing file yields an empty config.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = load(&path)?;
        tracing::debug!(path = %path.display(), logged_in = config.auth.is_some(), "loaded config");
        Ok(ConfigStore {
            path: Some(path),
            config,
        })
    }

    /// A store that is never written to disk.
    pub fn in_memory(config: Config) -> Self {
        ConfigStore { path: None, config }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self) -> &Config {
        &self.config
    }

    /// Merge `patch` into the config at the top level and persist it.
    /// If the file cannot be written the in-memory config is left unchanged.
    pub fn set(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        let mut next = self.config.clone();
        if let Some(auth) = patch.auth {
            next.auth = auth;
        }
        if let Some(path) = &self.path {
            save(path, &next)?;
        }
        self.config = next;
        Ok(())
    }
}

/// `$LABOR_CONFIG_DIR/config.json`, else `<config dir>/labor/config.json`.
pub fn config_path() -> PathBuf {
    config_path_in(std::env::var_os("LABOR_CONFIG_DIR").map(PathBuf::from))
}

fn config_path_in(override_dir: Option<PathBuf>) -> PathBuf {
    let dir = override_dir.unwrap_or_else(|| {
        dirs::config_dir()
            .map(|d| d.join("labor"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    dir.join(CONFIG_FILE)
}

/// API origin from `LABOR_API_URL`, without a trailing slash.
pub fn api_root() -> String {
    api_root_from(std::env::var("LABOR_API_URL").ok())
}

fn api_root_from(value: Option<String>) -> String {
    let root = value.unwrap_or_else(|| DEFAULT_API_ROOT.into());
    root.trim_end_matches('/').to_string()
}

fn load(path: &Path) -> Result<Config, ConfigError> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let data = serde_json::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(path, data).map_err(io_err)
}
