use std::path::{Path, PathBuf};
use std::time::Duration;

use markd_core::Credential;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".markd-sync.json";
const DEFAULT_DEBOUNCE_SECS: f64 = 2.0;

pub const EXAMPLE_CONFIG: &str = r#"{
  "workspace_id": "workspace-1",
  "api_url": "http://localhost:8000",
  "username": "your-username",
  "password": "your-password",
  "docs_path": "./docs",
  "watch_enabled": true,
  "auto_pull": false,
  "debounce_time": 2.0
}"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("'api_url' must be provided in config")]
    MissingApiUrl,
    #[error("invalid api_url {url:?}: {source}")]
    InvalidApiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("'workspace_id' must be provided in config")]
    MissingWorkspace,
    #[error("either 'username'/'password' or 'api_token' must be provided in config")]
    MissingCredential,
    #[error("debounce_time must be a positive number of seconds, got {0}")]
    InvalidDebounce(f64),
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    api_url: Option<String>,
    workspace_id: Option<WorkspaceId>,
    username: Option<String>,
    password: Option<String>,
    api_token: Option<String>,
    docs_path: Option<String>,
    #[serde(default)]
    watch_enabled: bool,
    #[serde(default)]
    auto_pull: bool,
    debounce_time: Option<f64>,
}

// Workspace ids may be written as strings or integers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkspaceId {
    Text(String),
    Number(i64),
}

impl From<WorkspaceId> for String {
    fn from(raw: WorkspaceId) -> Self {
        match raw {
            WorkspaceId::Text(text) => text,
            WorkspaceId::Number(number) => number.to_string(),
        }
    }
}

/// Values the environment may supply on top of the config file.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pub password: Option<String>,
    pub api_token: Option<String>,
    pub debounce_secs: Option<f64>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            password: read_string_env("MARKD_SYNC_PASSWORD"),
            api_token: read_string_env("MARKD_SYNC_API_TOKEN"),
            debounce_secs: read_string_env("MARKD_SYNC_DEBOUNCE_SECS")
                .and_then(|value| value.parse::<f64>().ok()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub api_url: String,
    pub workspace_id: String,
    pub credential: Credential,
    pub docs_root: PathBuf,
    pub watch_enabled: bool,
    pub auto_pull: bool,
    pub debounce: Duration,
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path, &EnvOverrides::from_env())
    }

    /// Builds the configuration from the JSON text of the file at `path`.
    pub fn parse(text: &str, path: &Path, env: &EnvOverrides) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let api_url = non_empty(raw.api_url).ok_or(ConfigError::MissingApiUrl)?;
        if let Err(source) = url::Url::parse(&api_url) {
            return Err(ConfigError::InvalidApiUrl {
                url: api_url,
                source,
            });
        }
        let workspace_id = non_empty(raw.workspace_id.map(String::from))
            .ok_or(ConfigError::MissingWorkspace)?;

        let password = env.password.clone().or(raw.password);
        let api_token = env.api_token.clone().or(raw.api_token);
        let credential = match (non_empty(raw.username), non_empty(password), non_empty(api_token))
        {
            (Some(username), Some(password), _) => Credential::Login { username, password },
            (_, _, Some(token)) => Credential::Token(token),
            _ => return Err(ConfigError::MissingCredential),
        };

        let debounce_secs = env
            .debounce_secs
            .or(raw.debounce_time)
            .unwrap_or(DEFAULT_DEBOUNCE_SECS);
        if debounce_secs <= 0.0 {
            return Err(ConfigError::InvalidDebounce(debounce_secs));
        }
        let debounce = Duration::try_from_secs_f64(debounce_secs)
            .map_err(|_| ConfigError::InvalidDebounce(debounce_secs))?;

        Ok(Self {
            api_url,
            workspace_id,
            credential,
            docs_root: resolve_docs_root(path, raw.docs_path.as_deref()),
            watch_enabled: raw.watch_enabled,
            auto_pull: raw.auto_pull,
            debounce,
        })
    }
}

fn resolve_docs_root(config_path: &Path, docs_path: Option<&str>) -> PathBuf {
    let config_dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let Some(docs_path) = docs_path.filter(|value| !value.trim().is_empty()) else {
        return config_dir;
    };
    let docs_path = match dirs::home_dir() {
        Some(home) => expand_with_home(docs_path, &home),
        None => PathBuf::from(docs_path),
    };
    if docs_path.is_absolute() {
        docs_path
    } else {
        config_dir.join(docs_path)
    }
}

fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn read_string_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
