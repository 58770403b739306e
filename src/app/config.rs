use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    CONFIG_ENV_PREFIX, DEFAULT_API_BASE_URL, HTTP_REQUEST_TIMEOUT_SECS, LOCAL_CONFIG_PATH,
    SESSION_ID_PLACEHOLDER,
};
use crate::session::{Language, SessionId};
use crate::utils::ChatError;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend address and endpoint table
    #[serde(default)]
    pub api: ApiConfig,

    /// Chat defaults
    #[serde(default)]
    pub chat: ChatSettings,
}

/// Backend API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base address every path below is joined onto
    pub base_url: String,
    /// Per-request timeout; answers are generated synchronously server-side
    pub timeout_secs: u64,
    #[serde(default)]
    pub paths: EndpointPaths,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: HTTP_REQUEST_TIMEOUT_SECS,
            paths: EndpointPaths::default(),
        }
    }
}

/// The single path table for every endpoint the client calls.
/// `{id}` is replaced by the session id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointPaths {
    pub login: String,
    pub subjects: String,
    pub sessions: String,
    pub session: String,
    pub session_message: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            subjects: "/subjects".to_string(),
            sessions: "/sessions".to_string(),
            session: "/sessions/{id}".to_string(),
            session_message: "/sessions/{id}/message".to_string(),
        }
    }
}

impl EndpointPaths {
    pub fn session_path(&self, id: SessionId) -> String {
        self.session.replace(SESSION_ID_PLACEHOLDER, &id.to_string())
    }

    pub fn session_message_path(&self, id: SessionId) -> String {
        self.session_message
            .replace(SESSION_ID_PLACEHOLDER, &id.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Language preselected in the session picker
    #[serde(default)]
    pub default_language: Language,

    /// Learning plan chosen by the student, e.g. "Board Prep"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

impl Config {
    /// Reject configurations the gateway could not use
    pub fn validate(&self) -> Result<(), ChatError> {
        Url::parse(&self.api.base_url).map_err(|e| {
            ChatError::Config(format!("invalid api.base_url '{}': {}", self.api.base_url, e))
        })?;

        if self.api.timeout_secs == 0 {
            return Err(ChatError::Config(
                "api.timeout_secs must be greater than zero".to_string(),
            ));
        }

        let paths = &self.api.paths;
        for (name, path) in [
            ("login", &paths.login),
            ("subjects", &paths.subjects),
            ("sessions", &paths.sessions),
        ] {
            if !path.starts_with('/') {
                return Err(ChatError::Config(format!(
                    "api.paths.{} must start with '/'",
                    name
                )));
            }
        }
        for (name, path) in [
            ("session", &paths.session),
            ("session_message", &paths.session_message),
        ] {
            if !path.starts_with('/') || !path.contains(SESSION_ID_PLACEHOLDER) {
                return Err(ChatError::Config(format!(
                    "api.paths.{} must start with '/' and contain {}",
                    name, SESSION_ID_PLACEHOLDER
                )));
            }
        }

        Ok(())
    }
}

/// Load configuration from the global file, the project-local file and the
/// environment, in increasing priority
pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    let files = [config_dir.join("config.toml"), PathBuf::from(LOCAL_CONFIG_PATH)];
    extract(layered(&files))
}

/// Load configuration from one explicit file (plus the environment)
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    extract(layered(&[path.to_path_buf()]))
}

fn layered(files: &[PathBuf]) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    for file in files {
        if file.exists() {
            figment = figment.merge(Toml::file(file));
        }
    }

    // EDUBOT_API__BASE_URL -> api.base_url
    figment.merge(Env::prefixed(CONFIG_ENV_PREFIX).split("__"))
}

fn extract(figment: Figment) -> Result<Config> {
    let config: Config = figment
        .extract()
        .context("Failed to load configuration")?;
    config.validate()?;
    Ok(config)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "edubot") {
        Ok(proj_dirs.config_dir().to_path_buf())
    } else {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        Ok(PathBuf::from(home).join(".config").join("edubot"))
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p,
        None => get_config_dir()?.join("config.toml"),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(path)
}

/// Create a default global configuration file if it doesn't exist.
/// Returns the path when a file was written.
pub fn init_config() -> Result<Option<PathBuf>> {
    let config_file = get_config_dir()?.join("config.toml");
    if config_file.exists() {
        return Ok(None);
    }
    save_config(&Config::default(), Some(config_file)).map(Some)
}
