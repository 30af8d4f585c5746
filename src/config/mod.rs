//! Configuration (layered: code > env > config file).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use serde::Deserialize;

use crate::error::{ClientError, Result};

/// Global default config (lazy-initialized from env + config file).
static DEFAULT_CONFIG: OnceLock<ClientConfig> = OnceLock::new();

const ENV_BASE_URL: &str = "REPOWIKI_BASE_URL";
const ENV_TOKEN: &str = "REPOWIKI_TOKEN";
const CONFIG_FILE: &str = "repowiki.toml";

/// Layered configuration for the backend client.
///
/// Resolution order for each value:
/// 1. Explicit setters (`set_base_url` / `set_token`)
/// 2. Environment (`REPOWIKI_BASE_URL` / `REPOWIKI_TOKEN`, `.env` honored)
/// 3. `repowiki.toml` in the platform config directory
#[derive(Clone, Default)]
pub struct ClientConfig {
    base_url: Arc<RwLock<Option<String>>>,
    token: Arc<RwLock<Option<String>>>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.read().ok().map(|_| ".."))
            .finish()
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    backend: BackendSection,
}

#[derive(Debug, Deserialize, Default)]
struct BackendSection {
    base_url: Option<String>,
    token: Option<String>,
}

impl ClientConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment, falling back to the platform config file.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let config = Self::new();

        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            config.set_base_url(url);
        }
        if let Ok(token) = std::env::var(ENV_TOKEN) {
            config.set_token(token);
        }

        if let Some(path) = default_config_path() {
            if let Err(e) = config.merge_file(&path) {
                tracing::debug!(path = %path.display(), error = %e, "Skipping config file");
            }
        }

        config
    }

    /// Get (or create) the global default config.
    pub fn global() -> &'static ClientConfig {
        DEFAULT_CONFIG.get_or_init(Self::from_env)
    }

    /// Merge values from a TOML config file into unset slots.
    ///
    /// Already-resolved values (explicit or env) keep precedence.
    pub fn merge_file(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let raw = std::fs::read_to_string(path)?;
        let parsed: FileConfig = toml::from_str(&raw)
            .map_err(|e| ClientError::Configuration(format!("invalid config file: {e}")))?;

        if self.base_url().is_none() {
            if let Some(url) = parsed.backend.base_url {
                self.set_base_url(url);
            }
        }
        if self.token().is_none() {
            if let Some(token) = parsed.backend.token {
                self.set_token(token);
            }
        }
        Ok(())
    }

    pub fn set_base_url(&self, url: impl Into<String>) {
        let mut url = url.into();
        while url.ends_with('/') {
            url.pop();
        }
        *self.base_url.write().unwrap() = Some(url);
    }

    pub fn base_url(&self) -> Option<String> {
        self.base_url.read().unwrap().clone()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap() = Some(token.into());
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap().clone()
    }

    /// Resolve the base URL or fail with a configuration error.
    pub fn require_base_url(&self) -> Result<String> {
        self.base_url().ok_or_else(|| {
            ClientError::Configuration(format!("{ENV_BASE_URL} is not set"))
        })
    }

    /// Resolve the bearer token or fail with a configuration error.
    pub fn require_token(&self) -> Result<String> {
        self.token()
            .ok_or_else(|| ClientError::Configuration(format!("{ENV_TOKEN} is not set")))
    }
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "repowiki")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}
