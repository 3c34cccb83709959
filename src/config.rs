//! Backend endpoint configuration.
//!
//! Resolution order (later wins):
//! 1. Built-in defaults (local dev backend on 127.0.0.1:8080)
//! 2. `~/.config/allergy-lens/config.json` (macOS: `~/Library/Application Support/...`)
//! 3. `ALLERGY_LENS_*` environment variables (also fed from `.env.local` / `.env`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "ALLERGY_LENS_API_URL";
pub const ENV_PREDICTION_PATH: &str = "ALLERGY_LENS_PREDICTION_PATH";
pub const ENV_HISTORY_PATH: &str = "ALLERGY_LENS_HISTORY_PATH";
pub const ENV_ME_PATH: &str = "ALLERGY_LENS_ME_PATH";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where the backend lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    pub api_base_url: String,
    pub prediction_path: String,
    pub history_path: String,
    pub me_path: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080".to_string(),
            prediction_path: "/prediction".to_string(),
            history_path: "/history".to_string(),
            me_path: "/me".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Defaults pointed at a different host. Handy for tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Full resolution: defaults → config file → environment.
    pub fn resolve() -> Self {
        let mut config = config_path()
            .map(|p| load_from(&p))
            .unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        log::info!("[CONFIG] Backend: {}", config.api_base_url);
        config
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fields: [(&str, &mut String); 4] = [
            (ENV_API_URL, &mut self.api_base_url),
            (ENV_PREDICTION_PATH, &mut self.prediction_path),
            (ENV_HISTORY_PATH, &mut self.history_path),
            (ENV_ME_PATH, &mut self.me_path),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                log::info!("[CONFIG] {} override: {}", key, value);
                *field = value.trim().to_string();
            }
        }
    }

    pub fn prediction_url(&self) -> String {
        self.join(&self.prediction_path)
    }

    pub fn history_url(&self) -> String {
        self.join(&self.history_path)
    }

    pub fn me_url(&self) -> String {
        self.join(&self.me_path)
    }

    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Path to the user config file, if the platform has a config dir.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("allergy-lens").join(CONFIG_FILE))
}

/// Load a config file. Missing or invalid files fall back to defaults;
/// unknown or absent fields keep their default values.
pub fn load_from(path: &Path) -> ServiceConfig {
    match std::fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("[CONFIG] Ignoring invalid {}: {}", path.display(), e);
            ServiceConfig::default()
        }),
        Err(_) => ServiceConfig::default(),
    }
}

/// Persist a config file, creating parent directories as needed.
pub fn save_to(path: &Path, config: &ServiceConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("[CONFIG] Saved {}", path.display());
    Ok(())
}

/// Persist to the default user config location.
pub fn save_config(config: &ServiceConfig) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(&path, config)
}
