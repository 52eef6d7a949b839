//! Runtime configuration and persisted session settings

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::{GradeScale, Session};
use crate::utils::http::RetryConfig;

const DEFAULT_API_URL: &str = "http://localhost:8787";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub retry: RetryConfig,
    pub log_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryConfig::default(),
            log_dir: None,
        }
    }
}

impl SyncConfig {
    /// Defaults overridden by `HOOKED_API_URL`, `HOOKED_TIMEOUT_SECS` and
    /// `HOOKED_LOG_DIR`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("HOOKED_API_URL").filter(|u| !u.trim().is_empty()) {
            config.api_base_url = url;
        }

        if let Some(raw) = lookup("HOOKED_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout_secs = secs,
                _ => warn!("Ignoring invalid HOOKED_TIMEOUT_SECS: {}", raw),
            }
        }

        config.log_dir = lookup("HOOKED_LOG_DIR")
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from);

        config
    }
}

/// Locally persisted sign-in state and display preference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionSettings {
    pub token: Option<String>,
    pub account_id: Option<String>,
    #[serde(default)]
    pub grade_scale: GradeScale,
}

impl SessionSettings {
    pub fn default_path() -> Result<PathBuf, String> {
        let app_support = dirs::data_dir()
            .ok_or("Could not find app data directory")?
            .join("com.hooked");
        Ok(app_support.join("session.json"))
    }

    /// Missing file reads as signed-out defaults
    pub fn load_from(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read session settings: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse session settings: {}", e))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings directory: {}", e))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize session settings: {}", e))?;

        fs::write(path, content).map_err(|e| format!("Failed to write session settings: {}", e))
    }

    pub fn session(&self) -> Session {
        Session {
            token: self.token.clone(),
            account_id: self.account_id.clone(),
            grade_scale: self.grade_scale,
        }
    }
}
