use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,
    /// Empty or absent means any origin is allowed.
    pub cors_allowed_origins: Option<Vec<String>>,

    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub access_token_lifetime_minutes: Option<i64>,
    pub refresh_token_lifetime_hours: Option<i64>,
    pub blacklist_prune_interval_minutes: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
