use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::db::connection;
use crate::error::FmsError;

/// Settings read from `.fms/config.json`. Missing keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefix of generated project codes.
    pub code_prefix: String,
    /// Attempts at generating a unique project code.
    pub identifier_attempts: u32,
    /// Attempts before an outbox row is marked failed.
    pub outbox_max_attempts: u32,
    /// Default tracing filter; `FMS_LOG` overrides it.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            code_prefix: "PRJ".into(),
            identifier_attempts: 5,
            outbox_max_attempts: 5,
            log_level: "warn".into(),
        }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self, FmsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| FmsError::database(e.to_string()))?;
        serde_json::from_str(&content)
            .map_err(|e| FmsError::validation(format!("Invalid config {}: {e}", path.display())))
    }

    /// Config of the enclosing `.fms` directory, or defaults outside one.
    pub fn load() -> Result<Self, FmsError> {
        match connection::config_path() {
            Ok(path) => Self::load_from(&path),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Write defaults next to the database unless a config already exists.
    pub fn write_default(dir: &Path) -> Result<(), FmsError> {
        let path = dir.join("config.json");
        if path.exists() {
            return Ok(());
        }
        let body = serde_json::to_string_pretty(&Self::default())?;
        fs::write(&path, body).map_err(|e| FmsError::database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"code_prefix": "FMS"}"#).unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.code_prefix, "FMS");
        assert_eq!(cfg.identifier_attempts, 5);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load_from(&dir.path().join("none.json")).unwrap(), Config::default());
    }
}
