// src/config.rs

//! Configuration loading utilities.
//!
//! This module provides convenience functions for locating and loading the
//! input files: runtime settings, provider definitions and SMTP credentials.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::models::{Config, Credentials};

const CONFIG_FILE: &str = "config.toml";
const WEBSITES_FILE: &str = "websites.json";
const CREDENTIALS_FILE: &str = "credentials.json";

const CREDENTIALS_EXAMPLE: &str = r#"{
    "email" : "foo@gmail.com",
    "password" : "bar",
    "recipient" : "foobar@tmomail.net",
    "smtp_host" : "smtp.myserver.com",
    "smtp_port" : 465
}"#;

/// Well-known file locations inside the input directory.
#[derive(Debug, Clone)]
pub struct InputPaths {
    root: PathBuf,
}

impl InputPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn config(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn websites(&self) -> PathBuf {
        self.root.join(WEBSITES_FILE)
    }

    pub fn credentials(&self) -> PathBuf {
        self.root.join(CREDENTIALS_FILE)
    }
}

/// Load runtime settings and validate them.
///
/// A missing `config.toml` falls back to defaults; a present but invalid one
/// is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        Config::load(path)?
    } else {
        log::warn!(
            "No settings file at {}, using default configuration",
            path.display()
        );
        Config::default()
    };
    config.validate()?;
    Ok(config)
}

/// Load SMTP credentials.
pub fn load_credentials(path: &Path) -> std::result::Result<Credentials, ConfigError> {
    let source = path.display().to_string();
    if !path.exists() {
        log::error!("{source} not found. Example contents:\n{CREDENTIALS_EXAMPLE}");
        return Err(ConfigError::Missing(source));
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::invalid(&source, e))?;
    let credentials: Credentials = serde_json::from_str(&content).map_err(|e| {
        log::error!("Problem reading {source}. Valid example:\n{CREDENTIALS_EXAMPLE}");
        ConfigError::invalid(&source, e)
    })?;

    log::info!("Successfully read credentials file");
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_settings_use_defaults() {
        let tmp = TempDir::new().unwrap();
        let paths = InputPaths::new(tmp.path());
        let config = load_config(&paths.config()).unwrap();
        assert_eq!(config.schedule.request_rate_secs, 300);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let tmp = TempDir::new().unwrap();
        let paths = InputPaths::new(tmp.path());
        fs::write(paths.config(), "[http]\ntimeout_secs = 0\n").unwrap();
        assert!(load_config(&paths.config()).is_err());
    }

    #[test]
    fn test_credentials_missing_and_invalid() {
        let tmp = TempDir::new().unwrap();
        let paths = InputPaths::new(tmp.path());

        assert!(matches!(
            load_credentials(&paths.credentials()),
            Err(ConfigError::Missing(_))
        ));

        fs::write(paths.credentials(), r#"{"email": "foo@gmail.com"}"#).unwrap();
        assert!(matches!(
            load_credentials(&paths.credentials()),
            Err(ConfigError::Invalid { .. })
        ));

        fs::write(paths.credentials(), CREDENTIALS_EXAMPLE).unwrap();
        let creds = load_credentials(&paths.credentials()).unwrap();
        assert_eq!(creds.smtp_port, 465);
    }
}
