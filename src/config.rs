use crate::error::{IngestError, Result};
use serde::Deserialize;
use std::fs;

/// Service configuration loaded from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_path: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Token table for the static identity port: token -> user.
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub token: String,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_approved: bool,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_page_size() -> usize {
    10
}

impl Config {
    pub fn load_from(config_path: &str) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            IngestError::Config(format!("Failed to read config file '{}': {}", config_path, e))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let config: Config = toml::from_str(r#"database_path = "chemdata.db""#).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.page_size, 10);
        assert!(config.users.is_empty());
    }

    #[test]
    fn parses_user_table() {
        let config: Config = toml::from_str(
            r#"
            database_path = "chemdata.db"

            [[users]]
            token = "t-1"
            username = "alice"
            is_approved = true
            "#,
        )
        .unwrap();
        assert_eq!(config.users.len(), 1);
        assert!(config.users[0].is_approved);
        assert!(!config.users[0].is_admin);
    }
}
