// rest_api/src/config.rs

use std::env;
use std::fs;

use anyhow::{Context, Result};
use serde::Deserialize;

use calendar::GoogleConfig;

/// Server configuration, loaded from a YAML file at startup. Individual
/// fields can be overridden through the environment (`CLINIC_*` variables,
/// typically via `.env` in development).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    #[serde(default = "default_roles_file")]
    pub roles_file: String,
    /// Absent when the deployment has no calendar integration.
    pub google: Option<GoogleConfig>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_roles_file() -> String {
    "config/roles.yaml".to_string()
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read server config file: {}", path))?;
        let mut config = Self::from_yaml_str(&content)
            .with_context(|| format!("failed to parse server config file: {}", path))?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = env::var("CLINIC_HOST") {
            self.host = host;
        }
        if let Ok(port) = env::var("CLINIC_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
        if let Ok(url) = env::var("CLINIC_DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(secret) = env::var("CLINIC_JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if let Ok(path) = env::var("CLINIC_ROLES_FILE") {
            self.roles_file = path;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = ServerConfig::from_yaml_str(
            r#"
host: 0.0.0.0
port: 9090
database_url: sqlite://clinic.db
jwt_secret: not-a-real-secret
roles_file: config/roles.yaml
google:
  client_id: cid
  client_secret: secret
  redirect_uri: http://localhost:9090/google/callback
"#,
        )
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "0.0.0.0");
        let google = config.google.unwrap();
        assert_eq!(google.client_id, "cid");
        assert_eq!(google.timezone, "Asia/Jakarta");
    }

    #[test]
    fn google_block_is_optional_and_defaults_apply() {
        let config = ServerConfig::from_yaml_str(
            "database_url: sqlite::memory:\njwt_secret: s\n",
        )
        .unwrap();
        assert!(config.google.is_none());
        assert_eq!(config.port, 8080);
        assert_eq!(config.roles_file, "config/roles.yaml");
    }
}
