use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// SMTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    /// SMTP port (587 for STARTTLS, 465 for implicit TLS)
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Connection security: "starttls" or "tls"
    #[serde(default = "default_security")]
    pub security: String,
    /// Authenticate with username/password when true
    #[serde(default)]
    pub auth: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Default sender address used when the caller gives none
    #[serde(default)]
    pub from: String,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_security() -> String {
    "starttls".to_string()
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            security: default_security(),
            auth: false,
            username: String::new(),
            password: String::new(),
            from: String::new(),
        }
    }
}

/// Microsoft Graph calendar settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Graph API base (override for testing)
    #[serde(default = "default_graph_base")]
    pub base_url: String,
    /// Token endpoint; when empty the login.microsoftonline.com endpoint
    /// for `tenant_id` is used
    #[serde(default)]
    pub token_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_graph_base() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            base_url: default_graph_base(),
            token_url: String::new(),
            timeout: default_timeout(),
        }
    }
}

impl GraphConfig {
    /// Resolve the token endpoint for the configured tenant.
    pub fn token_endpoint(&self) -> String {
        if self.token_url.is_empty() {
            format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                self.tenant_id
            )
        } else {
            self.token_url.clone()
        }
    }
}

/// Message relay (school platform web services) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Platform hostname, e.g. "myschool.smartschool.be"
    #[serde(default)]
    pub platform: String,
    /// Web services credential for the platform
    #[serde(default)]
    pub password: String,
    /// Full service URL override (testing); when empty it is derived
    /// from `platform`
    #[serde(default)]
    pub service_url: String,
    /// Absorb delivery failures after logging instead of returning them
    #[serde(default)]
    pub swallow_errors: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub test_user: TestUser,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            platform: String::new(),
            password: String::new(),
            service_url: String::new(),
            swallow_errors: false,
            timeout: default_timeout(),
            test_user: TestUser::default(),
        }
    }
}

/// Test account used to reroute relay traffic in debug mode
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TestUser {
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub account: u32,
}

impl TestUser {
    /// All four fields are required before debug-mode sends are allowed.
    pub fn is_complete(&self) -> bool {
        !self.platform.is_empty()
            && !self.password.is_empty()
            && !self.username.is_empty()
            && self.account != 0
    }

    /// Merge non-empty fields of `update` into this configuration.
    pub fn merge(&mut self, update: TestUser) {
        if !update.platform.is_empty() {
            self.platform = update.platform;
        }
        if !update.password.is_empty() {
            self.password = update.password;
        }
        if !update.username.is_empty() {
            self.username = update.username;
        }
        if update.account != 0 {
            self.account = update.account;
        }
    }
}

impl Config {
    /// Get the project directories
    pub fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "schoolcomm", "schoolcomm")
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs().context("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_smtp_conventions() {
        let config = Config::default();
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.smtp.security, "starttls");
        assert_eq!(config.graph.base_url, "https://graph.microsoft.com/v1.0");
        assert!(!config.relay.swallow_errors);
    }

    #[test]
    fn token_endpoint_derived_from_tenant() {
        let graph = GraphConfig {
            tenant_id: "contoso".to_string(),
            ..Default::default()
        };
        assert_eq!(
            graph.token_endpoint(),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_user_merge_keeps_existing_fields() {
        let mut user = TestUser {
            platform: "test.example.be".to_string(),
            password: "secret".to_string(),
            username: "jdoe".to_string(),
            account: 1,
        };
        user.merge(TestUser {
            username: "other".to_string(),
            ..Default::default()
        });
        assert_eq!(user.username, "other");
        assert_eq!(user.platform, "test.example.be");
        assert_eq!(user.account, 1);
    }

    #[test]
    fn incomplete_test_user_detected() {
        let user = TestUser {
            platform: "test.example.be".to_string(),
            password: "secret".to_string(),
            username: "jdoe".to_string(),
            account: 0,
        };
        assert!(!user.is_complete());
    }

    #[test]
    fn parses_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [smtp]
            host = "mail.example.be"

            [relay]
            platform = "school.example.be"
            password = "ws-secret"
            "#,
        )
        .unwrap();
        assert_eq!(config.smtp.host, "mail.example.be");
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.relay.platform, "school.example.be");
        assert!(config.relay.test_user.platform.is_empty());
    }
}
