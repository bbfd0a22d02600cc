//! Application configuration
//!
//! Layered: built-in defaults, then an optional `config.toml`, then
//! environment variables prefixed with `MESSENGER` (sections separated by
//! `__`, e.g. `MESSENGER__SERVER__PORT=8080`).

use std::fmt;

use integration_messenger::{DEFAULT_API_BASE_URL, MessengerConfig, MessengerError};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Messenger Platform configuration
    #[serde(default)]
    pub messenger: MessengerAppConfig,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from `config.toml` (if present) and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from the given file stem and environment
    pub fn load_from(file: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // Start with defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("messenger.api_base_url", DEFAULT_API_BASE_URL)?
            // Load from file if exists
            .add_source(config::File::with_name(file).required(false))
            // Override with environment variables (e.g., MESSENGER__SERVER__PORT)
            .add_source(
                config::Environment::with_prefix("MESSENGER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds to wait for open connections after a shutdown signal (default 30)
    #[serde(default)]
    pub shutdown_timeout_secs: Option<u64>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: None,
        }
    }
}

/// Messenger Platform configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct MessengerAppConfig {
    /// Page access token (sensitive - uses SecretString)
    #[serde(default, skip_serializing)]
    pub access_token: Option<SecretString>,

    /// Verify token for the webhook subscription handshake
    #[serde(default)]
    pub verify_token: Option<String>,

    /// Page the bot acts for
    #[serde(default)]
    pub page_id: String,

    /// Graph API root (default: https://graph.facebook.com/v2.6/)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Maximum number of event handlers running at once (0 = unbounded)
    ///
    /// Once the limit is reached, the `POST /webhook` response is delayed
    /// until a running handler finishes and frees a slot.
    #[serde(default)]
    pub max_concurrent_handlers: usize,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Default for MessengerAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            verify_token: None,
            page_id: String::new(),
            api_base_url: default_api_base_url(),
            max_concurrent_handlers: 0,
        }
    }
}

impl fmt::Debug for MessengerAppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessengerAppConfig")
            .field(
                "access_token",
                &if self.access_token.is_some() {
                    Some("[REDACTED]")
                } else {
                    None
                },
            )
            .field(
                "verify_token",
                &if self.verify_token.is_some() {
                    Some("[REDACTED]")
                } else {
                    None
                },
            )
            .field("page_id", &self.page_id)
            .field("api_base_url", &self.api_base_url)
            .field("max_concurrent_handlers", &self.max_concurrent_handlers)
            .finish()
    }
}

impl MessengerAppConfig {
    /// Build the client configuration, failing when no access token is set
    pub fn to_client_config(&self) -> Result<MessengerConfig, MessengerError> {
        let Some(access_token) = self
            .access_token
            .as_ref()
            .filter(|t| !t.expose_secret().is_empty())
        else {
            return Err(MessengerError::config("messenger.access_token is required"));
        };

        let mut config = MessengerConfig::new(access_token.expose_secret())
            .with_page_id(self.page_id.clone())
            .with_api_base_url(self.api_base_url.clone());
        if let Some(token) = &self.verify_token {
            config = config.with_verify_token(token.clone());
        }
        Ok(config)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert!(config.shutdown_timeout_secs.is_none());
    }

    #[test]
    fn messenger_config_defaults() {
        let config = MessengerAppConfig::default();
        assert!(config.access_token.is_none());
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.max_concurrent_handlers, 0);
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = MessengerAppConfig {
            access_token: Some(SecretString::from("EAAG-secret".to_string())),
            verify_token: Some("hub-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("EAAG-secret"));
        assert!(!debug.contains("hub-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn client_config_requires_access_token() {
        let config = MessengerAppConfig::default();
        assert!(matches!(
            config.to_client_config(),
            Err(MessengerError::Configuration(_))
        ));

        let config = MessengerAppConfig {
            access_token: Some(SecretString::from(String::new())),
            ..Default::default()
        };
        assert!(config.to_client_config().is_err());
    }

    #[test]
    fn client_config_carries_values() {
        let config = MessengerAppConfig {
            access_token: Some(SecretString::from("token".to_string())),
            verify_token: Some("abc".to_string()),
            page_id: "42".to_string(),
            api_base_url: "http://localhost:9000/".to_string(),
            max_concurrent_handlers: 4,
        };
        let client = config.to_client_config().unwrap();
        assert_eq!(client.access_token.expose_secret(), "token");
        assert_eq!(client.verify_token.as_deref(), Some("abc"));
        assert_eq!(client.page_id, "42");
        assert_eq!(client.api_base_url, "http://localhost:9000/");
    }

    #[test]
    fn log_format_deserialization() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    #[test]
    fn loads_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
log_format = "json"

[server]
port = 8080

[messenger]
access_token = "from-file"
verify_token = "abc"
page_id = "123"
max_concurrent_handlers = 8
"#
        )
        .unwrap();

        let stem = file.path().with_extension("");
        let config = AppConfig::load_from(stem.to_str().unwrap()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.messenger.verify_token.as_deref(), Some("abc"));
        assert_eq!(config.messenger.page_id, "123");
        assert_eq!(config.messenger.max_concurrent_handlers, 8);
        assert_eq!(config.messenger.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(
            config
                .messenger
                .access_token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
            Some("from-file".to_string())
        );
    }
}
