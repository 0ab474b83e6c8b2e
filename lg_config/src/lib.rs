//! ABOUTME: Configuration management with validation and environment loading
//! ABOUTME: Handles server, OAuth, upstream API and polling settings

use config::{Config as ConfigBuilder, Environment, File};
use lg_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Scopes requested during the OAuth consent step
pub const DEFAULT_SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/youtube.readonly",
    "https://www.googleapis.com/auth/youtube.force-ssl",
    "https://www.googleapis.com/auth/youtube.upload",
    "https://www.googleapis.com/auth/youtube",
];

/// Main configuration struct
#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub oauth: OAuthConfig,
    #[validate(nested)]
    pub api: ApiConfig,
    #[validate(nested)]
    pub poll: PollConfig,
    pub telemetry: TelemetryConfig,
}

/// Server configuration for the scrape endpoint
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// OAuth client configuration with secret redaction
#[derive(Clone, Deserialize, Serialize, Validate)]
pub struct OAuthConfig {
    #[validate(length(min = 1))]
    pub client_id: String,
    #[validate(length(min = 1))]
    pub client_secret: String,
    #[validate(url)]
    pub redirect_url: String,
    #[validate(url)]
    pub auth_url: String,
    #[validate(url)]
    pub token_url: String,
    /// Where the token blob is persisted between runs
    #[validate(length(min = 1))]
    pub token_path: String,
    #[validate(length(min = 1))]
    pub scopes: Vec<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: "http://localhost:3000/auth".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            token_path: "./.credentials/youtube-creds.json".to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_url", &self.redirect_url)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("token_path", &self.token_path)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Upstream platform API configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ApiConfig {
    #[validate(url)]
    pub base_url: String,
    /// Bound on every upstream call; a timeout counts as an upstream failure
    #[validate(range(min = 1, max = 60))]
    pub request_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            request_timeout_seconds: 5,
        }
    }
}

/// Polling configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PollConfig {
    #[validate(range(min = 1, max = 3600))]
    pub refresh_interval_seconds: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: 15,
        }
    }
}

/// Logging output selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// "production" switches to JSON logs
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
        }
    }
}

/// Environment variables that map onto multi-word keys, which the `_`
/// separator cannot express
const ENV_OVERRIDES: [(&str, &str); 9] = [
    ("CLIENTID", "oauth.client_id"),
    ("CLIENTSECRET", "oauth.client_secret"),
    ("REDIRECTURL", "oauth.redirect_url"),
    ("PORT", "server.port"),
    ("LIVEGAUGE_OAUTH_TOKEN_PATH", "oauth.token_path"),
    ("LIVEGAUGE_OAUTH_TOKEN_URL", "oauth.token_url"),
    ("LIVEGAUGE_API_BASE_URL", "api.base_url"),
    ("LIVEGAUGE_API_REQUEST_TIMEOUT_SECONDS", "api.request_timeout_seconds"),
    ("LIVEGAUGE_POLL_REFRESH_INTERVAL_SECONDS", "poll.refresh_interval_seconds"),
];

impl Config {
    /// Load configuration from defaults, optional files and environment variables
    ///
    /// A `.env` file in the working directory is read into the environment
    /// first; variables already set take precedence over it.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::build()
    }

    /// Like [`Config::load`], reading variables from a specific dotenv file
    pub fn load_with_env_file(path: &std::path::Path) -> Result<Self> {
        dotenvy::from_path(path).map_err(|e| {
            Error::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;
        Self::build()
    }

    fn build() -> Result<Self> {
        let defaults = Config::default();
        let mut builder = ConfigBuilder::builder();

        builder = builder
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port)?
            .set_default("oauth.client_id", defaults.oauth.client_id)?
            .set_default("oauth.client_secret", defaults.oauth.client_secret)?
            .set_default("oauth.redirect_url", defaults.oauth.redirect_url)?
            .set_default("oauth.auth_url", defaults.oauth.auth_url)?
            .set_default("oauth.token_url", defaults.oauth.token_url)?
            .set_default("oauth.token_path", defaults.oauth.token_path)?
            .set_default("oauth.scopes", defaults.oauth.scopes)?
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default(
                "api.request_timeout_seconds",
                defaults.api.request_timeout_seconds,
            )?
            .set_default(
                "poll.refresh_interval_seconds",
                defaults.poll.refresh_interval_seconds,
            )?
            .set_default("telemetry.environment", defaults.telemetry.environment)?;

        // Optional livegauge.toml / livegauge.json / livegauge.yaml next to the binary
        builder = builder.add_source(File::with_name("livegauge").required(false));

        builder = builder.add_source(
            Environment::with_prefix("LIVEGAUGE")
                .try_parsing(true)
                .separator("_"),
        );

        for (var, key) in ENV_OVERRIDES {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_override(key, value)?;
            }
        }

        let config = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build config: {}", e)))?;

        let parsed: Config = config
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to deserialize config: {}", e)))?;

        parsed
            .validate()
            .map_err(|e| Error::Config(format!("Config validation failed: {}", e)))?;

        Ok(parsed)
    }
}
