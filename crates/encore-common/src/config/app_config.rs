//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub relay: RelayConfig,
    pub cors: CorsConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
    pub log_format: LogFormat,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(other.to_string()),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(other.to_string()),
        }
    }
}

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Interval announced to clients in the Hello frame
    pub heartbeat_interval_ms: u64,
    /// Idle time after which a silent connection is evicted
    pub heartbeat_timeout_ms: u64,
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
    /// Whether `chat_message` is echoed back to its sender
    pub chat_echo: bool,
    /// Bearer token required by the server-side publish endpoint
    pub publish_token: Option<String>,
}

impl RelayConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parse the bind address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.address()
            .parse()
            .map_err(|_| ConfigError::InvalidValue("RELAY_HOST", self.address()))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            outbound_buffer: default_outbound_buffer(),
            chat_echo: false,
            publish_token: None,
        }
    }
}

/// Allowed-origin policy for cross-origin connection setup
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    /// Whether a WebSocket upgrade carrying `origin` may proceed
    ///
    /// Requests without an `Origin` header come from non-browser clients and are always allowed.
    #[must_use]
    pub fn permits(&self, origin: Option<&str>, env: Environment) -> bool {
        let Some(origin) = origin else {
            return true;
        };

        if self.allowed_origins.is_empty() {
            return !env.is_production();
        }

        self.allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(origin))
    }
}

// Default value functions
fn default_app_name() -> String {
    "encore-relay".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_heartbeat_interval_ms() -> u64 {
    25_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    60_000
}

fn default_outbound_buffer() -> usize {
    256
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is present but cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env: Environment = parse_var(&lookup, "APP_ENV")?.unwrap_or_default();
        let default_format = if env.is_production() {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };

        let relay = RelayConfig {
            host: lookup("RELAY_HOST").unwrap_or_else(default_host),
            port: parse_var(&lookup, "RELAY_PORT")?.unwrap_or_else(default_port),
            heartbeat_interval_ms: parse_var(&lookup, "RELAY_HEARTBEAT_INTERVAL_MS")?
                .unwrap_or_else(default_heartbeat_interval_ms),
            heartbeat_timeout_ms: parse_var(&lookup, "RELAY_HEARTBEAT_TIMEOUT_MS")?
                .unwrap_or_else(default_heartbeat_timeout_ms),
            outbound_buffer: parse_var(&lookup, "RELAY_OUTBOUND_BUFFER")?
                .unwrap_or_else(default_outbound_buffer),
            chat_echo: parse_var(&lookup, "RELAY_CHAT_ECHO")?.unwrap_or(false),
            publish_token: lookup("RELAY_PUBLISH_TOKEN").filter(|t| !t.is_empty()),
        };

        if relay.outbound_buffer == 0 {
            return Err(ConfigError::InvalidValue("RELAY_OUTBOUND_BUFFER", "0".to_string()));
        }
        if relay.heartbeat_timeout_ms <= relay.heartbeat_interval_ms {
            return Err(ConfigError::InvalidValue(
                "RELAY_HEARTBEAT_TIMEOUT_MS",
                format!(
                    "{} (must exceed heartbeat interval {})",
                    relay.heartbeat_timeout_ms, relay.heartbeat_interval_ms
                ),
            ));
        }

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env,
                log_format: parse_var(&lookup, "LOG_FORMAT")?.unwrap_or(default_format),
            },
            relay,
            cors: CorsConfig {
                allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|o| !o.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        })
    }
}

/// Read and parse an optional variable, failing on malformed values
fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        None => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
