use crate::core::resilience::ResilienceSpec;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::str::FromStr;

/// Per-exchange client configuration: credentials, endpoints, transport
/// settings and the resilience switches for this client instance.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
    pub testnet: bool,
    pub exchange_name: String,
    pub ssl_uri: Option<String>,
    pub plain_text_uri: Option<String>,
    /// Connect timeout in milliseconds; 0 keeps the transport default
    pub http_conn_timeout_ms: u64,
    /// Read timeout in milliseconds; 0 keeps the transport default
    pub http_read_timeout_ms: u64,
    pub proxy_host: Option<String>,
    pub proxy_port: Option<u16>,
    pub resilience: ResilienceSpec,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for ExchangeConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ExchangeConfig", 11)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field("testnet", &self.testnet)?;
        state.serialize_field("exchange_name", &self.exchange_name)?;
        state.serialize_field("ssl_uri", &self.ssl_uri)?;
        state.serialize_field("plain_text_uri", &self.plain_text_uri)?;
        state.serialize_field("http_conn_timeout_ms", &self.http_conn_timeout_ms)?;
        state.serialize_field("http_read_timeout_ms", &self.http_read_timeout_ms)?;
        state.serialize_field("proxy_host", &self.proxy_host)?;
        state.serialize_field("proxy_port", &self.proxy_port)?;
        state.serialize_field("resilience", &self.resilience)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ExchangeConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ExchangeConfigHelper {
            api_key: String,
            secret_key: String,
            #[serde(default)]
            testnet: bool,
            #[serde(default)]
            exchange_name: String,
            ssl_uri: Option<String>,
            plain_text_uri: Option<String>,
            #[serde(default)]
            http_conn_timeout_ms: u64,
            #[serde(default)]
            http_read_timeout_ms: u64,
            proxy_host: Option<String>,
            proxy_port: Option<u16>,
            #[serde(default)]
            resilience: ResilienceSpec,
        }

        let helper = ExchangeConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            api_key: Secret::new(helper.api_key),
            secret_key: Secret::new(helper.secret_key),
            testnet: helper.testnet,
            exchange_name: helper.exchange_name,
            ssl_uri: helper.ssl_uri,
            plain_text_uri: helper.plain_text_uri,
            http_conn_timeout_ms: helper.http_conn_timeout_ms,
            http_read_timeout_ms: helper.http_read_timeout_ms,
            proxy_host: helper.proxy_host,
            proxy_port: helper.proxy_port,
            resilience: helper.resilience,
        })
    }
}

impl ExchangeConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            testnet: false,
            exchange_name: String::new(),
            ssl_uri: None,
            plain_text_uri: None,
            http_conn_timeout_ms: 0,
            http_read_timeout_ms: 0,
            proxy_host: None,
            proxy_port: None,
            resilience: ResilienceSpec::default(),
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{EXCHANGE}_API_KEY` (e.g., `BINANCE_API_KEY`)
    /// - `{EXCHANGE}_SECRET_KEY` (e.g., `BINANCE_SECRET_KEY`)
    /// - `{EXCHANGE}_TESTNET` (optional, defaults to false)
    /// - `{EXCHANGE}_BASE_URL` (optional, becomes the SSL URI)
    /// - `{EXCHANGE}_CONNECT_TIMEOUT_MS`, `{EXCHANGE}_READ_TIMEOUT_MS` (optional)
    /// - `{EXCHANGE}_PROXY_HOST`, `{EXCHANGE}_PROXY_PORT` (optional)
    /// - `{EXCHANGE}_RETRY_ENABLED`, `{EXCHANGE}_RATE_LIMITER_ENABLED` (optional, default true)
    pub fn from_env(exchange_prefix: &str) -> Result<Self, ConfigError> {
        let prefix = exchange_prefix.to_uppercase();
        let var = |suffix: &str| format!("{}_{}", prefix, suffix);

        let api_key_var = var("API_KEY");
        let secret_key_var = var("SECRET_KEY");

        let api_key = env::var(&api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var))?;

        let secret_key = env::var(&secret_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(secret_key_var))?;

        let testnet = optional_env(&var("TESTNET"))?.unwrap_or(false);
        let resilience = ResilienceSpec {
            retry_enabled: optional_env(&var("RETRY_ENABLED"))?.unwrap_or(true),
            rate_limiter_enabled: optional_env(&var("RATE_LIMITER_ENABLED"))?.unwrap_or(true),
        };

        Ok(Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            testnet,
            exchange_name: exchange_prefix.to_lowercase(),
            ssl_uri: env::var(var("BASE_URL")).ok(),
            plain_text_uri: None,
            http_conn_timeout_ms: optional_env(&var("CONNECT_TIMEOUT_MS"))?.unwrap_or(0),
            http_read_timeout_ms: optional_env(&var("READ_TIMEOUT_MS"))?.unwrap_or(0),
            proxy_host: env::var(var("PROXY_HOST")).ok(),
            proxy_port: optional_env(&var("PROXY_PORT"))?,
            resilience,
        })
    }

    /// Create configuration from .env file and environment variables
    ///
    /// This method first loads environment variables from a .env file (if it exists),
    /// then reads the configuration using the standard environment variable names.
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(exchange_prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(exchange_prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(
        exchange_prefix: &str,
        env_file_path: &str,
    ) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // .env file doesn't exist, that's okay - continue with system env vars
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(exchange_prefix)
    }

    /// Create configuration for read-only operations (market data only)
    /// This doesn't require API credentials for public endpoints
    #[must_use]
    pub fn read_only() -> Self {
        Self::new(String::new(), String::new())
    }

    /// Check if this configuration has valid credentials for authenticated operations
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.secret_key.expose_secret().is_empty()
    }

    #[must_use]
    pub const fn testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    #[must_use]
    pub fn exchange_name(mut self, name: impl Into<String>) -> Self {
        self.exchange_name = name.into();
        self
    }

    /// Set custom base URL (used as the SSL URI)
    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.ssl_uri = Some(base_url);
        self
    }

    #[must_use]
    pub fn plain_text_uri(mut self, uri: String) -> Self {
        self.plain_text_uri = Some(uri);
        self
    }

    #[must_use]
    pub const fn connect_timeout_ms(mut self, millis: u64) -> Self {
        self.http_conn_timeout_ms = millis;
        self
    }

    #[must_use]
    pub const fn read_timeout_ms(mut self, millis: u64) -> Self {
        self.http_read_timeout_ms = millis;
        self
    }

    #[must_use]
    pub fn proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy_host = Some(host.into());
        self.proxy_port = Some(port);
        self
    }

    #[must_use]
    pub const fn resilience(mut self, resilience: ResilienceSpec) -> Self {
        self.resilience = resilience;
        self
    }

    /// SSL URI when set, otherwise the plain-text URI.
    pub fn preferred_uri(&self) -> Option<&str> {
        self.ssl_uri
            .as_deref()
            .or(self.plain_text_uri.as_deref())
            .filter(|uri| !uri.is_empty())
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

fn optional_env<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            ConfigError::InvalidConfiguration(format!("{} has an invalid value: {}", name, raw))
        }),
        Err(_) => Ok(None),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
