//! Application configuration module
//! Handles environment variable loading, configuration validation, and application settings

use std::env;

use crate::payments::providers::paystack::PaystackConfig;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub settlement: SettlementConfig,
    pub paystack: PaystackConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Run with in-memory stores and no database connection
    pub skip_externals: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,   // seconds
    pub idle_timeout: Option<u64>, // seconds
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

/// Session verification against the external auth service
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout: u64, // seconds
}

/// Settlement behaviour
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    pub currency: String,
    /// Sandbox only: accept webhooks that carry no signature header
    pub allow_unsigned_webhooks: bool,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            currency: "NGN".to_string(),
            allow_unsigned_webhooks: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        let server = ServerConfig::from_env()?;
        let database = if server.skip_externals {
            DatabaseConfig::from_env().unwrap_or_else(|_| DatabaseConfig::unused())
        } else {
            DatabaseConfig::from_env()?
        };

        Ok(AppConfig {
            server,
            database,
            logging: LoggingConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            settlement: SettlementConfig::from_env()?,
            paystack: PaystackConfig::from_env()
                .map_err(|e| ConfigError::MissingVariable(e.to_string()))?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        if !self.server.skip_externals {
            self.database.validate()?;
        }
        self.logging.validate()?;
        self.auth.validate()?;
        self.settlement.validate()?;

        if self.paystack.secret_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue("PAYSTACK_SECRET_KEY".to_string()));
        }

        Ok(())
    }
}

fn env_flag(name: &str) -> Result<bool, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| "false".to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
            skip_externals: env_flag("SKIP_EXTERNALS")?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MIN_CONNECTIONS".to_string()))?,
            connection_timeout: env::var("DB_CONNECTION_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_CONNECTION_TIMEOUT".to_string()))?,
            idle_timeout: env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|val| val.parse().ok()),
        })
    }

    fn unused() -> Self {
        DatabaseConfig {
            url: String::new(),
            max_connections: 1,
            min_connections: 0,
            connection_timeout: 30,
            idle_timeout: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("DATABASE_URL".to_string()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(
                "DB_MIN_CONNECTIONS must be <= DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(AuthConfig {
            base_url: env::var("AUTH_BASE_URL")
                .map_err(|_| ConfigError::MissingVariable("AUTH_BASE_URL".to_string()))?,
            api_key: env::var("AUTH_API_KEY").unwrap_or_default(),
            request_timeout: env::var("AUTH_REQUEST_TIMEOUT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("AUTH_REQUEST_TIMEOUT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "AUTH_BASE_URL must be a valid URL".to_string(),
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::InvalidValue("AUTH_REQUEST_TIMEOUT".to_string()));
        }

        Ok(())
    }
}

impl SettlementConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(SettlementConfig {
            currency: env::var("PAYSTACK_CURRENCY").unwrap_or_else(|_| "NGN".to_string()),
            allow_unsigned_webhooks: env_flag("PAYSTACK_ALLOW_UNSIGNED_WEBHOOKS")?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::InvalidValue(
                "PAYSTACK_CURRENCY must be a 3-letter ISO code".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}
