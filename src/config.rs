// Configuration management

use crate::core::errors::AccessError;
use crate::hardware::{LinkAddress, LinkSettings};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
///
/// Without `DATABASE_URL` the service runs on the in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub bind_address: String,
    pub port: u16,

    // Database configuration (optional)
    pub database_url: Option<String>,

    // Lock controller configuration
    pub controller_host: String,
    pub controller_port: u16,
    pub controller_timeout_ms: u64,
    pub simulated_unlock_delay_ms: u64,
    pub simulated_lock_delay_ms: u64,
    pub relock_delay_ms: u64,

    // Middleware configuration
    pub request_timeout_secs: u64,
    pub body_size_limit_bytes: usize,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_env() -> Result<Self, AccessError> {
        // Skip in test environment to avoid interfering with test environment variables
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok();
        }

        let config = Self {
            bind_address: Self::get_env_or_default("BIND_ADDRESS", "0.0.0.0"),
            port: Self::parse_port("PORT", 8000)?,
            database_url: Self::get_optional_env("DATABASE_URL"),
            controller_host: Self::get_env_or_default("LOCK_CONTROLLER_HOST", "192.168.1.100"),
            controller_port: Self::parse_port("LOCK_CONTROLLER_PORT", 80)?,
            controller_timeout_ms: Self::parse_u64_or_default("LOCK_CONTROLLER_TIMEOUT_MS", 5000)?,
            simulated_unlock_delay_ms: Self::parse_u64_or_default("SIMULATED_UNLOCK_DELAY_MS", 1000)?,
            simulated_lock_delay_ms: Self::parse_u64_or_default("SIMULATED_LOCK_DELAY_MS", 500)?,
            relock_delay_ms: Self::parse_u64_or_default("RELOCK_DELAY_MS", 3000)?,
            request_timeout_secs: Self::parse_u64_or_default("REQUEST_TIMEOUT_SECS", 30)?,
            body_size_limit_bytes: Self::parse_usize_or_default("BODY_SIZE_LIMIT_BYTES", 1024 * 1024)?,
            log_level: Self::get_env_or_default("LOG_LEVEL", "info"),
            log_format: Self::get_env_or_default("LOG_FORMAT", "json"),
        };

        config.validate()?;

        Ok(config)
    }

    /// Lock controller address from host and port
    pub fn controller_address(&self) -> LinkAddress {
        LinkAddress::new(self.controller_host.clone(), self.controller_port)
    }

    /// Timing for the lock controller link
    pub fn link_settings(&self) -> LinkSettings {
        let request_timeout = Duration::from_millis(self.controller_timeout_ms);
        LinkSettings {
            request_timeout,
            // Connection setup never gets more than the whole request budget
            connect_timeout: request_timeout.min(Duration::from_millis(2000)),
            simulated_unlock_delay: Duration::from_millis(self.simulated_unlock_delay_ms),
            simulated_lock_delay: Duration::from_millis(self.simulated_lock_delay_ms),
        }
    }

    pub fn relock_delay(&self) -> Duration {
        Duration::from_millis(self.relock_delay_ms)
    }

    fn get_env_or_default(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    fn get_optional_env(key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    fn parse_port(key: &str, default: u16) -> Result<u16, AccessError> {
        let Ok(value) = env::var(key) else {
            return Ok(default);
        };
        let port = value.parse::<u16>().map_err(|e| {
            AccessError::ConfigurationError(format!("Invalid {} value '{}': {}", key, value, e))
        })?;

        if port == 0 {
            return Err(AccessError::ConfigurationError(format!(
                "{} must be between 1 and 65535",
                key
            )));
        }

        Ok(port)
    }

    /// Parse u64 from environment variable or return default
    fn parse_u64_or_default(key: &str, default: u64) -> Result<u64, AccessError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<u64>().map_err(|e| {
                    AccessError::ConfigurationError(format!("Invalid {} value '{}': {}", key, value, e))
                })?;

                if parsed == 0 {
                    return Err(AccessError::ConfigurationError(format!(
                        "{} must be greater than 0",
                        key
                    )));
                }

                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    fn parse_usize_or_default(key: &str, default: usize) -> Result<usize, AccessError> {
        let parsed = Self::parse_u64_or_default(key, default as u64)?;
        usize::try_from(parsed).map_err(|e| {
            AccessError::ConfigurationError(format!("Invalid {} value '{}': {}", key, parsed, e))
        })
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), AccessError> {
        if let Some(ref url) = self.database_url {
            Self::validate_url(url, "Database URL")?;
        }

        LinkAddress::parse(&self.controller_address().base_url()).map_err(|e| {
            AccessError::ConfigurationError(format!("Invalid LOCK_CONTROLLER_HOST: {}", e))
        })?;

        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    fn validate_url(url: &str, description: &str) -> Result<(), AccessError> {
        url::Url::parse(url).map_err(|e| {
            AccessError::ConfigurationError(format!("Invalid {} '{}': {}", description, url, e))
        })?;
        Ok(())
    }

    fn validate_log_level(level: &str) -> Result<(), AccessError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(AccessError::ConfigurationError(format!(
                "Invalid LOG_LEVEL '{}': must be one of {}",
                level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    fn validate_log_format(format: &str) -> Result<(), AccessError> {
        if format != "json" && format != "text" {
            return Err(AccessError::ConfigurationError(format!(
                "Invalid LOG_FORMAT '{}': must be 'json' or 'text'",
                format
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Create a test configuration
    ///
    /// Bypasses environment loading. Timings are shortened so tests do not
    /// wait on real-world delays.
    pub fn test_config() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8000,
            database_url: None,
            controller_host: "127.0.0.1".to_string(),
            controller_port: 1,
            controller_timeout_ms: 500,
            simulated_unlock_delay_ms: 10,
            simulated_lock_delay_ms: 5,
            relock_delay_ms: 50,
            request_timeout_secs: 30,
            body_size_limit_bytes: 1024 * 1024,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}
