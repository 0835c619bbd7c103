use envconfig::Envconfig;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Env(#[from] envconfig::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Envconfig, Clone)]
pub struct Config {
    /// Server bind address
    #[envconfig(from = "BIND_ADDR", default = "127.0.0.1:8000")]
    pub bind_addr: SocketAddr,

    /// Base URL of the book archive
    #[envconfig(from = "BASE_URL")]
    pub base_url: String,

    /// Credential for the completion API
    #[envconfig(from = "GROQ_API_KEY")]
    pub groq_api_key: SecretString,

    /// Base URL of the OpenAI-compatible completion API
    #[envconfig(from = "GROQ_API_URL", default = "https://api.groq.com/openai/v1")]
    pub groq_api_url: String,

    /// Model used for every analysis prompt
    #[envconfig(from = "GROQ_MODEL", default = "llama3-8b-8192")]
    pub groq_model: String,

    /// Completion request timeout in seconds
    #[envconfig(from = "COMPLETION_TIMEOUT_SECS", default = "60")]
    pub completion_timeout_secs: u64,

    /// Comma-separated list of origins allowed by CORS
    #[envconfig(from = "CORS_ORIGINS", default = "http://localhost:3000")]
    pub cors_origins: String,

    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,
}

impl Config {
    /// Load and validate configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::init_from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from an explicit set of variables
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let config = Config::init_from_hashmap(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("BASE_URL", &self.base_url)?;
        validate_http_url("GROQ_API_URL", &self.groq_api_url)?;

        if self.groq_api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Invalid("GROQ_API_KEY cannot be empty".to_string()));
        }

        if self.groq_model.trim().is_empty() {
            return Err(ConfigError::Invalid("GROQ_MODEL cannot be empty".to_string()));
        }

        if self.completion_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "COMPLETION_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        for origin in self.allowed_origins() {
            validate_http_url("CORS_ORIGINS", origin)?;
        }

        Ok(())
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }

    /// Origins listed in `CORS_ORIGINS`, blanks skipped
    pub fn allowed_origins(&self) -> impl Iterator<Item = &str> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
    }
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| ConfigError::Invalid(format!("{} is not a valid URL: {}", name, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Invalid(format!(
            "{} must start with 'http://' or 'https://'",
            name
        )));
    }

    Ok(())
}
