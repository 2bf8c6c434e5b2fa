//! Configuration module for environment variable parsing.
//!
//! All settings are read once at startup and shared read-only afterwards.

use std::env;

use thiserror::Error;
use url::Url;

/// Default Cloudflare Turnstile verification endpoint.
pub const TURNSTILE_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// SMTP account, also used as the sender address (API_EMAIL)
    pub api_email: String,

    /// SMTP password (API_KEY)
    pub api_key: String,

    /// SMTP relay host (API_HOST)
    pub api_host: String,

    /// SMTP relay port (API_PORT)
    pub api_port: u16,

    /// Turnstile secret key (CF_TSKEY)
    pub turnstile_secret: String,

    /// Form backend endpoint (FB_HOST)
    pub backend_url: Url,

    /// Body returned when the backend accepts a submission (MSG_SUCCESS)
    pub success_message: String,

    /// Fallback mail recipient when the payload carries no `to` (DST_EMAIL)
    pub default_recipient: String,

    /// Turnstile verification endpoint
    pub turnstile_verify_url: Url,

    /// Port for the web server to listen on
    pub port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_email", &self.api_email)
            .field("api_host", &self.api_host)
            .field("api_port", &self.api_port)
            .field("backend_url", &self.backend_url.as_str())
            .field("default_recipient", &self.default_recipient)
            .field("turnstile_verify_url", &self.turnstile_verify_url.as_str())
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        Ok(Config {
            api_email: required("API_EMAIL")?,
            api_key: required("API_KEY")?,
            api_host: required("API_HOST")?,
            api_port: parse_port("API_PORT", &required("API_PORT")?)?,
            turnstile_secret: required("CF_TSKEY")?,
            backend_url: parse_url("FB_HOST", &required("FB_HOST")?)?,
            success_message: required("MSG_SUCCESS")?,
            default_recipient: required("DST_EMAIL")?,

            turnstile_verify_url: parse_url(
                "TURNSTILE_VERIFY_URL",
                &lookup("TURNSTILE_VERIFY_URL").unwrap_or_else(|| TURNSTILE_VERIFY_URL.to_string()),
            )?,

            port: match lookup("PORT") {
                Some(raw) => parse_port("PORT", &raw)?,
                None => 8080,
            },
        })
    }
}

fn parse_port(name: &'static str, raw: &str) -> Result<u16, ConfigError> {
    raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}
