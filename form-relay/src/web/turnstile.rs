//! Cloudflare Turnstile token verification.
//!
//! Reference: https://developers.cloudflare.com/turnstile/get-started/server-side-validation/

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum TurnstileError {
    #[error("turnstile request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Siteverify response body.
#[derive(Debug, Deserialize)]
pub struct SiteverifyResponse {
    pub success: bool,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

/// Verifies Turnstile tokens against the siteverify endpoint.
#[derive(Clone)]
pub struct TurnstileVerifier {
    client: Client,
    secret: String,
    endpoint: Url,
}

impl TurnstileVerifier {
    pub fn new(client: Client, secret: String, endpoint: Url) -> Self {
        Self {
            client,
            secret,
            endpoint,
        }
    }

    /// Verify a token.
    ///
    /// # Arguments
    ///
    /// * `token` - The `cf-turnstile-response` value submitted with the form
    /// * `remote_ip` - The visitor's IP address, if known
    ///
    /// # Returns
    ///
    /// `Ok(true)` only if Cloudflare reports the token as valid.
    pub async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, TurnstileError> {
        let mut params = vec![("secret", self.secret.as_str()), ("response", token)];
        if let Some(ip) = remote_ip {
            params.push(("remoteip", ip));
        }

        let outcome: SiteverifyResponse = self
            .client
            .post(self.endpoint.clone())
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if outcome.success {
            info!(has_remote_ip = remote_ip.is_some(), "turnstile_verified");
        } else {
            warn!(error_codes = ?outcome.error_codes, "turnstile_rejected");
        }

        Ok(outcome.success)
    }
}
