//! Forwarding submissions to the form backend.

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONTENT_TYPE,
    ORIGIN, REFERER, USER_AGENT,
};
use reqwest::Client;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::payload::DecodedPayload;

/// Inbound headers passed through to the backend.
pub static PROXY_HEADERS: [HeaderName; 6] = [
    ACCEPT,
    ACCEPT_ENCODING,
    ACCEPT_LANGUAGE,
    REFERER,
    USER_AGENT,
    ORIGIN,
];

/// Outcome of a forward attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardResult {
    Success,
    Failure(ForwardFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardFailure {
    /// The backend answered outside 200-399.
    #[error("Response status: {0}")]
    Status(u16),
    /// The request never produced a response.
    #[error("{0}")]
    Network(String),
}

/// Build the outbound header set from the allow-listed inbound headers.
pub fn proxy_headers(inbound: &HeaderMap) -> HeaderMap {
    PROXY_HEADERS
        .iter()
        .filter_map(|name| {
            inbound
                .get(name)
                .filter(|value| !value.is_empty())
                .map(|value| (name.clone(), value.clone()))
        })
        .chain(std::iter::once((
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )))
        .collect()
}

/// Posts payloads to the configured backend endpoint.
#[derive(Clone)]
pub struct Forwarder {
    client: Client,
    endpoint: Url,
}

impl Forwarder {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// POST the payload as JSON. Never errors; failures are reported in the result.
    pub async fn forward(&self, payload: &DecodedPayload, inbound: &HeaderMap) -> ForwardResult {
        let headers = proxy_headers(inbound);

        info!(
            endpoint = %self.endpoint,
            field_count = payload.len(),
            header_count = headers.len(),
            "forward_starting"
        );

        let request = self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .json(payload);

        match request.send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if (200..400).contains(&status) {
                    info!(status_code = status, "forward_complete");
                    ForwardResult::Success
                } else {
                    error!(status_code = status, "forward_bad_status");
                    ForwardResult::Failure(ForwardFailure::Status(status))
                }
            }
            Err(e) => {
                if e.is_timeout() {
                    error!(error = %e, "forward_timeout");
                } else if e.is_connect() {
                    error!(error = %e, "forward_connect_error");
                } else {
                    error!(error = %e, "forward_error");
                }
                ForwardResult::Failure(ForwardFailure::Network(e.to_string()))
            }
        }
    }
}
