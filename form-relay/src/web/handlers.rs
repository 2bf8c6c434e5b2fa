//! Submission endpoint handler.
//!
//! One pass per request:
//! 1. Reject anything but POST
//! 2. Decode (and verify) the body
//! 3. Forward to the backend or fall back to mail

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::Client;
use tracing::{info, warn};

use crate::relay::{Delivery, Forwarder, Mailer, Relay};
use crate::web::decode::{decode_submission, BodyKind, CONNECTING_IP_HEADER};
use crate::web::turnstile::TurnstileVerifier;
use crate::Config;

/// Largest submission body accepted, matching axum's default body limit.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Body sent after a successful mail fallback.
pub const MAIL_SENT_BODY: &str = "Sended!";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub turnstile: TurnstileVerifier,
    pub relay: Relay,
}

impl AppState {
    pub fn new(config: Config, client: Client, mailer: Arc<dyn Mailer>) -> Self {
        let turnstile = TurnstileVerifier::new(
            client.clone(),
            config.turnstile_secret.clone(),
            config.turnstile_verify_url.clone(),
        );
        let forwarder = Forwarder::new(client, config.backend_url.clone());
        let relay = Relay::new(forwarder, mailer, config.default_recipient.clone());

        Self {
            config: Arc::new(config),
            turnstile,
            relay,
        }
    }
}

/// Address of the submitting visitor: Cloudflare's header first, then the peer.
fn remote_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get(CONNECTING_IP_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// Contact form submission endpoint. Serves every path.
///
/// The method is checked before the body is read, so non-POST requests always
/// get 405 whatever their body.
pub async fn submit(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    if parts.method != Method::POST {
        info!(method = %parts.method, "submission_method_not_allowed");
        return (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response();
    }

    let headers = parts.headers;
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "submission_body_unreadable");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response();
        }
    };

    info!(
        body_kind = ?BodyKind::from_headers(&headers),
        body_length = body.len(),
        "submission_received"
    );

    let remote_ip = remote_ip(&headers, peer);
    let payload = decode_submission(&state.turnstile, &headers, remote_ip.as_deref(), &body).await;

    if payload.is_empty() {
        warn!("submission_rejected");
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }

    info!(
        field_count = payload.len(),
        forced = payload.is_forced(),
        "submission_decoded"
    );

    match state.relay.deliver(&payload, &headers).await {
        Ok(Delivery::Forwarded) => {
            (StatusCode::OK, state.config.success_message.clone()).into_response()
        }
        Ok(Delivery::Mailed) => (StatusCode::OK, MAIL_SENT_BODY).into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response(),
    }
}
