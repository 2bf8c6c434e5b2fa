//! Request body decoding.
//!
//! Turns a raw body into a [`DecodedPayload`] based on its content type. An empty
//! payload means the submission is rejected.

use axum::http::{header::CONTENT_TYPE, HeaderMap};
use tracing::{info, warn};

use crate::payload::{parse_form, DecodedPayload, TURNSTILE_FIELD};
use crate::web::turnstile::TurnstileVerifier;

/// Header Cloudflare sets to the visitor's address.
pub const CONNECTING_IP_HEADER: &str = "cf-connecting-ip";

/// Body encodings the relay understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Form,
    Unsupported,
}

impl BodyKind {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if content_type.contains("application/json") {
            BodyKind::Json
        } else if content_type.contains("form-urlencoded") {
            BodyKind::Form
        } else {
            BodyKind::Unsupported
        }
    }
}

/// Decode a submission body.
///
/// Form bodies carrying a Turnstile token are verified first; a rejected or
/// unverifiable token yields an empty payload without looking at other fields.
pub async fn decode_submission(
    verifier: &TurnstileVerifier,
    headers: &HeaderMap,
    remote_ip: Option<&str>,
    body: &[u8],
) -> DecodedPayload {
    match BodyKind::from_headers(headers) {
        BodyKind::Json => DecodedPayload::from_json_body(body),
        BodyKind::Form => {
            let Some(fields) = parse_form(body) else {
                return DecodedPayload::default();
            };

            let token = fields
                .iter()
                .find(|(name, _)| name == TURNSTILE_FIELD)
                .map(|(_, value)| value.as_str());

            if let Some(token) = token {
                match verifier.verify(token, remote_ip).await {
                    Ok(true) => {}
                    Ok(false) => return DecodedPayload::default(),
                    Err(e) => {
                        warn!(error = %e, "turnstile_verify_failed");
                        return DecodedPayload::default();
                    }
                }
            }

            DecodedPayload::from_form_fields(fields, &[TURNSTILE_FIELD])
        }
        BodyKind::Unsupported => {
            info!("submission_unsupported_content_type");
            DecodedPayload::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn test_body_kind_from_headers() {
        assert_eq!(
            BodyKind::from_headers(&headers_with("application/json; charset=utf-8")),
            BodyKind::Json
        );
        assert_eq!(
            BodyKind::from_headers(&headers_with("application/x-www-form-urlencoded")),
            BodyKind::Form
        );
        assert_eq!(
            BodyKind::from_headers(&headers_with("multipart/form-data; boundary=x")),
            BodyKind::Unsupported
        );
        assert_eq!(
            BodyKind::from_headers(&headers_with("text/plain")),
            BodyKind::Unsupported
        );
        assert_eq!(BodyKind::from_headers(&HeaderMap::new()), BodyKind::Unsupported);
    }
}
