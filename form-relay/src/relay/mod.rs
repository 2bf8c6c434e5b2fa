//! Submission delivery.
//!
//! ## Delivery Flow
//!
//! ```text
//! DecodedPayload → forward (unless forced) → Forwarded
//!                        └─ Failure ──────→ mail fallback → Mailed
//! ```

pub mod forward;
pub mod mail;

use std::sync::Arc;

use reqwest::header::HeaderMap;
use tracing::{error, info, warn};

use crate::payload::DecodedPayload;

pub use forward::{proxy_headers, ForwardFailure, ForwardResult, Forwarder, PROXY_HEADERS};
pub use mail::{Mailer, MailError, OutboundMailMessage, SmtpMailer};

/// How a submission was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The backend accepted it.
    Forwarded,
    /// It went out through the mail fallback.
    Mailed,
}

/// Delivers submissions to the backend, falling back to mail.
#[derive(Clone)]
pub struct Relay {
    forwarder: Forwarder,
    mailer: Arc<dyn Mailer>,
    default_recipient: String,
}

impl Relay {
    pub fn new(forwarder: Forwarder, mailer: Arc<dyn Mailer>, default_recipient: String) -> Self {
        Self {
            forwarder,
            mailer,
            default_recipient,
        }
    }

    /// Deliver a non-empty payload.
    ///
    /// Only a mail failure is an error; backend failures route to the fallback.
    pub async fn deliver(
        &self,
        payload: &DecodedPayload,
        inbound: &HeaderMap,
    ) -> Result<Delivery, MailError> {
        if payload.is_forced() {
            info!("forward_skipped_forced");
        } else {
            match self.forwarder.forward(payload, inbound).await {
                ForwardResult::Success => return Ok(Delivery::Forwarded),
                ForwardResult::Failure(reason) => {
                    warn!(reason = %reason, "forward_failed_using_fallback");
                }
            }
        }

        let message = OutboundMailMessage::from_payload(payload, &self.default_recipient);

        match self.mailer.send(&message).await {
            Ok(()) => {
                info!(to = %message.to, "fallback_mail_sent");
                Ok(Delivery::Mailed)
            }
            Err(e) => {
                error!(to = %message.to, error = %e, "fallback_mail_failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mail::testing::RecordingMailer;
    use super::*;
    use reqwest::Client;
    use url::Url;
    use wiremock::matchers::any;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn relay(server: &MockServer, mailer: Arc<RecordingMailer>) -> Relay {
        let forwarder = Forwarder::new(Client::new(), Url::parse(&server.uri()).unwrap());
        Relay::new(forwarder, mailer, "owner@example.com".to_string())
    }

    fn payload(body: &str) -> DecodedPayload {
        DecodedPayload::from_json_body(body.as_bytes())
    }

    #[tokio::test]
    async fn test_deliver_forwarded() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        let mailer = Arc::new(RecordingMailer::default());

        let delivery = relay(&server, mailer.clone())
            .deliver(&payload(r#"{"key":"pmm123","name":"A"}"#), &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(delivery, Delivery::Forwarded);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_deliver_falls_back_on_backend_failure() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        let mailer = Arc::new(RecordingMailer::default());

        let delivery = relay(&server, mailer.clone())
            .deliver(
                &payload(r#"{"key":"pmm123","subject":"Hi","from":"a@x.com","name":"A","text":"hello"}"#),
                &HeaderMap::new(),
            )
            .await
            .unwrap();

        assert_eq!(delivery, Delivery::Mailed);
        assert_eq!(
            mailer.sent(),
            vec![OutboundMailMessage {
                to: "owner@example.com".to_string(),
                subject: "From website: Hi".to_string(),
                text: "Email from a@x.com by A\nhello".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_deliver_falls_back_on_unreachable_backend() {
        let mailer = Arc::new(RecordingMailer::default());
        // Nothing listens on port 1.
        let forwarder = Forwarder::new(Client::new(), Url::parse("http://127.0.0.1:1/").unwrap());
        let relay = Relay::new(forwarder, mailer.clone(), "owner@example.com".to_string());

        let delivery = relay
            .deliver(&payload(r#"{"key":"pmm123","name":"A","text":"hello"}"#), &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(delivery, Delivery::Mailed);
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "Email from  by A\nhello");
    }

    #[tokio::test]
    async fn test_deliver_forced_skips_backend() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let mailer = Arc::new(RecordingMailer::default());

        let delivery = relay(&server, mailer.clone())
            .deliver(&payload(r#"{"key":"pmm123","force":true,"name":"A"}"#), &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(delivery, Delivery::Mailed);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_deliver_mail_failure() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let mailer = Arc::new(RecordingMailer::failing());

        let result = relay(&server, mailer.clone())
            .deliver(&payload(r#"{"key":"pmm123","name":"A"}"#), &HeaderMap::new())
            .await;

        assert!(result.is_err());
        assert_eq!(mailer.sent().len(), 1);
    }
}
