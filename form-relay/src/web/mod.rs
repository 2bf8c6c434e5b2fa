//! Web server module for receiving contact form submissions.
//!
//! Every path is served by the same handler, which:
//! - Accepts only POST
//! - Decodes JSON (shared secret) or form bodies (Turnstile token)
//! - Forwards to the form backend, falling back to SMTP

pub mod decode;
pub mod handlers;
pub mod turnstile;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use decode::{decode_submission, BodyKind};
pub use handlers::{submit, AppState, MAIL_SENT_BODY};
pub use turnstile::{TurnstileError, TurnstileVerifier};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .fallback(submit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
