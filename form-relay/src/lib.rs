//! Form Relay - contact form submission relay.
//!
//! Accepts contact form submissions over HTTP and delivers them to a form
//! backend, sending them by mail through an SMTP relay when the backend fails.
//!
//! ## Architecture
//!
//! ```text
//! POST → decode (shared secret / Turnstile) → forward → [fallback mail] → response
//! ```

pub mod config;
pub mod payload;
pub mod relay;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use payload::DecodedPayload;
pub use relay::{Delivery, Mailer, Relay, SmtpMailer};
pub use web::{router, AppState};
