//! Decoded form submission payload.
//!
//! A submission is an ordered field map. JSON bodies keep their values as-is so
//! the payload re-serializes losslessly for the backend; form bodies only ever
//! carry strings.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// Field carrying the shared secret in JSON submissions.
pub const SHARED_SECRET_FIELD: &str = "key";

/// Value the shared secret field must hold for a JSON submission to be accepted.
pub const SHARED_SECRET: &str = "pmm123";

/// Form field carrying the Turnstile token.
pub const TURNSTILE_FIELD: &str = "cf-turnstile-response";

/// Field that skips the backend and sends the submission by mail directly.
pub const FORCE_FIELD: &str = "force";

/// A decoded submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DecodedPayload(Map<String, Value>);

impl DecodedPayload {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Decode a JSON body.
    ///
    /// The body must be an object whose `key` field equals [`SHARED_SECRET`];
    /// the remaining fields become the payload. Anything else decodes empty.
    pub fn from_json_body(body: &[u8]) -> Self {
        let object = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(object)) => object,
            Ok(_) => {
                warn!("payload_json_not_object");
                return Self::default();
            }
            Err(e) => {
                warn!(error = %e, "payload_json_invalid");
                return Self::default();
            }
        };

        match object.get(SHARED_SECRET_FIELD) {
            Some(Value::String(secret)) if secret == SHARED_SECRET => {}
            Some(_) => {
                warn!("payload_shared_secret_mismatch");
                return Self::default();
            }
            None => {
                warn!("payload_shared_secret_missing");
                return Self::default();
            }
        }

        Self(
            object
                .into_iter()
                .filter(|(name, _)| name != SHARED_SECRET_FIELD)
                .collect(),
        )
    }

    /// Build a payload from decoded form fields, dropping `excluded` names.
    ///
    /// Repeated names keep their last value at the position of the first.
    pub fn from_form_fields<I>(fields: I, excluded: &[&str]) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = Map::new();
        for (name, value) in fields {
            if excluded.contains(&name.as_str()) {
                continue;
            }
            map.insert(name, Value::String(value));
        }
        Self(map)
    }

    /// Render a field as mail text. Missing and null fields render empty.
    pub fn field_text(&self, field: &str) -> String {
        match self.0.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Whether the submission asks to skip the backend.
    pub fn is_forced(&self) -> bool {
        self.0.get(FORCE_FIELD).map(is_truthy).unwrap_or(false)
    }
}

/// Parse a URL-encoded form body into its fields, in order.
pub fn parse_form(body: &[u8]) -> Option<Vec<(String, String)>> {
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(body) {
        Ok(fields) => Some(fields),
        Err(e) => {
            warn!(error = %e, "payload_form_invalid");
            None
        }
    }
}

/// JavaScript-style truthiness: `null`, `false`, `0`, NaN and `""` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
