use serde::Deserialize;
use serde_json::Value;

/// Codes meaning the server no longer honors the credential:
/// 50008 illegal token, 50012 signed in elsewhere, 50014 token expired.
pub const SESSION_INVALID_CODES: [i64; 3] = [50008, 50012, 50014];

/// Used when the server sends an error code without any message
const FALLBACK_MESSAGE: &str = "Error";

/// How the gateway treats an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Code 0: success, refresh the credential from the response header
    Success,
    /// Code 1: success, credential untouched
    Accepted,
    /// Any other code outside the session-invalid set
    BusinessError,
    /// Code in `SESSION_INVALID_CODES`
    SessionInvalid,
}

impl Outcome {
    pub fn classify(code: i64) -> Self {
        match code {
            0 => Outcome::Success,
            1 => Outcome::Accepted,
            c if SESSION_INVALID_CODES.contains(&c) => Outcome::SessionInvalid,
            _ => Outcome::BusinessError,
        }
    }
}

// Servers have used both `msg` and `message`, and not always as strings.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    code: i64,
    #[serde(default)]
    msg: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    data: Value,
}

/// `{ code, msg | message, data }` wrapper around every response body.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub code: i64,
    pub message: String,
    pub data: Value,
}

fn text_of(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl Envelope {
    /// Parse a response body. `msg` wins over `message` when both are present.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawEnvelope = serde_json::from_slice(body)?;
        let message = text_of(raw.msg).or_else(|| text_of(raw.message)).unwrap_or_default();
        Ok(Self {
            code: raw.code,
            message,
            data: raw.data,
        })
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::classify(self.code)
    }

    /// Message for the user, never empty.
    pub fn display_message(&self) -> &str {
        if self.message.is_empty() {
            FALLBACK_MESSAGE
        } else {
            &self.message
        }
    }
}
