use thiserror::Error;

/// Why a gateway call failed.
///
/// `Transport` and `Timeout` mean no envelope was reachable. `Business` and
/// `SessionExpired` carry the server's message and code. None of these are
/// retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{0}")]
    Transport(String),

    #[error("timeout of {0}ms exceeded")]
    Timeout(u64),

    #[error("{message}")]
    Business { code: i64, message: String },

    #[error("{message}")]
    SessionExpired { code: i64, message: String },

    #[error("Failed to build request: {0}")]
    Build(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl GatewayError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// A non-2xx response whose body is not an envelope.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        GatewayError::Transport(format!("Status {}: {}", status, Self::truncate_body(body)))
    }

    /// Application-level code, if the server sent an envelope.
    pub fn code(&self) -> Option<i64> {
        match self {
            GatewayError::Business { code, .. } | GatewayError::SessionExpired { code, .. } => {
                Some(*code)
            }
            _ => None,
        }
    }

    /// Text shown to the user in the notification.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// True when the server answered with an error envelope.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            GatewayError::Business { .. } | GatewayError::SessionExpired { .. }
        )
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, GatewayError::SessionExpired { .. })
    }

    /// True when no envelope was reachable.
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_) | GatewayError::Timeout(_))
    }
}
