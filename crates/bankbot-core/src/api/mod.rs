//! Request gateway for the portal's HTTP API.
//!
//! Every call goes through `ApiClient`, which attaches the session
//! credential before sending and classifies the `{ code, msg, data }`
//! envelope on the way back. Code 0 refreshes the credential from the
//! `Authorization` response header, code 1 succeeds without touching it,
//! and anything else fails the call with a user-visible notification.
//! Session-invalid codes additionally open the re-authentication prompt.

pub mod client;
pub mod envelope;
pub mod error;
pub mod transport;

pub use client::ApiClient;
pub use envelope::{Envelope, Outcome, SESSION_INVALID_CODES};
pub use error::GatewayError;
pub use transport::{HttpTransport, MockReply, MockTransport, OutboundCall, RawResponse, Transport};
