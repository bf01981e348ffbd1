//! Authentication state for the portal client.
//!
//! This module provides:
//! - `Session`: The process-wide credential and locale holder
//! - `TokenStore`: Durable storage the session mirrors its credential into
//! - `ReauthFlow`: The deduplicated "session expired, sign in again?" prompt
//!
//! The in-memory `Session` is the only authority on whether the user is
//! signed in. Stores are written through on every change and read once at
//! startup.

pub mod credentials;
pub mod reauth;
pub mod session;

pub use credentials::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
pub use reauth::{
    MockReauthPrompt, PromptError, PromptText, ReauthDecision, ReauthFlow, ReauthPrompt,
    SessionEvent,
};
pub use session::Session;
