//! Core library for the bankbot portal client.
//!
//! This crate contains the session-aware request gateway and everything it
//! depends on:
//!
//! - `auth`: Session state, credential persistence, and the re-authentication flow
//! - `api`: The `ApiClient` gateway, transport seam, and typed portal/chat calls
//! - `router`: Route table and the navigation guard
//! - `config`: Application configuration
//! - `i18n`: Message table for notifications and prompts
//! - `notify`: Transient user-facing notifications

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod i18n;
pub mod models;
pub mod notify;
pub mod router;

pub use api::{ApiClient, GatewayError};
pub use auth::{ReauthDecision, ReauthFlow, ReauthPrompt, Session, SessionEvent};
pub use config::Config;
pub use context::ClientContext;
pub use notify::{Notification, Notifier};
pub use router::{GuardDecision, NavTarget, NavigationGuard, RouteTable};
