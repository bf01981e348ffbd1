//! Payload types for the portal and chat endpoints.
//!
//! - `SchemaOption`, `SchemaDetail`: Service schemas listed on the portal
//! - `ChatLine`: One bot message in a chat flow
//! - `SignRequest`: Sign-in body

pub mod chat;
pub mod portal;

pub use chat::{ChatLine, MessageRequest, SignRequest};
pub use portal::{SchemaDetail, SchemaOption, SchemaRequest};
