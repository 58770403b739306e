//! Session management module - Gateway
//!
//! Session list, open conversation and the pre-session picker.

mod auth;
mod controller;
mod setup;
mod store;
#[cfg(test)]
pub(crate) mod testing;
mod types;

pub use auth::{AuthSession, Credential, UserRole};
pub use controller::{
    Conversation, ConversationController, ConversationState, ConversationView, SendOutcome,
    SendRejection,
};
pub use setup::SessionSetup;
pub use store::SessionStore;
pub use types::{
    Language, Message, MessageId, MessageRole, Outcome, Session, SessionDetail, SessionId,
    SessionParams, Subject,
};
