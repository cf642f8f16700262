//! Chat semantics over a generic record store.
//!
//! Turns raw backend records into consistent conversations, messages,
//! membership sets, delivery/read receipts and unread counts, and keeps a
//! local projection of them current from the per-user notification channel.

pub mod client;
pub mod error;
pub mod event;
pub mod keys;
pub mod projection;
pub mod types;

pub use client::{ChatClient, ChatConfig, Session, SubscriptionHandle};
pub use error::{ChatError, Result};
pub use event::ChatEvent;
pub use projection::{Projection, UnreadTotals};
pub use types::{
    AssetData, Conversation, Message, MetadataType, Receipt, ReceiptStatus, UserChannel,
    UserConversation,
};
