//! Chat entities and their record encodings.

mod channel;
mod conversation;
mod message;
mod receipt;
mod user_conversation;

pub use channel::UserChannel;
pub use conversation::Conversation;
pub use message::{AssetData, Message, MetadataType};
pub use receipt::{Receipt, ReceiptStatus};
pub use user_conversation::UserConversation;

use crate::error::ChatError;
use chrono::{DateTime, Utc};
use reef_store::Record;

pub(crate) fn parse_time(value: &str) -> Result<DateTime<Utc>, ChatError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ChatError::Decode(format!("bad timestamp {value:?}: {e}")))
}

pub(crate) fn required_str(record: &Record, key: &str) -> Result<String, ChatError> {
    record
        .get_str(key)
        .map(str::to_string)
        .ok_or_else(|| ChatError::Decode(format!("{}: missing field {key:?}", record.id)))
}
