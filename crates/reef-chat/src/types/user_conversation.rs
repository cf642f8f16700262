//! Per-user view of a conversation.

use crate::error::{ChatError, Result};
use crate::keys::{fields, record_types};
use crate::types::{parse_time, required_str};
use chrono::{DateTime, Utc};
use reef_store::timestamp_str;

/// Pairs a user with a conversation and carries that user's read position.
///
/// Created implicitly when the user becomes a participant, destroyed when
/// they are removed or the conversation is deleted.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct UserConversation {
    pub user_id: String,
    pub conversation_id: String,
    pub last_read_message_id: Option<String>,
    /// Timestamp of the last-read message; messages strictly newer count as
    /// unread.
    pub last_read_at: Option<DateTime<Utc>>,
    pub unread_count: u64,
    pub revision: u64,
}

impl UserConversation {
    pub fn new(user_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        UserConversation {
            user_id: user_id.into(),
            conversation_id: conversation_id.into(),
            last_read_message_id: None,
            last_read_at: None,
            unread_count: 0,
            revision: 0,
        }
    }

    pub fn record_key(user_id: &str, conversation_id: &str) -> String {
        format!("{user_id}:{conversation_id}")
    }

    pub fn to_record(&self) -> reef_store::Record {
        let mut record = reef_store::Record::new(
            record_types::USER_CONVERSATION,
            Self::record_key(&self.user_id, &self.conversation_id),
        )
        .with_owner(&self.user_id);
        record.revision = self.revision;
        record.set(fields::USER_ID, self.user_id.as_str());
        record.set(fields::CONVERSATION_ID, self.conversation_id.as_str());
        record.set(fields::UNREAD_COUNT, self.unread_count);
        if let Some(id) = &self.last_read_message_id {
            record.set(fields::LAST_READ_MESSAGE_ID, id.as_str());
        }
        if let Some(at) = self.last_read_at {
            record.set(fields::LAST_READ_AT, timestamp_str(at));
        }
        record
    }

    pub fn from_record(record: &reef_store::Record) -> Result<Self> {
        if record.id.record_type != record_types::USER_CONVERSATION {
            return Err(ChatError::Decode(format!(
                "{} is not a user_conversation record",
                record.id
            )));
        }
        Ok(UserConversation {
            user_id: required_str(record, fields::USER_ID)?,
            conversation_id: required_str(record, fields::CONVERSATION_ID)?,
            last_read_message_id: record
                .get_str(fields::LAST_READ_MESSAGE_ID)
                .map(str::to_string),
            last_read_at: record
                .get_str(fields::LAST_READ_AT)
                .map(parse_time)
                .transpose()?,
            unread_count: record.get_u64(fields::UNREAD_COUNT).unwrap_or(0),
            revision: record.revision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key() {
        assert_eq!(UserConversation::record_key("alice", "c1"), "alice:c1");
    }

    #[test]
    fn test_record_round_trip() {
        let mut view = UserConversation::new("alice", "c1");
        view.last_read_message_id = Some("m7".into());
        view.last_read_at = Some(Utc::now());
        view.unread_count = 3;

        let back = UserConversation::from_record(&view.to_record()).unwrap();
        assert_eq!(back.user_id, "alice");
        assert_eq!(back.conversation_id, "c1");
        assert_eq!(back.last_read_message_id.as_deref(), Some("m7"));
        assert!(back.last_read_at.is_some());
        assert_eq!(back.unread_count, 3);
    }
}
