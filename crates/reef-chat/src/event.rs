//! Decoding of channel payloads into entity mutations.

use crate::keys::record_types;
use crate::types::{Conversation, Message, Receipt, UserConversation};
use serde_json::Value;

/// An entity mutation observed on the notification channel.
#[derive(Clone, Debug)]
pub enum ChatEvent {
    ConversationUpdated(Conversation),
    ConversationDeleted(String),
    MessageCreated(Message),
    MessageUpdated(Message),
    MessageDeleted(Message),
    ReceiptUpdated(Receipt),
    UserConversationUpdated(UserConversation),
}

impl ChatEvent {
    /// Decode an opaque channel payload.
    ///
    /// Payloads carry a `record_type` tag, a mutation kind under `event`,
    /// and the full record under `record`. Anything that does not decode is
    /// dropped with a debug log; a malformed event must not poison the
    /// stream.
    pub fn decode(payload: &Value) -> Option<ChatEvent> {
        let record_type = payload.get("record_type")?.as_str()?;
        let kind = payload.get("event")?.as_str()?;
        let record: reef_store::Record = match serde_json::from_value(payload.get("record")?.clone())
        {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("dropping undecodable {record_type} event: {e}");
                return None;
            }
        };

        let decoded = match record_type {
            record_types::CONVERSATION => match kind {
                "deleted" => Ok(ChatEvent::ConversationDeleted(record.id.key.clone())),
                _ => Conversation::from_record(&record).map(ChatEvent::ConversationUpdated),
            },
            record_types::MESSAGE => Message::from_record(&record).map(|message| match kind {
                "created" => ChatEvent::MessageCreated(message),
                "deleted" => ChatEvent::MessageDeleted(message),
                _ if message.deleted => ChatEvent::MessageDeleted(message),
                _ => ChatEvent::MessageUpdated(message),
            }),
            record_types::RECEIPT => Receipt::from_record(&record).map(ChatEvent::ReceiptUpdated),
            record_types::USER_CONVERSATION => {
                UserConversation::from_record(&record).map(ChatEvent::UserConversationUpdated)
            }
            other => {
                tracing::debug!("ignoring event for record type {other:?}");
                return None;
            }
        };

        match decoded {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!("dropping undecodable {record_type} event: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(event: &str, record: reef_store::Record) -> Value {
        serde_json::json!({
            "record_type": record.id.record_type,
            "event": event,
            "record": record,
        })
    }

    fn message_record() -> reef_store::Record {
        let mut message = Message::new("alice").with_body("hi");
        message.conversation_id = "c1".into();
        message.to_record()
    }

    #[test]
    fn test_decode_message_created() {
        let event = ChatEvent::decode(&payload("created", message_record())).unwrap();
        assert!(matches!(event, ChatEvent::MessageCreated(_)));
    }

    #[test]
    fn test_soft_delete_update_decodes_as_deleted() {
        let mut record = message_record();
        record.set("deleted", true);
        let event = ChatEvent::decode(&payload("updated", record)).unwrap();
        assert!(matches!(event, ChatEvent::MessageDeleted(_)));
    }

    #[test]
    fn test_decode_conversation_deleted() {
        let mut conversation = Conversation::new("c9");
        conversation.participant_ids.insert("alice".into());
        let event = ChatEvent::decode(&payload("deleted", conversation.to_record())).unwrap();
        match event {
            ChatEvent::ConversationDeleted(id) => assert_eq!(id, "c9"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_record_type_skipped() {
        let record = reef_store::Record::new("presence", "p1");
        assert!(ChatEvent::decode(&payload("created", record)).is_none());
    }

    #[test]
    fn test_malformed_payload_skipped() {
        assert!(ChatEvent::decode(&serde_json::json!({"event": "ping"})).is_none());
        // A message record with no required fields decodes to None, not a panic.
        let record = reef_store::Record::new(record_types::MESSAGE, "m1");
        assert!(ChatEvent::decode(&payload("created", record)).is_none());
    }
}
