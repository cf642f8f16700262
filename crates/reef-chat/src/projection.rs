//! Local projection of unread counters and cached message pages.
//!
//! Both the subscription drain task and direct call responses funnel their
//! mutations through [`Projection::apply`], so the two paths can never
//! diverge. Applying the same event twice is a no-op.

use crate::event::ChatEvent;
use crate::types::Message;
use std::collections::HashMap;

/// Cached page cap; a fetch replaces the page wholesale anyway.
const PAGE_CAP: usize = 100;

/// Aggregate unread counts for the acting user.
///
/// Serializes under the reserved response keys: `conversation` is the number
/// of conversations with unread messages, `message` the total unread
/// messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UnreadTotals {
    #[serde(rename = "conversation")]
    pub conversations: u64,
    #[serde(rename = "message")]
    pub messages: u64,
}

#[derive(Default)]
struct ConversationState {
    unread: u64,
    /// Message id -> currently counted toward unread. Presence alone marks
    /// the message as applied, which is what makes double delivery a no-op.
    seen: HashMap<String, bool>,
    /// Newest-first cached page.
    page: Vec<Message>,
}

/// Per-user local state derived from events and direct responses.
pub struct Projection {
    user_id: String,
    conversations: HashMap<String, ConversationState>,
}

impl Projection {
    pub fn new(user_id: impl Into<String>) -> Self {
        Projection {
            user_id: user_id.into(),
            conversations: HashMap::new(),
        }
    }

    /// Apply one entity mutation. Idempotent and atomic per entity.
    pub fn apply(&mut self, event: &ChatEvent) {
        match event {
            ChatEvent::MessageCreated(message) => self.apply_created(message),
            ChatEvent::MessageUpdated(message) => self.apply_updated(message),
            ChatEvent::MessageDeleted(message) => self.apply_deleted(message),
            ChatEvent::ReceiptUpdated(_) => {}
            ChatEvent::ConversationUpdated(conversation) => {
                if conversation.participant_ids.contains(&self.user_id) {
                    self.conversations.entry(conversation.id.clone()).or_default();
                } else {
                    self.conversations.remove(&conversation.id);
                }
            }
            ChatEvent::ConversationDeleted(id) => {
                self.conversations.remove(id);
            }
            ChatEvent::UserConversationUpdated(view) => {
                if view.user_id == self.user_id {
                    let state = self.conversations.entry(view.conversation_id.clone()).or_default();
                    state.unread = view.unread_count;
                }
            }
        }
    }

    fn apply_created(&mut self, message: &Message) {
        let state = self
            .conversations
            .entry(message.conversation_id.clone())
            .or_default();
        if state.seen.contains_key(&message.id) {
            return;
        }
        let counted = message.author_id != self.user_id && !message.deleted;
        if counted {
            state.unread += 1;
        }
        state.seen.insert(message.id.clone(), counted);
        Self::insert_newest_first(&mut state.page, message.clone());
        tracing::debug!(
            "projection: message {} in {} (unread {})",
            message.id,
            message.conversation_id,
            state.unread
        );
    }

    fn apply_updated(&mut self, message: &Message) {
        if let Some(state) = self.conversations.get_mut(&message.conversation_id) {
            if let Some(slot) = state.page.iter_mut().find(|m| m.id == message.id) {
                *slot = message.clone();
            }
        }
    }

    fn apply_deleted(&mut self, message: &Message) {
        let state = self
            .conversations
            .entry(message.conversation_id.clone())
            .or_default();
        let was_counted = state.seen.insert(message.id.clone(), false).unwrap_or(false);
        if was_counted {
            state.unread = state.unread.saturating_sub(1);
        }
        state.page.retain(|m| m.id != message.id);
    }

    fn insert_newest_first(page: &mut Vec<Message>, message: Message) {
        if page.iter().any(|m| m.id == message.id) {
            return;
        }
        page.push(message);
        page.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        page.truncate(PAGE_CAP);
    }

    /// Replace the cached page for a conversation with a fetched one.
    /// The fetched messages are marked applied so a late channel event for
    /// one of them cannot bump the counter again.
    pub fn record_page(&mut self, conversation_id: &str, messages: &[Message]) {
        let state = self
            .conversations
            .entry(conversation_id.to_string())
            .or_default();
        for message in messages {
            state.seen.entry(message.id.clone()).or_insert(false);
        }
        state.page = messages.to_vec();
        state.page.truncate(PAGE_CAP);
    }

    /// Authoritative unread count for a conversation, from a recompute.
    pub fn set_unread(&mut self, conversation_id: &str, count: u64) {
        let state = self
            .conversations
            .entry(conversation_id.to_string())
            .or_default();
        state.unread = count;
    }

    pub fn unread_count(&self, conversation_id: &str) -> u64 {
        self.conversations
            .get(conversation_id)
            .map(|state| state.unread)
            .unwrap_or(0)
    }

    pub fn cached_messages(&self, conversation_id: &str) -> &[Message] {
        self.conversations
            .get(conversation_id)
            .map(|state| state.page.as_slice())
            .unwrap_or(&[])
    }

    pub fn totals(&self) -> UnreadTotals {
        let mut totals = UnreadTotals::default();
        for state in self.conversations.values() {
            if state.unread > 0 {
                totals.conversations += 1;
                totals.messages += state.unread;
            }
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;
    use crate::types::MetadataType;

    fn message(id: &str, conversation: &str, author: &str) -> Message {
        let mut m = Message::new(author).with_body("hi");
        m.id = id.into();
        m.conversation_id = conversation.into();
        m.metadata_type = MetadataType::Text;
        m.created_at = Some(chrono::Utc::now());
        m
    }

    #[test]
    fn test_created_bumps_unread_once() {
        let mut projection = Projection::new("alice");
        let event = ChatEvent::MessageCreated(message("m1", "c1", "bob"));
        projection.apply(&event);
        projection.apply(&event);
        assert_eq!(projection.unread_count("c1"), 1);
    }

    #[test]
    fn test_own_messages_not_counted() {
        let mut projection = Projection::new("alice");
        projection.apply(&ChatEvent::MessageCreated(message("m1", "c1", "alice")));
        assert_eq!(projection.unread_count("c1"), 0);
        assert_eq!(projection.cached_messages("c1").len(), 1);
    }

    #[test]
    fn test_delete_decrements_if_counted() {
        let mut projection = Projection::new("alice");
        let m = message("m1", "c1", "bob");
        projection.apply(&ChatEvent::MessageCreated(m.clone()));
        projection.apply(&ChatEvent::MessageDeleted(m.clone()));
        assert_eq!(projection.unread_count("c1"), 0);
        assert!(projection.cached_messages("c1").is_empty());
        // A late duplicate of the created event must not resurrect the count.
        projection.apply(&ChatEvent::MessageCreated(m));
        assert_eq!(projection.unread_count("c1"), 0);
    }

    #[test]
    fn test_user_conversation_is_authoritative() {
        let mut projection = Projection::new("alice");
        projection.apply(&ChatEvent::MessageCreated(message("m1", "c1", "bob")));
        let mut view = crate::types::UserConversation::new("alice", "c1");
        view.unread_count = 0;
        projection.apply(&ChatEvent::UserConversationUpdated(view));
        assert_eq!(projection.unread_count("c1"), 0);
    }

    #[test]
    fn test_totals() {
        let mut projection = Projection::new("alice");
        projection.set_unread("c1", 2);
        projection.set_unread("c2", 0);
        projection.set_unread("c3", 5);
        let totals = projection.totals();
        assert_eq!(totals.conversations, 2);
        assert_eq!(totals.messages, 7);
    }

    #[test]
    fn test_totals_serialize_reserved_keys() {
        let totals = UnreadTotals {
            conversations: 2,
            messages: 7,
        };
        let json = serde_json::to_value(totals).unwrap();
        assert_eq!(json[keys::CONVERSATION_UNREAD_COUNT], 2);
        assert_eq!(json[keys::MESSAGE_UNREAD_COUNT], 7);
    }

    #[test]
    fn test_page_newest_first() {
        let mut projection = Projection::new("alice");
        let mut older = message("m1", "c1", "bob");
        older.created_at = Some(chrono::Utc::now() - chrono::Duration::seconds(60));
        let newer = message("m2", "c1", "bob");
        projection.apply(&ChatEvent::MessageCreated(older));
        projection.apply(&ChatEvent::MessageCreated(newer));
        let page = projection.cached_messages("c1");
        assert_eq!(page[0].id, "m2");
        assert_eq!(page[1].id, "m1");
    }

    #[test]
    fn test_leaving_conversation_drops_state() {
        let mut projection = Projection::new("alice");
        projection.set_unread("c1", 4);
        let mut conversation = crate::types::Conversation::new("c1");
        conversation.participant_ids.insert("bob".into());
        projection.apply(&ChatEvent::ConversationUpdated(conversation));
        assert_eq!(projection.unread_count("c1"), 0);
    }
}
