//! Participant and admin set mutation.
//!
//! All four operations compute the new set against the caller's snapshot
//! and persist the whole conversation with a single save; a stale snapshot
//! surfaces as a conflict for the caller to retry with a fresh fetch.

use crate::client::ChatClient;
use crate::error::{ChatError, Result};
use crate::event::ChatEvent;
use crate::types::{Conversation, UserConversation};
use reef_store::{NotificationTransport, RecordId, RecordStore};
use std::collections::BTreeSet;

impl<S, T> ChatClient<S, T>
where
    S: RecordStore,
    T: NotificationTransport,
{
    /// Add participants. Already-present ids are no-ops; when nothing
    /// changes the conversation is returned unsaved.
    pub async fn add_participants(
        &self,
        user_ids: &[String],
        conversation: &Conversation,
    ) -> Result<Conversation> {
        let ids = Self::normalize_ids(user_ids)?;
        let union: BTreeSet<String> = conversation
            .participant_ids
            .union(&ids)
            .cloned()
            .collect();
        if union == conversation.participant_ids {
            return Ok(conversation.clone());
        }
        let added: Vec<String> = ids
            .difference(&conversation.participant_ids)
            .cloned()
            .collect();

        let mut updated = conversation.clone();
        updated.participant_ids = union;
        let updated = self.persist_membership(updated).await?;

        for user in &added {
            let view = UserConversation::new(user, &updated.id);
            self.store.save(view.to_record()).await?;
        }
        Ok(updated)
    }

    /// Remove participants. Absent ids are no-ops; removing the last
    /// participant is rejected.
    pub async fn remove_participants(
        &self,
        user_ids: &[String],
        conversation: &Conversation,
    ) -> Result<Conversation> {
        let ids = Self::normalize_ids(user_ids)?;
        let remaining: BTreeSet<String> = conversation
            .participant_ids
            .difference(&ids)
            .cloned()
            .collect();
        if remaining == conversation.participant_ids {
            return Ok(conversation.clone());
        }
        if remaining.is_empty() {
            return Err(ChatError::InvariantViolation(
                "a conversation must keep at least one participant".into(),
            ));
        }
        let removed: Vec<String> = conversation
            .participant_ids
            .intersection(&ids)
            .cloned()
            .collect();

        let mut updated = conversation.clone();
        updated.participant_ids = remaining;
        let updated = self.persist_membership(updated).await?;

        for user in &removed {
            let key = UserConversation::record_key(user, &updated.id);
            self.store
                .delete(&RecordId::new(
                    crate::keys::record_types::USER_CONVERSATION,
                    key,
                ))
                .await?;
        }
        Ok(updated)
    }

    /// Add admins. Admins need not be participants.
    pub async fn add_admins(
        &self,
        user_ids: &[String],
        conversation: &Conversation,
    ) -> Result<Conversation> {
        let ids = Self::normalize_ids(user_ids)?;
        let union: BTreeSet<String> = conversation.admin_ids.union(&ids).cloned().collect();
        if union == conversation.admin_ids {
            return Ok(conversation.clone());
        }
        let mut updated = conversation.clone();
        updated.admin_ids = union;
        self.persist_membership(updated).await
    }

    /// Remove admins. The admin set may become empty.
    pub async fn remove_admins(
        &self,
        user_ids: &[String],
        conversation: &Conversation,
    ) -> Result<Conversation> {
        let ids = Self::normalize_ids(user_ids)?;
        let remaining: BTreeSet<String> =
            conversation.admin_ids.difference(&ids).cloned().collect();
        if remaining == conversation.admin_ids {
            return Ok(conversation.clone());
        }
        let mut updated = conversation.clone();
        updated.admin_ids = remaining;
        self.persist_membership(updated).await
    }

    async fn persist_membership(&self, conversation: Conversation) -> Result<Conversation> {
        let saved = self.store.save(conversation.to_record()).await?;
        let conversation = Conversation::from_record(&saved)?;
        self.apply_local(&ChatEvent::ConversationUpdated(conversation.clone()))
            .await;
        tracing::debug!(
            "membership of {} now {} participants / {} admins",
            conversation.id,
            conversation.participant_ids.len(),
            conversation.admin_ids.len()
        );
        Ok(conversation)
    }
}
