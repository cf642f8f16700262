//! Conversation creation, distinct resolution and CRUD.

use crate::client::ChatClient;
use crate::error::{ChatError, Result};
use crate::event::ChatEvent;
use crate::keys::{self, fields, record_types};
use crate::types::{Conversation, UserConversation};
use reef_store::{Filter, NotificationTransport, Query, RecordId, RecordStore};
use serde_json::Map;
use std::collections::BTreeSet;

impl<S, T> ChatClient<S, T>
where
    S: RecordStore,
    T: NotificationTransport,
{
    /// Create a conversation with the given participants. Admins default to
    /// the participants and the conversation is not distinct by
    /// participants.
    pub async fn create_conversation(
        &self,
        participant_ids: &[String],
        title: Option<&str>,
        metadata: Option<Map<String, serde_json::Value>>,
    ) -> Result<Conversation> {
        self.create_conversation_with(participant_ids, title, metadata, None, false)
            .await
    }

    /// Create a conversation, or reuse an existing one when `distinct` is
    /// set and a conversation with exactly this participant set already
    /// exists.
    ///
    /// The acting user is always added to both the participant and admin
    /// sets. A reused conversation is returned unchanged; none of the other
    /// arguments overwrite it.
    pub async fn create_conversation_with(
        &self,
        participant_ids: &[String],
        title: Option<&str>,
        metadata: Option<Map<String, serde_json::Value>>,
        admin_ids: Option<&[String]>,
        distinct: bool,
    ) -> Result<Conversation> {
        let mut participants = Self::normalize_ids(participant_ids)?;
        if participants.is_empty() {
            return Err(ChatError::Validation("participant set is empty".into()));
        }
        participants.insert(self.user_id().to_string());

        let admins: BTreeSet<String> = match admin_ids {
            Some(ids) => {
                let mut set = Self::normalize_ids(ids)?;
                set.insert(self.user_id().to_string());
                set
            }
            None => participants.clone(),
        };

        if distinct {
            if let Some(existing) = self.find_distinct(&participants).await? {
                tracing::debug!("reusing distinct conversation {}", existing.id);
                return Ok(existing);
            }
        }

        let mut conversation = Conversation::new(uuid::Uuid::new_v4().to_string());
        conversation.participant_ids = participants;
        conversation.admin_ids = admins;
        conversation.title = title.map(str::to_string);
        conversation.metadata = metadata.unwrap_or_default();
        conversation.distinct_by_participants = distinct;

        let saved = self
            .store
            .save(conversation.to_record().with_owner(self.user_id()))
            .await?;
        let conversation = Conversation::from_record(&saved)?;

        for participant in &conversation.participant_ids {
            let view = UserConversation::new(participant, &conversation.id);
            self.store.save(view.to_record()).await?;
        }

        self.apply_local(&ChatEvent::ConversationUpdated(conversation.clone()))
            .await;
        tracing::info!(
            "created conversation {} with {} participants",
            conversation.id,
            conversation.participant_ids.len()
        );
        Ok(conversation)
    }

    /// Create (or reuse) the distinct 1:1 conversation with one other user.
    pub async fn create_direct_conversation(
        &self,
        user_id: &str,
        title: Option<&str>,
        metadata: Option<Map<String, serde_json::Value>>,
    ) -> Result<Conversation> {
        self.create_conversation_with(&[user_id.to_string()], title, metadata, None, true)
            .await
    }

    /// Save a conversation snapshot as-is. Never re-runs distinct
    /// resolution; use the create operations for that.
    pub async fn save_conversation(&self, conversation: &Conversation) -> Result<Conversation> {
        if conversation.participant_ids.is_empty() {
            return Err(ChatError::Validation(
                "conversation participant set is empty".into(),
            ));
        }
        let saved = self.store.save(conversation.to_record()).await?;
        let conversation = Conversation::from_record(&saved)?;
        self.apply_local(&ChatEvent::ConversationUpdated(conversation.clone()))
            .await;
        Ok(conversation)
    }

    pub async fn fetch_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        let id = RecordId::new(record_types::CONVERSATION, conversation_id);
        match self.store.fetch(&id).await? {
            Some(record) => Conversation::from_record(&record),
            None => Err(ChatError::NotFound(format!(
                "conversation {conversation_id}"
            ))),
        }
    }

    pub async fn delete_conversation(&self, conversation: &Conversation) -> Result<Conversation> {
        self.delete_conversation_by_id(&conversation.id).await
    }

    /// Delete a conversation and every per-user view of it.
    pub async fn delete_conversation_by_id(&self, conversation_id: &str) -> Result<Conversation> {
        let conversation = self.fetch_conversation(conversation_id).await?;

        let views = self
            .store
            .query(
                Query::new(record_types::USER_CONVERSATION)
                    .filter(Filter::eq(fields::CONVERSATION_ID, conversation_id)),
            )
            .await?;
        for view in &views {
            self.store.delete(&view.id).await?;
        }
        self.store
            .delete(&RecordId::new(record_types::CONVERSATION, conversation_id))
            .await?;

        self.apply_local(&ChatEvent::ConversationDeleted(conversation_id.to_string()))
            .await;
        tracing::info!("deleted conversation {conversation_id}");
        Ok(conversation)
    }

    /// All of the acting user's conversation views.
    pub async fn fetch_user_conversations(&self) -> Result<Vec<UserConversation>> {
        let records = self
            .store
            .query(
                Query::new(record_types::USER_CONVERSATION)
                    .filter(Filter::eq(fields::USER_ID, self.user_id())),
            )
            .await?;
        records.iter().map(UserConversation::from_record).collect()
    }

    /// The acting user's view of one conversation.
    pub async fn fetch_user_conversation(&self, conversation_id: &str) -> Result<UserConversation> {
        let key = UserConversation::record_key(self.user_id(), conversation_id);
        let id = RecordId::new(record_types::USER_CONVERSATION, key);
        match self.store.fetch(&id).await? {
            Some(record) => UserConversation::from_record(&record),
            None => Err(ChatError::NotFound(format!(
                "no view of conversation {conversation_id} for {}",
                self.user_id()
            ))),
        }
    }

    async fn find_distinct(&self, participants: &BTreeSet<String>) -> Result<Option<Conversation>> {
        let records = self
            .store
            .query(
                Query::new(record_types::CONVERSATION)
                    .filter(Filter::eq(keys::DISTINCT_BY_PARTICIPANTS, true))
                    .filter(Filter::set_eq(
                        fields::PARTICIPANT_IDS,
                        participants.iter().cloned().collect(),
                    ))
                    .with_limit(1),
            )
            .await?;
        match records.first() {
            Some(record) => Ok(Some(Conversation::from_record(record)?)),
            None => Ok(None),
        }
    }
}
