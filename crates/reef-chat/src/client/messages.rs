//! Message composition, pagination and soft delete.

use crate::client::ChatClient;
use crate::error::{ChatError, Result};
use crate::event::ChatEvent;
use crate::keys::{fields, record_types};
use crate::types::{AssetData, Conversation, Message, MetadataType};
use chrono::{DateTime, Utc};
use reef_store::{timestamp_str, AssetRef, Filter, NotificationTransport, Query, RecordId, RecordStore};
use serde_json::Map;

impl<S, T> ChatClient<S, T>
where
    S: RecordStore,
    T: NotificationTransport,
{
    /// Create a text message in a conversation.
    pub async fn create_message(
        &self,
        conversation: &Conversation,
        body: Option<&str>,
        metadata: Option<Map<String, serde_json::Value>>,
    ) -> Result<Message> {
        let mut message = Message::new(self.user_id());
        message.body = body.map(str::to_string);
        message.metadata = metadata.unwrap_or_default();
        self.add_message(message, conversation).await
    }

    /// Create an image message. The image is uploaded before the message is
    /// saved.
    pub async fn create_message_with_image(
        &self,
        conversation: &Conversation,
        body: Option<&str>,
        image: AssetData,
    ) -> Result<Message> {
        let mut message = Message::new(self.user_id()).with_metadata_type(MetadataType::Image);
        message.body = body.map(str::to_string);
        self.add_message_with_asset(message, image, conversation).await
    }

    /// Create a voice message with its duration in seconds.
    pub async fn create_message_with_voice(
        &self,
        conversation: &Conversation,
        body: Option<&str>,
        voice: AssetData,
        duration_secs: f64,
    ) -> Result<Message> {
        let mut message = Message::new(self.user_id()).with_metadata_type(MetadataType::Voice);
        message.body = body.map(str::to_string);
        message.duration_secs = Some(duration_secs);
        self.add_message_with_asset(message, voice, conversation).await
    }

    /// Commit a composed message into a conversation. The conversation id
    /// is stamped here; the server assigns the creation timestamp used for
    /// ordering.
    pub async fn add_message(
        &self,
        mut message: Message,
        conversation: &Conversation,
    ) -> Result<Message> {
        message.conversation_id = conversation.id.clone();
        message.validate_content()?;

        let saved = self.store.save(message.to_record()).await?;
        let message = Message::from_record(&saved)?;
        self.apply_local(&ChatEvent::MessageCreated(message.clone()))
            .await;
        tracing::debug!("message {} added to {}", message.id, conversation.id);
        Ok(message)
    }

    /// Upload an asset, attach it under the message's per-type asset name,
    /// then commit the message. A failed upload leaves nothing behind.
    pub async fn add_message_with_asset(
        &self,
        mut message: Message,
        asset: AssetData,
        conversation: &Conversation,
    ) -> Result<Message> {
        let uploaded = self
            .store
            .upload_asset(
                message.metadata_type.asset_name(),
                asset.mime_type.as_deref(),
                asset.bytes,
            )
            .await?;
        message.asset = Some(uploaded);
        self.add_message(message, conversation).await
    }

    pub async fn fetch_message(&self, message_id: &str) -> Result<Message> {
        let id = RecordId::new(record_types::MESSAGE, message_id);
        match self.store.fetch(&id).await? {
            Some(record) => Message::from_record(&record),
            None => Err(ChatError::NotFound(format!("message {message_id}"))),
        }
    }

    /// Soft-delete a message: the record stays, its deleted flag is set, so
    /// pagination stays stable for participants who already fetched it.
    pub async fn delete_message(&self, message: &Message) -> Result<Message> {
        let mut updated = message.clone();
        updated.deleted = true;
        let saved = self.store.save(updated.to_record()).await?;
        let message = Message::from_record(&saved)?;
        self.apply_local(&ChatEvent::MessageDeleted(message.clone()))
            .await;
        tracing::debug!("message {} soft-deleted", message.id);
        Ok(message)
    }

    pub async fn delete_message_by_id(&self, message_id: &str) -> Result<Message> {
        let message = self.fetch_message(message_id).await?;
        self.delete_message(&message).await
    }

    /// Fetch at most `limit` messages strictly older than `before_time`
    /// (the newest ones when no cursor is given), newest first. A limit of
    /// 0 uses the configured default page size.
    pub async fn fetch_messages(
        &self,
        conversation: &Conversation,
        limit: usize,
        before_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>> {
        self.fetch_messages_by_id(&conversation.id, limit, before_time)
            .await
    }

    pub async fn fetch_messages_by_id(
        &self,
        conversation_id: &str,
        limit: usize,
        before_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>> {
        let limit = if limit == 0 {
            self.config.default_page_size
        } else {
            limit
        };
        let mut query = Query::new(record_types::MESSAGE)
            .filter(Filter::eq(fields::CONVERSATION_ID, conversation_id))
            .sort_by(fields::CREATED_AT, true)
            .with_limit(limit);
        if let Some(before) = before_time {
            query = query.filter(Filter::lt(fields::CREATED_AT, timestamp_str(before)));
        }

        let records = self.store.query(query).await?;
        let messages: Vec<Message> = records
            .iter()
            .map(Message::from_record)
            .collect::<Result<_>>()?;

        if before_time.is_none() {
            self.projection
                .lock()
                .await
                .record_page(conversation_id, &messages);
        }
        Ok(messages)
    }

    /// Asset reference carried by a stored message, if any.
    pub async fn fetch_asset(&self, message_id: &str) -> Result<Option<AssetRef>> {
        let message = self.fetch_message(message_id).await?;
        Ok(message.asset)
    }
}
