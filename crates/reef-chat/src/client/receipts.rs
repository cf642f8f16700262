//! Delivery/read receipts, message markers and unread counts.

use crate::client::ChatClient;
use crate::error::{ChatError, Result};
use crate::event::ChatEvent;
use crate::keys::{fields, record_types};
use crate::projection::UnreadTotals;
use crate::types::{Message, Receipt, UserConversation};
use chrono::{DateTime, Utc};
use reef_store::{timestamp_str, Filter, NotificationTransport, Query, RecordId, RecordStore};
use std::collections::HashSet;

impl<S, T> ChatClient<S, T>
where
    S: RecordStore,
    T: NotificationTransport,
{
    /// Write a delivered receipt for the acting user on each message.
    /// Messages already delivered or read are left untouched.
    pub async fn mark_delivered(&self, messages: &[Message]) -> Result<()> {
        let ids: Vec<String> = messages.iter().map(|m| m.id.clone()).collect();
        self.mark_delivered_by_id(&ids).await
    }

    pub async fn mark_delivered_by_id(&self, message_ids: &[String]) -> Result<()> {
        for id in message_ids {
            self.upsert_receipt(id, |receipt, at| receipt.mark_delivered(at))
                .await?;
        }
        Ok(())
    }

    /// Write a read receipt for the acting user on each message. Reading
    /// implies delivery; a read status is never regressed.
    pub async fn mark_read(&self, messages: &[Message]) -> Result<()> {
        let ids: Vec<String> = messages.iter().map(|m| m.id.clone()).collect();
        self.mark_read_by_id(&ids).await
    }

    pub async fn mark_read_by_id(&self, message_ids: &[String]) -> Result<()> {
        for id in message_ids {
            self.upsert_receipt(id, |receipt, at| receipt.mark_read(at))
                .await?;
        }
        Ok(())
    }

    /// All receipts of a message, one per user with any status.
    pub async fn fetch_receipts(&self, message: &Message) -> Result<Vec<Receipt>> {
        let records = self
            .store
            .query(
                Query::new(record_types::RECEIPT)
                    .filter(Filter::eq(fields::MESSAGE_ID, message.id.as_str())),
            )
            .await?;
        records.iter().map(Receipt::from_record).collect()
    }

    /// Move the last-read pointer of the acting user's conversation view to
    /// a message and recompute the unread count. Writes no receipts.
    pub async fn mark_last_read(
        &self,
        message: &Message,
        view: &UserConversation,
    ) -> Result<UserConversation> {
        if view.user_id != self.user_id() {
            return Err(ChatError::Validation(format!(
                "view belongs to {}, not the acting user",
                view.user_id
            )));
        }
        if message.conversation_id != view.conversation_id {
            return Err(ChatError::Validation(format!(
                "message {} is not in conversation {}",
                message.id, view.conversation_id
            )));
        }
        let Some(read_at) = message.created_at else {
            return Err(ChatError::Validation(format!(
                "message {} has no server timestamp",
                message.id
            )));
        };

        let mut updated = view.clone();
        updated.last_read_message_id = Some(message.id.clone());
        updated.last_read_at = Some(read_at);
        updated.unread_count = self
            .count_unread(&view.conversation_id, Some(read_at))
            .await?;

        let saved = self.store.save(updated.to_record()).await?;
        let updated = UserConversation::from_record(&saved)?;
        self.apply_local(&ChatEvent::UserConversationUpdated(updated.clone()))
            .await;
        Ok(updated)
    }

    /// Unread count for one conversation view, recomputed from the store.
    pub async fn fetch_unread_count(&self, view: &UserConversation) -> Result<u64> {
        let count = self
            .count_unread(&view.conversation_id, view.last_read_at)
            .await?;
        self.projection
            .lock()
            .await
            .set_unread(&view.conversation_id, count);
        Ok(count)
    }

    /// Aggregate unread totals across all of the acting user's
    /// conversations: how many conversations have unread messages, and how
    /// many unread messages there are in total.
    pub async fn fetch_total_unread_count(&self) -> Result<UnreadTotals> {
        let views = self.fetch_user_conversations().await?;
        let mut totals = UnreadTotals::default();
        let mut projection = self.projection.lock().await;
        for view in &views {
            let count = self
                .count_unread(&view.conversation_id, view.last_read_at)
                .await?;
            projection.set_unread(&view.conversation_id, count);
            if count > 0 {
                totals.conversations += 1;
                totals.messages += count;
            }
        }
        Ok(totals)
    }

    /// Messages by other authors, not soft-deleted, strictly newer than the
    /// pointer and without a read receipt from the acting user.
    async fn count_unread(
        &self,
        conversation_id: &str,
        after: Option<DateTime<Utc>>,
    ) -> Result<u64> {
        let mut query = Query::new(record_types::MESSAGE)
            .filter(Filter::eq(fields::CONVERSATION_ID, conversation_id))
            .filter(Filter::eq(fields::DELETED, false));
        if let Some(after) = after {
            query = query.filter(Filter::gt(fields::CREATED_AT, timestamp_str(after)));
        }
        let records = self.store.query(query).await?;

        let candidate_ids: HashSet<String> = records
            .iter()
            .filter(|record| record.get_str(fields::AUTHOR_ID) != Some(self.user_id()))
            .map(|record| record.id.key.clone())
            .collect();
        if candidate_ids.is_empty() {
            return Ok(0);
        }

        let receipts = self
            .store
            .query(
                Query::new(record_types::RECEIPT)
                    .filter(Filter::eq(fields::USER_ID, self.user_id())),
            )
            .await?;
        let read_ids: HashSet<&str> = receipts
            .iter()
            .filter(|record| record.get_str(fields::READ_AT).is_some())
            .filter_map(|record| record.get_str(fields::MESSAGE_ID))
            .collect();

        Ok(candidate_ids
            .iter()
            .filter(|id| !read_ids.contains(id.as_str()))
            .count() as u64)
    }

    async fn upsert_receipt<F>(&self, message_id: &str, mark: F) -> Result<()>
    where
        F: Fn(&mut Receipt, DateTime<Utc>) -> bool,
    {
        let key = Receipt::record_key(message_id, self.user_id());
        let id = RecordId::new(record_types::RECEIPT, key);
        let mut receipt = match self.store.fetch(&id).await? {
            Some(record) => Receipt::from_record(&record)?,
            None => Receipt::new(message_id, self.user_id()),
        };
        if !mark(&mut receipt, Utc::now()) {
            return Ok(());
        }
        let saved = self.store.save(receipt.to_record()).await?;
        let receipt = Receipt::from_record(&saved)?;
        self.apply_local(&ChatEvent::ReceiptUpdated(receipt)).await;
        Ok(())
    }
}
