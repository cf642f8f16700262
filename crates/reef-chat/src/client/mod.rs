//! The chat client: public operation surface over the gateway traits.

mod channel;
mod conversations;
mod membership;
mod messages;
mod receipts;

pub use channel::SubscriptionHandle;

use crate::error::{ChatError, Result};
use crate::event::ChatEvent;
use crate::projection::{Projection, UnreadTotals};
use crate::types::{Message, UserChannel};
use reef_store::{NotificationTransport, RecordStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The authenticated user this client acts as.
#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Session {
            user_id: user_id.into(),
        }
    }
}

/// Client behavior knobs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatConfig {
    /// Page size used when a fetch is called with limit 0.
    pub default_page_size: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        ChatConfig {
            default_page_size: 50,
        }
    }
}

/// Client-facing chat logic over a record store and a notification
/// transport.
///
/// Every operation issues one or more gateway calls and resolves exactly
/// once with either a well-formed entity or a single typed error. Direct
/// responses and channel events both funnel through the same local
/// projection, so the two paths cannot diverge.
pub struct ChatClient<S, T> {
    store: Arc<S>,
    transport: Arc<T>,
    session: Session,
    config: ChatConfig,
    projection: Arc<Mutex<Projection>>,
    channel: Arc<Mutex<Option<UserChannel>>>,
    subscriptions: Arc<Mutex<Vec<tokio::task::AbortHandle>>>,
}

impl<S, T> Clone for ChatClient<S, T> {
    fn clone(&self) -> Self {
        ChatClient {
            store: Arc::clone(&self.store),
            transport: Arc::clone(&self.transport),
            session: self.session.clone(),
            config: self.config.clone(),
            projection: Arc::clone(&self.projection),
            channel: Arc::clone(&self.channel),
            subscriptions: Arc::clone(&self.subscriptions),
        }
    }
}

impl<S, T> ChatClient<S, T>
where
    S: RecordStore,
    T: NotificationTransport,
{
    pub fn new(store: Arc<S>, transport: Arc<T>, session: Session) -> Self {
        Self::with_config(store, transport, session, ChatConfig::default())
    }

    pub fn with_config(
        store: Arc<S>,
        transport: Arc<T>,
        session: Session,
        config: ChatConfig,
    ) -> Self {
        let projection = Projection::new(session.user_id.clone());
        ChatClient {
            store,
            transport,
            session,
            config,
            projection: Arc::new(Mutex::new(projection)),
            channel: Arc::new(Mutex::new(None)),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.session.user_id
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Unread count currently held by the local projection.
    pub async fn local_unread_count(&self, conversation_id: &str) -> u64 {
        self.projection.lock().await.unread_count(conversation_id)
    }

    /// Aggregate unread totals currently held by the local projection.
    pub async fn local_unread_totals(&self) -> UnreadTotals {
        self.projection.lock().await.totals()
    }

    /// Cached newest-first message page for a conversation.
    pub async fn cached_messages(&self, conversation_id: &str) -> Vec<Message> {
        self.projection
            .lock()
            .await
            .cached_messages(conversation_id)
            .to_vec()
    }

    /// Close all live subscriptions and forget the cached channel.
    /// Call on logout; the next subscribe re-creates everything lazily.
    pub async fn teardown(&self) {
        let mut subscriptions = self.subscriptions.lock().await;
        for handle in subscriptions.drain(..) {
            handle.abort();
        }
        *self.channel.lock().await = None;
        tracing::debug!("chat client torn down for {}", self.session.user_id);
    }

    pub(crate) async fn apply_local(&self, event: &ChatEvent) {
        self.projection.lock().await.apply(event);
    }

    /// Trim, reject blanks, dedupe. Does not add the acting user.
    pub(crate) fn normalize_ids(ids: &[String]) -> Result<BTreeSet<String>> {
        let mut set = BTreeSet::new();
        for id in ids {
            let trimmed = id.trim();
            if trimmed.is_empty() {
                return Err(ChatError::Validation("blank user id".into()));
            }
            set.insert(trimmed.to_string());
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reef_store::MemoryGateway;

    fn client() -> ChatClient<MemoryGateway, MemoryGateway> {
        let gateway = Arc::new(MemoryGateway::new());
        ChatClient::new(Arc::clone(&gateway), gateway, Session::new("alice"))
    }

    #[test]
    fn test_default_config() {
        let config = ChatConfig::default();
        assert_eq!(config.default_page_size, 50);
    }

    #[test]
    fn test_normalize_ids_rejects_blank() {
        let err = ChatClient::<MemoryGateway, MemoryGateway>::normalize_ids(&[
            "bob".to_string(),
            "  ".to_string(),
        ])
        .unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[test]
    fn test_normalize_ids_dedupes() {
        let set = ChatClient::<MemoryGateway, MemoryGateway>::normalize_ids(&[
            "bob".to_string(),
            " bob ".to_string(),
        ])
        .unwrap();
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_fresh_client_has_empty_projection() {
        let client = client();
        assert_eq!(client.local_unread_count("c1").await, 0);
        assert_eq!(client.local_unread_totals().await, UnreadTotals::default());
        assert!(client.cached_messages("c1").await.is_empty());
    }
}
