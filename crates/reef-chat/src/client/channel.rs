//! Per-user notification channel and event subscription.

use crate::client::ChatClient;
use crate::error::Result;
use crate::event::ChatEvent;
use crate::keys::record_types;
use crate::types::UserChannel;
use reef_store::{NotificationTransport, RecordId, RecordStore};

/// Handle to a live subscription. Closing it stops the drain task; the
/// channel itself stays registered for the next subscribe.
pub struct SubscriptionHandle {
    task: tokio::task::JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn close(&self) {
        self.task.abort();
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }
}

impl<S, T> ChatClient<S, T>
where
    S: RecordStore,
    T: NotificationTransport,
{
    /// The acting user's notification channel, created lazily on first use.
    ///
    /// Idempotent: an existing channel record is returned unchanged, and
    /// the resolved channel is cached on the client until [`teardown`].
    ///
    /// [`teardown`]: ChatClient::teardown
    pub async fn get_or_create_channel(&self) -> Result<UserChannel> {
        let mut cached = self.channel.lock().await;
        if let Some(channel) = cached.as_ref() {
            return Ok(channel.clone());
        }

        let id = RecordId::new(record_types::USER_CHANNEL, self.user_id());
        let channel = match self.store.fetch(&id).await? {
            Some(record) => UserChannel::from_record(&record)?,
            None => {
                let name = self.transport.ensure_channel(self.user_id()).await?;
                let saved = self
                    .store
                    .save(UserChannel::new(self.user_id(), name).to_record())
                    .await?;
                tracing::info!("created notification channel for {}", self.user_id());
                UserChannel::from_record(&saved)?
            }
        };
        *cached = Some(channel.clone());
        Ok(channel)
    }

    /// Subscribe to the acting user's channel. Each inbound payload is
    /// decoded, applied to the local projection, then handed to `handler`.
    /// Undecodable payloads are dropped; delivery of the same event twice
    /// leaves the projection unchanged.
    pub async fn subscribe<F>(&self, handler: F) -> Result<SubscriptionHandle>
    where
        F: Fn(ChatEvent) + Send + Sync + 'static,
    {
        let channel = self.get_or_create_channel().await?;
        let receiver = self.transport.subscribe(&channel.name).await?;
        let projection = std::sync::Arc::clone(&self.projection);

        let task = tokio::spawn(async move {
            while let Ok(payload) = receiver.recv().await {
                let Some(event) = ChatEvent::decode(&payload) else {
                    continue;
                };
                projection.lock().await.apply(&event);
                handler(event);
            }
            tracing::debug!("subscription stream closed");
        });
        self.subscriptions.lock().await.push(task.abort_handle());
        Ok(SubscriptionHandle { task })
    }
}
