//! Abstractions over the record backend and the notification transport.

use crate::error::Result;
use crate::types::{AssetRef, Query, Record, RecordId};
use async_trait::async_trait;
use bytes::Bytes;

/// Abstraction for record persistence with optimistic save semantics.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Save a record. Fails with a conflict when the record's revision is
    /// stale. Returns the stored record with server-assigned revision and
    /// timestamps.
    async fn save(&self, record: Record) -> Result<Record>;

    async fn fetch(&self, id: &RecordId) -> Result<Option<Record>>;

    /// Delete a record. Deleting an absent record is a no-op.
    async fn delete(&self, id: &RecordId) -> Result<()>;

    async fn query(&self, query: Query) -> Result<Vec<Record>>;

    /// Upload binary data; the returned reference carries the store-assigned
    /// asset name.
    async fn upload_asset(
        &self,
        name: &str,
        mime_type: Option<&str>,
        data: Bytes,
    ) -> Result<AssetRef>;

    async fn fetch_asset(&self, name: &str) -> Result<Option<AssetRef>>;
}

/// Abstraction for the per-user notification channel transport.
///
/// Reconnection and heartbeats are the transport's own business; consumers
/// only see a stream of opaque payloads.
#[async_trait]
pub trait NotificationTransport: Send + Sync + 'static {
    /// Return the backend-assigned channel name for a user, creating the
    /// channel on first call. Idempotent.
    async fn ensure_channel(&self, user_id: &str) -> Result<String>;

    /// Open the event stream for a channel. Events arrive in channel order.
    async fn subscribe(
        &self,
        channel: &str,
    ) -> Result<async_channel::Receiver<serde_json::Value>>;
}
