//! In-memory gateway: the reference semantics for optimistic save, and the
//! test double for the whole stack.

use crate::error::{Result, StoreError};
use crate::traits::{NotificationTransport, RecordStore};
use crate::types::{AssetRef, Query, Record, RecordId};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct State {
    records: BTreeMap<String, Record>,
    assets: HashMap<String, (AssetRef, Bytes)>,
    channels: HashMap<String, String>,
    subscribers: HashMap<String, Vec<async_channel::Sender<Value>>>,
}

/// In-memory [`RecordStore`] + [`NotificationTransport`].
///
/// Saves by a user are echoed to that user's channel as mutation events, so
/// a subscribed client sees its own writes arrive asynchronously as well —
/// the same double-delivery a live backend produces.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    state: Arc<Mutex<State>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        MemoryGateway::default()
    }

    /// Push an event payload to every subscriber of a channel. Tests use
    /// this to simulate mutations arriving from other participants.
    pub async fn publish(&self, channel: &str, payload: Value) {
        let mut state = self.state.lock().await;
        Self::emit(&mut state, channel, payload);
    }

    /// Number of live subscriptions on a channel.
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        let state = self.state.lock().await;
        state
            .subscribers
            .get(channel)
            .map(|senders| senders.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }

    fn emit(state: &mut State, channel: &str, payload: Value) {
        if let Some(senders) = state.subscribers.get_mut(channel) {
            senders.retain(|sender| sender.try_send(payload.clone()).is_ok());
        }
    }

    /// Mutation event in the shape the backend pushes over a channel.
    fn mutation_payload(event: &str, record: &Record) -> Value {
        serde_json::json!({
            "record_type": record.id.record_type,
            "event": event,
            "record": record,
        })
    }

    fn emit_to_owner(state: &mut State, event: &str, record: &Record) {
        let Some(owner) = record.owner_id.clone() else {
            return;
        };
        let Some(channel) = state.channels.get(&owner).cloned() else {
            return;
        };
        let payload = Self::mutation_payload(event, record);
        Self::emit(state, &channel, payload);
    }
}

#[async_trait]
impl RecordStore for MemoryGateway {
    async fn save(&self, mut record: Record) -> Result<Record> {
        let mut state = self.state.lock().await;
        let key = record.id.to_string();
        let now = Utc::now();
        let event = match state.records.get(&key) {
            Some(current) => {
                if record.revision != current.revision {
                    return Err(StoreError::Conflict(format!(
                        "{}: revision {} is stale (stored {})",
                        key, record.revision, current.revision
                    )));
                }
                record.created_at = current.created_at;
                "updated"
            }
            None => {
                if record.revision != 0 {
                    return Err(StoreError::Conflict(format!(
                        "{}: revision {} for a record that does not exist",
                        key, record.revision
                    )));
                }
                record.created_at = Some(now);
                "created"
            }
        };
        record.revision += 1;
        record.updated_at = Some(now);
        state.records.insert(key, record.clone());
        tracing::debug!("memory save {} rev {}", record.id, record.revision);
        Self::emit_to_owner(&mut state, event, &record);
        Ok(record)
    }

    async fn fetch(&self, id: &RecordId) -> Result<Option<Record>> {
        let state = self.state.lock().await;
        Ok(state.records.get(&id.to_string()).cloned())
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(record) = state.records.remove(&id.to_string()) {
            tracing::debug!("memory delete {}", record.id);
            Self::emit_to_owner(&mut state, "deleted", &record);
        }
        Ok(())
    }

    async fn query(&self, query: Query) -> Result<Vec<Record>> {
        let state = self.state.lock().await;
        let mut hits: Vec<Record> = state
            .records
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        if let Some(sort) = &query.sort {
            hits.sort_by(|a, b| {
                let av = a.field(&sort.key);
                let bv = b.field(&sort.key);
                let ord = compare_values(av.as_ref(), bv.as_ref());
                if sort.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        if let Some(limit) = query.limit {
            hits.truncate(limit);
        }
        Ok(hits)
    }

    async fn upload_asset(
        &self,
        name: &str,
        mime_type: Option<&str>,
        data: Bytes,
    ) -> Result<AssetRef> {
        let mut state = self.state.lock().await;
        let assigned = format!("{}-{}", uuid::Uuid::new_v4(), name);
        let mut asset = AssetRef::new(assigned.clone()).with_url(format!("memory://assets/{assigned}"));
        if let Some(mime) = mime_type {
            asset = asset.with_mime_type(mime);
        }
        state.assets.insert(assigned, (asset.clone(), data));
        Ok(asset)
    }

    async fn fetch_asset(&self, name: &str) -> Result<Option<AssetRef>> {
        let state = self.state.lock().await;
        Ok(state.assets.get(name).map(|(asset, _)| asset.clone()))
    }
}

#[async_trait]
impl NotificationTransport for MemoryGateway {
    async fn ensure_channel(&self, user_id: &str) -> Result<String> {
        let mut state = self.state.lock().await;
        let name = state
            .channels
            .entry(user_id.to_string())
            .or_insert_with(|| format!("user-{user_id}"))
            .clone();
        Ok(name)
    }

    async fn subscribe(
        &self,
        channel: &str,
    ) -> Result<async_channel::Receiver<Value>> {
        let mut state = self.state.lock().await;
        let (sender, receiver) = async_channel::unbounded();
        state
            .subscribers
            .entry(channel.to_string())
            .or_default()
            .push(sender);
        tracing::debug!("memory subscribe on {channel}");
        Ok(receiver)
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
