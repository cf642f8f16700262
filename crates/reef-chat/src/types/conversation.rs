//! Conversation entity.

use crate::error::{ChatError, Result};
use crate::keys::{self, fields, record_types};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A conversation between a set of participants.
///
/// The participant set is never empty and always contains the creating user.
/// Admins are kept as a separate set; it defaults to the participants at
/// creation time but is not constrained to stay a subset afterwards.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participant_ids: BTreeSet<String>,
    pub admin_ids: BTreeSet<String>,
    pub title: Option<String>,
    pub metadata: Map<String, Value>,
    pub distinct_by_participants: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Gateway revision of the snapshot this entity was read from.
    pub revision: u64,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        Conversation {
            id: id.into(),
            participant_ids: BTreeSet::new(),
            admin_ids: BTreeSet::new(),
            title: None,
            metadata: Map::new(),
            distinct_by_participants: false,
            created_at: None,
            updated_at: None,
            revision: 0,
        }
    }

    pub fn to_record(&self) -> reef_store::Record {
        let mut record = reef_store::Record::new(record_types::CONVERSATION, &self.id);
        record.revision = self.revision;
        record.set(
            fields::PARTICIPANT_IDS,
            Value::Array(
                self.participant_ids
                    .iter()
                    .map(|id| Value::String(id.clone()))
                    .collect(),
            ),
        );
        record.set(
            keys::ADMIN_IDS,
            Value::Array(
                self.admin_ids
                    .iter()
                    .map(|id| Value::String(id.clone()))
                    .collect(),
            ),
        );
        record.set(
            keys::DISTINCT_BY_PARTICIPANTS,
            self.distinct_by_participants,
        );
        if let Some(title) = &self.title {
            record.set(fields::TITLE, title.as_str());
        }
        if !self.metadata.is_empty() {
            record.set(fields::METADATA, Value::Object(self.metadata.clone()));
        }
        record
    }

    pub fn from_record(record: &reef_store::Record) -> Result<Self> {
        if record.id.record_type != record_types::CONVERSATION {
            return Err(ChatError::Decode(format!(
                "{} is not a conversation record",
                record.id
            )));
        }
        let participant_ids: BTreeSet<String> = record
            .get_str_array(fields::PARTICIPANT_IDS)
            .ok_or_else(|| ChatError::Decode(format!("{}: missing participants", record.id)))?
            .into_iter()
            .collect();
        let admin_ids: BTreeSet<String> = record
            .get_str_array(keys::ADMIN_IDS)
            .unwrap_or_default()
            .into_iter()
            .collect();
        Ok(Conversation {
            id: record.id.key.clone(),
            participant_ids,
            admin_ids,
            title: record.get_str(fields::TITLE).map(str::to_string),
            metadata: record.get_object(fields::METADATA).cloned().unwrap_or_default(),
            distinct_by_participants: record
                .get_bool(keys::DISTINCT_BY_PARTICIPANTS)
                .unwrap_or(false),
            created_at: record.created_at,
            updated_at: record.updated_at,
            revision: record.revision,
        })
    }
}
