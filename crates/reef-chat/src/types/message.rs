//! Message entity and its content forms.

use crate::error::{ChatError, Result};
use crate::keys::{asset_names, fields, metadata_tags, record_types};
use crate::types::required_str;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reef_store::AssetRef;
use serde_json::{Map, Value};

/// Content form of a message, carried as its metadata type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataType {
    Text,
    Image,
    Voice,
}

impl MetadataType {
    pub fn tag(self) -> &'static str {
        match self {
            MetadataType::Text => metadata_tags::TEXT,
            MetadataType::Image => metadata_tags::IMAGE,
            MetadataType::Voice => metadata_tags::VOICE,
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            metadata_tags::TEXT => Ok(MetadataType::Text),
            metadata_tags::IMAGE => Ok(MetadataType::Image),
            metadata_tags::VOICE => Ok(MetadataType::Voice),
            other => Err(ChatError::Decode(format!("unknown metadata tag {other:?}"))),
        }
    }

    /// Default asset name for this content form.
    pub fn asset_name(self) -> &'static str {
        match self {
            MetadataType::Text => asset_names::TEXT,
            MetadataType::Image => asset_names::IMAGE,
            MetadataType::Voice => asset_names::VOICE,
        }
    }
}

/// Raw bytes handed to the pipeline for upload before the message is saved.
#[derive(Clone, Debug)]
pub struct AssetData {
    pub mime_type: Option<String>,
    pub bytes: Bytes,
}

impl AssetData {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        AssetData {
            mime_type: None,
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// A message belonging to exactly one conversation.
///
/// Immutable once delivered except for the soft-delete flag. `created_at`
/// is the server-assigned timestamp used for ordering and pagination.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub author_id: String,
    pub body: Option<String>,
    pub metadata_type: MetadataType,
    pub asset: Option<AssetRef>,
    /// Voice length in seconds.
    pub duration_secs: Option<f64>,
    pub metadata: Map<String, Value>,
    pub deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

impl Message {
    pub fn new(author_id: impl Into<String>) -> Self {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: String::new(),
            author_id: author_id.into(),
            body: None,
            metadata_type: MetadataType::Text,
            asset: None,
            duration_secs: None,
            metadata: Map::new(),
            deleted: false,
            created_at: None,
            revision: 0,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_metadata_type(mut self, metadata_type: MetadataType) -> Self {
        self.metadata_type = metadata_type;
        self
    }

    pub fn to_record(&self) -> reef_store::Record {
        let mut record = reef_store::Record::new(record_types::MESSAGE, &self.id)
            .with_owner(&self.author_id);
        record.revision = self.revision;
        record.set(fields::CONVERSATION_ID, self.conversation_id.as_str());
        record.set(fields::AUTHOR_ID, self.author_id.as_str());
        record.set(fields::METADATA_TYPE, self.metadata_type.tag());
        record.set(fields::DELETED, self.deleted);
        if let Some(body) = &self.body {
            record.set(fields::BODY, body.as_str());
        }
        if let Some(asset) = &self.asset {
            record.set(
                fields::ASSET,
                serde_json::to_value(asset).unwrap_or(Value::Null),
            );
        }
        if let Some(duration) = self.duration_secs {
            record.set(fields::DURATION, duration);
        }
        if !self.metadata.is_empty() {
            record.set(fields::METADATA, Value::Object(self.metadata.clone()));
        }
        record
    }

    pub fn from_record(record: &reef_store::Record) -> Result<Self> {
        if record.id.record_type != record_types::MESSAGE {
            return Err(ChatError::Decode(format!(
                "{} is not a message record",
                record.id
            )));
        }
        let asset = match record.get(fields::ASSET) {
            Some(value) => Some(
                serde_json::from_value::<AssetRef>(value.clone())
                    .map_err(|e| ChatError::Decode(format!("{}: bad asset: {e}", record.id)))?,
            ),
            None => None,
        };
        Ok(Message {
            id: record.id.key.clone(),
            conversation_id: required_str(record, fields::CONVERSATION_ID)?,
            author_id: required_str(record, fields::AUTHOR_ID)?,
            body: record.get_str(fields::BODY).map(str::to_string),
            metadata_type: MetadataType::from_tag(
                record.get_str(fields::METADATA_TYPE).unwrap_or(metadata_tags::TEXT),
            )?,
            asset,
            duration_secs: record.get_f64(fields::DURATION),
            metadata: record.get_object(fields::METADATA).cloned().unwrap_or_default(),
            deleted: record.get_bool(fields::DELETED).unwrap_or(false),
            created_at: record.created_at,
            revision: record.revision,
        })
    }

    /// A message must carry at least one content form, and an image/voice
    /// tag requires its asset to be attached already.
    pub fn validate_content(&self) -> Result<()> {
        let has_body = self.body.as_deref().is_some_and(|b| !b.trim().is_empty());
        if !has_body && self.asset.is_none() {
            return Err(ChatError::Validation(
                "message has neither body nor asset".into(),
            ));
        }
        match self.metadata_type {
            MetadataType::Text => Ok(()),
            MetadataType::Image | MetadataType::Voice => {
                if self.asset.is_none() {
                    return Err(ChatError::Validation(format!(
                        "{} message without an asset",
                        self.metadata_type.tag()
                    )));
                }
                Ok(())
            }
        }
    }
}
