//! Per-recipient delivery/read receipt.

use crate::error::{ChatError, Result};
use crate::keys::{fields, record_types};
use crate::types::{parse_time, required_str};
use chrono::{DateTime, Utc};
use reef_store::timestamp_str;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Delivered,
    Read,
}

/// Delivery/read state of one message for one user.
///
/// Status is monotonic: read implies delivered, and a later mark never
/// regresses an earlier one.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Receipt {
    pub message_id: String,
    pub user_id: String,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

impl Receipt {
    pub fn new(message_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Receipt {
            message_id: message_id.into(),
            user_id: user_id.into(),
            delivered_at: None,
            read_at: None,
            revision: 0,
        }
    }

    /// Record key: one receipt per (message, user) pair.
    pub fn record_key(message_id: &str, user_id: &str) -> String {
        format!("{message_id}:{user_id}")
    }

    pub fn status(&self) -> ReceiptStatus {
        if self.read_at.is_some() {
            ReceiptStatus::Read
        } else {
            ReceiptStatus::Delivered
        }
    }

    /// Timestamp of the most advanced status.
    pub fn status_at(&self) -> Option<DateTime<Utc>> {
        self.read_at.or(self.delivered_at)
    }

    /// Mark delivered. Returns false when nothing changed — already
    /// delivered, or already read (marking a read message as delivered is a
    /// silent no-op).
    pub fn mark_delivered(&mut self, at: DateTime<Utc>) -> bool {
        if self.delivered_at.is_some() || self.read_at.is_some() {
            return false;
        }
        self.delivered_at = Some(at);
        true
    }

    /// Mark read, filling in the delivered timestamp when absent. Returns
    /// false when already read.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.read_at.is_some() {
            return false;
        }
        self.read_at = Some(at);
        if self.delivered_at.is_none() {
            self.delivered_at = Some(at);
        }
        true
    }

    pub fn to_record(&self) -> reef_store::Record {
        let mut record = reef_store::Record::new(
            record_types::RECEIPT,
            Self::record_key(&self.message_id, &self.user_id),
        )
        .with_owner(&self.user_id);
        record.revision = self.revision;
        record.set(fields::MESSAGE_ID, self.message_id.as_str());
        record.set(fields::USER_ID, self.user_id.as_str());
        if let Some(at) = self.delivered_at {
            record.set(fields::DELIVERED_AT, timestamp_str(at));
        }
        if let Some(at) = self.read_at {
            record.set(fields::READ_AT, timestamp_str(at));
        }
        record
    }

    pub fn from_record(record: &reef_store::Record) -> Result<Self> {
        if record.id.record_type != record_types::RECEIPT {
            return Err(ChatError::Decode(format!(
                "{} is not a receipt record",
                record.id
            )));
        }
        let delivered_at = record
            .get_str(fields::DELIVERED_AT)
            .map(parse_time)
            .transpose()?;
        let read_at = record.get_str(fields::READ_AT).map(parse_time).transpose()?;
        Ok(Receipt {
            message_id: required_str(record, fields::MESSAGE_ID)?,
            user_id: required_str(record, fields::USER_ID)?,
            delivered_at,
            read_at,
            revision: record.revision,
        })
    }
}
