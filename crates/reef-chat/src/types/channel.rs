//! Per-user notification channel record.

use crate::error::{ChatError, Result};
use crate::keys::{fields, record_types};
use crate::types::required_str;

/// Binds a user to their backend-assigned channel name. One per user,
/// lazily created, idempotent on repeated fetch.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserChannel {
    pub user_id: String,
    pub name: String,
    pub revision: u64,
}

impl UserChannel {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        UserChannel {
            user_id: user_id.into(),
            name: name.into(),
            revision: 0,
        }
    }

    pub fn to_record(&self) -> reef_store::Record {
        let mut record =
            reef_store::Record::new(record_types::USER_CHANNEL, &self.user_id).with_owner(&self.user_id);
        record.revision = self.revision;
        record.set(fields::CHANNEL_NAME, self.name.as_str());
        record
    }

    pub fn from_record(record: &reef_store::Record) -> Result<Self> {
        if record.id.record_type != record_types::USER_CHANNEL {
            return Err(ChatError::Decode(format!(
                "{} is not a user_channel record",
                record.id
            )));
        }
        Ok(UserChannel {
            user_id: record.id.key.clone(),
            name: required_str(record, fields::CHANNEL_NAME)?,
            revision: record.revision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_round_trip() {
        let channel = UserChannel::new("alice", "user-alice");
        let back = UserChannel::from_record(&channel.to_record()).unwrap();
        assert_eq!(back, channel);
    }
}
