//! Fixed record types, field names and reserved keys of the chat layer.
//!
//! | Group | Constants |
//! |-------|-----------|
//! | Record types | `record_types::*` |
//! | Metadata type tags | `metadata_tags::*` |
//! | Default asset names | `asset_names::*` |
//! | Reserved conversation keys | `ADMIN_IDS`, `DISTINCT_BY_PARTICIPANTS` |
//! | Unread response keys | `CONVERSATION_UNREAD_COUNT`, `MESSAGE_UNREAD_COUNT` |

/// Record type names as stored in the gateway.
pub mod record_types {
    pub const CONVERSATION: &str = "conversation";
    pub const USER_CONVERSATION: &str = "user_conversation";
    pub const MESSAGE: &str = "message";
    pub const RECEIPT: &str = "receipt";
    pub const USER_CHANNEL: &str = "user_channel";
}

/// Metadata type tags carried on every message.
pub mod metadata_tags {
    pub const TEXT: &str = "text";
    pub const IMAGE: &str = "image";
    pub const VOICE: &str = "voice";
}

/// Default asset name per metadata type.
pub mod asset_names {
    pub const TEXT: &str = "message-text";
    pub const IMAGE: &str = "message-image";
    pub const VOICE: &str = "message-voice";
}

/// Reserved conversation record keys for the admin list and the
/// distinct-by-participants flag.
pub const ADMIN_IDS: &str = "admin_ids";
pub const DISTINCT_BY_PARTICIPANTS: &str = "distinct_by_participants";

/// Keys of the aggregate unread-count response.
pub const CONVERSATION_UNREAD_COUNT: &str = "conversation";
pub const MESSAGE_UNREAD_COUNT: &str = "message";

/// Record field names used in queries.
pub mod fields {
    pub const PARTICIPANT_IDS: &str = "participant_ids";
    pub const TITLE: &str = "title";
    pub const METADATA: &str = "metadata";
    pub const CONVERSATION_ID: &str = "conversation_id";
    pub const USER_ID: &str = "user_id";
    pub const AUTHOR_ID: &str = "author_id";
    pub const BODY: &str = "body";
    pub const METADATA_TYPE: &str = "metadata_type";
    pub const ASSET: &str = "asset";
    pub const DURATION: &str = "duration";
    pub const DELETED: &str = "deleted";
    pub const MESSAGE_ID: &str = "message_id";
    pub const DELIVERED_AT: &str = "delivered_at";
    pub const READ_AT: &str = "read_at";
    pub const LAST_READ_MESSAGE_ID: &str = "last_read_message_id";
    pub const LAST_READ_AT: &str = "last_read_at";
    pub const UNREAD_COUNT: &str = "unread_count";
    pub const CHANNEL_NAME: &str = "name";
    pub const CREATED_AT: &str = "_created_at";
}
