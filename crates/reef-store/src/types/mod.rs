//! Core types shared by all record gateways.

mod asset;
mod query;
mod record;

pub use asset::AssetRef;
pub use query::{Filter, Query, Sort};
pub use record::{timestamp_str, Record, RecordId};
