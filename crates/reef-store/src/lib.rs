//! Generic record-store and notification-channel abstraction.
//!
//! Everything above this crate speaks in terms of [`Record`]s and opaque
//! channel payloads; the gateways here decide where those records actually
//! live (an HTTP record API, or memory for tests).

pub mod error;
pub mod http;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{Result, StoreError};
pub use http::{GatewayConfig, HttpGateway};
pub use memory::MemoryGateway;
pub use traits::{NotificationTransport, RecordStore};
pub use types::{timestamp_str, AssetRef, Filter, Query, Record, RecordId, Sort};
