//! Narrow persistence interface consumed by the request plane
//!
//! The core only needs source CRUD, credential lookup, an append-only
//! request log, and a handful of daily aggregations. The schema behind
//! the trait is opaque; `MemoryStore` is the default backend and the one
//! used throughout the test suite.

pub mod memory;

pub use memory::MemoryStore;

use crate::core::models::{Credential, RequestLog};
use crate::core::sources::SourceRecord;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Persistence operations required by the request plane
#[async_trait]
pub trait Store: Send + Sync {
    /// All persisted source records
    async fn list_sources(&self) -> Result<Vec<SourceRecord>>;

    /// Insert or replace a source record
    async fn save_source(&self, record: &SourceRecord) -> Result<()>;

    /// Remove a source record
    async fn delete_source(&self, id: &str) -> Result<()>;

    /// Credential whose secret matches the presented bearer token
    async fn credential_by_secret(&self, secret: &str) -> Result<Option<Credential>>;

    /// Credential by stable identifier
    async fn credential_by_id(&self, id: &str) -> Result<Option<Credential>>;

    /// Update a credential's last-used timestamp
    async fn touch_credential(&self, id: &str) -> Result<()>;

    /// Append one request-log row
    async fn append_request_log(&self, row: &RequestLog) -> Result<()>;

    /// Total requests logged today (UTC)
    async fn requests_today(&self) -> Result<u64>;

    /// Today's request counts grouped by source identifier
    async fn requests_today_by_source(&self) -> Result<HashMap<String, u64>>;

    /// Today's request counts grouped by credential identifier
    async fn requests_today_by_key(&self) -> Result<HashMap<String, u64>>;

    /// Today's request counts grouped by client tool
    async fn requests_today_by_tool(&self) -> Result<HashMap<String, u64>>;
}
