//! In-memory store backend
//!
//! Backs the gateway when no external database is wired in, and every
//! test. Log rows are held in an append-only vector behind a mutex; the
//! aggregation queries scan it, which is fine at in-memory scale.

use super::Store;
use crate::core::models::{Credential, RequestLog};
use crate::core::sources::SourceRecord;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-memory [`Store`] implementation
#[derive(Default)]
pub struct MemoryStore {
    sources: DashMap<String, SourceRecord>,
    credentials: DashMap<String, Credential>,
    logs: Mutex<Vec<RequestLog>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a credential, keyed by its identifier
    pub fn insert_credential(&self, credential: Credential) {
        self.credentials.insert(credential.id.clone(), credential);
    }

    /// Snapshot of all log rows, oldest first
    pub fn request_logs(&self) -> Vec<RequestLog> {
        self.logs.lock().clone()
    }

    fn today_rows<T, F: Fn(&RequestLog) -> T>(&self, f: F) -> Vec<T> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        self.logs
            .lock()
            .iter()
            .filter(|row| row.date_key() == today)
            .map(f)
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_sources(&self) -> Result<Vec<SourceRecord>> {
        Ok(self.sources.iter().map(|e| e.value().clone()).collect())
    }

    async fn save_source(&self, record: &SourceRecord) -> Result<()> {
        self.sources.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete_source(&self, id: &str) -> Result<()> {
        self.sources.remove(id);
        Ok(())
    }

    async fn credential_by_secret(&self, secret: &str) -> Result<Option<Credential>> {
        Ok(self
            .credentials
            .iter()
            .find(|e| e.value().secret == secret)
            .map(|e| e.value().clone()))
    }

    async fn credential_by_id(&self, id: &str) -> Result<Option<Credential>> {
        Ok(self.credentials.get(id).map(|e| e.value().clone()))
    }

    async fn touch_credential(&self, id: &str) -> Result<()> {
        if let Some(mut credential) = self.credentials.get_mut(id) {
            credential.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn append_request_log(&self, row: &RequestLog) -> Result<()> {
        self.logs.lock().push(row.clone());
        Ok(())
    }

    async fn requests_today(&self) -> Result<u64> {
        Ok(self.today_rows(|_| ()).len() as u64)
    }

    async fn requests_today_by_source(&self) -> Result<HashMap<String, u64>> {
        let mut counts = HashMap::new();
        for source_id in self.today_rows(|row| row.source_id.clone()) {
            *counts.entry(source_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn requests_today_by_key(&self) -> Result<HashMap<String, u64>> {
        let mut counts = HashMap::new();
        for key_id in self.today_rows(|row| row.key_id.clone()) {
            *counts.entry(key_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn requests_today_by_tool(&self) -> Result<HashMap<String, u64>> {
        let mut counts = HashMap::new();
        for tool in self.today_rows(|row| row.client_tool.clone()) {
            *counts.entry(tool).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
