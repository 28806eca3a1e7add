//! Thread-safe catalog of upstream sources
//!
//! A single reader-writer lock protects the id→source map; each source
//! carries its own status lock. Mutating operations persist through the
//! store before touching the in-memory view.

use super::types::{CapabilityNeeds, Source, SourceRecord, SourceStatus};
use crate::storage::Store;
use crate::utils::error::{GatewayError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// In-memory source catalog backed by the persistent store
pub struct SourceRegistry {
    sources: RwLock<HashMap<String, Arc<Source>>>,
    store: Arc<dyn Store>,
}

impl SourceRegistry {
    /// Empty registry over the given store
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
            store,
        }
    }

    /// Replace the in-memory view with the store's records
    pub async fn load(&self) -> Result<()> {
        let records = self.store.list_sources().await?;
        let mut sources = self.sources.write();
        sources.clear();
        for record in records {
            sources.insert(record.id.clone(), Arc::new(Source::from_record(record)));
        }
        info!("Loaded {} sources from store", sources.len());
        Ok(())
    }

    /// Merge config-seeded records into the registry.
    ///
    /// Existing ids are replaced but keep their live status; new ids come
    /// in with a fresh status. Config-seeded sources are not written back
    /// to the store.
    pub fn load_from_config(&self, records: Vec<SourceRecord>) {
        let mut sources = self.sources.write();
        for record in records {
            let entry = match sources.get(&record.id) {
                Some(existing) => Arc::new(Source::with_status(record, existing.status())),
                None => Arc::new(Source::from_record(record)),
            };
            sources.insert(entry.id.clone(), entry);
        }
        debug!("Registry holds {} sources after config merge", sources.len());
    }

    /// Add a new source, persisting it first
    pub async fn add(&self, record: SourceRecord) -> Result<Arc<Source>> {
        if self.sources.read().contains_key(&record.id) {
            return Err(GatewayError::Validation(format!(
                "source {} already exists",
                record.id
            )));
        }
        self.store.save_source(&record).await?;
        let source = Arc::new(Source::from_record(record));
        self.sources
            .write()
            .insert(source.id.clone(), Arc::clone(&source));
        info!("Added source {} ({})", source.name, source.id);
        Ok(source)
    }

    /// Replace a source's configuration, preserving its live status
    pub async fn update(&self, record: SourceRecord) -> Result<Arc<Source>> {
        let existing = self
            .get(&record.id)
            .ok_or_else(|| GatewayError::Validation(format!("source {} not found", record.id)))?;
        self.store.save_source(&record).await?;
        let source = Arc::new(Source::with_status(record, existing.status()));
        self.sources
            .write()
            .insert(source.id.clone(), Arc::clone(&source));
        info!("Updated source {} ({})", source.name, source.id);
        Ok(source)
    }

    /// Delete a source from the store and the live view
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete_source(id).await?;
        if self.sources.write().remove(id).is_some() {
            info!("Deleted source {}", id);
        }
        Ok(())
    }

    /// Source by identifier
    pub fn get(&self, id: &str) -> Option<Arc<Source>> {
        self.sources.read().get(id).cloned()
    }

    /// All sources, unordered
    pub fn list(&self) -> Vec<Arc<Source>> {
        self.sources.read().values().cloned().collect()
    }

    /// Enabled, healthy sources
    pub fn healthy(&self) -> Vec<Arc<Source>> {
        self.sources
            .read()
            .values()
            .filter(|s| s.is_available())
            .cloned()
            .collect()
    }

    /// Enabled, healthy sources passing the model filter and the
    /// capability demand.
    ///
    /// This is the primary routing filter. Aggregator capability checks
    /// are provider-aware per the accessors on [`Source`].
    pub fn by_capability(&self, needs: CapabilityNeeds, model: &str) -> Vec<Arc<Source>> {
        self.sources
            .read()
            .values()
            .filter(|s| s.is_available())
            .filter(|s| s.supports_model(model))
            .filter(|s| !needs.function_calling || s.supports_fc(model))
            .filter(|s| !needs.thinking || s.supports_thinking())
            .filter(|s| !needs.vision || s.supports_vision())
            .cloned()
            .collect()
    }

    /// Mutate one source's status; returns false when the id is unknown
    pub fn update_status(&self, id: &str, f: impl FnOnce(&mut SourceStatus)) -> bool {
        match self.get(id) {
            Some(source) => {
                source.update_status(f);
                true
            }
            None => false,
        }
    }

    /// Union of model identifiers contributed by healthy sources,
    /// deduplicated and sorted for a stable listing
    pub fn healthy_models(&self) -> Vec<String> {
        let mut models: Vec<String> = self
            .healthy()
            .iter()
            .flat_map(|s| s.model_list())
            .collect();
        models.sort();
        models.dedup();
        models
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sources::types::{
        AggregatorConfig, Capabilities, DetectedCapabilities, HealthState, SourceType,
    };
    use crate::storage::MemoryStore;

    fn record(id: &str) -> SourceRecord {
        SourceRecord {
            id: id.to_string(),
            name: id.to_uppercase(),
            source_type: SourceType::OpenAi,
            base_url: format!("https://{}.example.com", id),
            api_key: None,
            priority: 1,
            weight: 1,
            enabled: true,
            capabilities: Capabilities {
                function_calling: true,
                thinking: false,
                vision: false,
                models: vec![],
            },
            aggregator: None,
        }
    }

    fn registry() -> SourceRegistry {
        SourceRegistry::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn add_update_delete_round_trip() {
        let reg = registry();
        reg.add(record("a")).await.unwrap();
        assert!(reg.add(record("a")).await.is_err());

        let mut updated = record("a");
        updated.priority = 9;
        reg.get("a").unwrap().mark_failure("boom", 5, 100);
        reg.update(updated).await.unwrap();

        let source = reg.get("a").unwrap();
        assert_eq!(source.priority, 9);
        // live status survived the update
        assert_eq!(source.status().consecutive_failures, 1);

        reg.delete("a").await.unwrap();
        assert!(reg.get("a").is_none());
    }

    #[tokio::test]
    async fn load_restores_store_records() {
        let store = Arc::new(MemoryStore::new());
        store.save_source(&record("a")).await.unwrap();
        store.save_source(&record("b")).await.unwrap();

        let reg = SourceRegistry::new(store);
        reg.load().await.unwrap();
        assert_eq!(reg.list().len(), 2);
    }

    #[test]
    fn config_merge_preserves_status() {
        let reg = registry();
        reg.load_from_config(vec![record("a")]);
        reg.get("a").unwrap().mark_failure("down", 3, 1);
        assert_eq!(reg.get("a").unwrap().status().state, HealthState::Unhealthy);

        let mut replacement = record("a");
        replacement.priority = 7;
        reg.load_from_config(vec![replacement, record("b")]);

        let merged = reg.get("a").unwrap();
        assert_eq!(merged.priority, 7);
        assert_eq!(merged.status().state, HealthState::Unhealthy);
        assert_eq!(reg.list().len(), 2);
    }

    #[test]
    fn by_capability_filters_health_model_and_demand() {
        let reg = registry();
        let mut fc = record("fc");
        fc.capabilities.models = vec!["gpt-4".to_string()];
        let mut plain = record("plain");
        plain.capabilities.function_calling = false;
        let mut sick = record("sick");
        sick.capabilities.models = vec!["gpt-4".to_string()];
        reg.load_from_config(vec![fc, plain, sick]);
        reg.get("sick").unwrap().mark_failure("down", 2, 1);

        let needs = CapabilityNeeds {
            function_calling: true,
            ..Default::default()
        };
        let candidates = reg.by_capability(needs, "gpt-4");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "fc");

        // dropping the FC demand widens the pool to the non-FC source
        let widened = reg.by_capability(needs.without_fc(), "gpt-4");
        assert_eq!(widened.len(), 2);

        // model filter still applies
        let other_model = reg.by_capability(needs.without_fc(), "claude-3");
        assert_eq!(other_model.len(), 2); // empty model lists admit anything
        let strict = reg.by_capability(needs, "gpt-3.5");
        assert!(strict.iter().all(|s| s.capabilities.models.is_empty()));
    }

    #[test]
    fn healthy_models_unions_declared_and_detected() {
        let reg = registry();
        let mut a = record("a");
        a.capabilities.models = vec!["gpt-4".to_string(), "gpt-4o".to_string()];
        let mut agg = record("agg");
        agg.source_type = SourceType::Cpa;
        agg.aggregator = Some(AggregatorConfig {
            providers: vec!["gemini".to_string()],
            auto_detect: true,
            ..Default::default()
        });
        reg.load_from_config(vec![a, agg]);
        reg.get("agg").unwrap().update_status(|s| {
            s.detected = Some(DetectedCapabilities {
                models: vec!["gemini-2.0-flash".to_string(), "gpt-4".to_string()],
                function_calling: true,
                vision: true,
            });
        });

        let models = reg.healthy_models();
        assert_eq!(models, vec!["gemini-2.0-flash", "gpt-4", "gpt-4o"]);
    }
}
