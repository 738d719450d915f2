//! In-memory policy store for development and testing

use super::traits::PolicyStore;
use crate::clock::{Clock, SystemClock};
use crate::error::StoreResult;
use crate::model::{ParameterRecord, ParameterTypeRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    types: BTreeMap<i64, ParameterTypeRecord>,
    parameters: BTreeMap<i64, ParameterRecord>,
    next_type_id: i64,
    next_parameter_id: i64,
}

impl Tables {
    fn type_for_key(&self, key: &str) -> Option<&ParameterTypeRecord> {
        self.types.values().find(|t| t.key == key)
    }

    fn active_for_key_mut(&mut self, key: &str) -> Option<&mut ParameterRecord> {
        self.parameters
            .values_mut()
            .find(|p| p.active && p.key == key)
    }
}

/// In-memory policy store.
///
/// Upserts hold the table write lock for their whole duration, which
/// serializes them and keeps one active record per key.
pub struct InMemoryPolicyStore {
    tables: RwLock<Tables>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                next_type_id: 1,
                next_parameter_id: 1,
                ..Tables::default()
            }),
            clock,
        }
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn list_active(&self) -> StoreResult<Vec<ParameterRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .parameters
            .values()
            .filter(|p| p.active)
            .cloned()
            .collect())
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<ParameterRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .parameters
            .values()
            .find(|p| p.active && p.key == key)
            .cloned())
    }

    async fn upsert(&self, key: &str, value: &str) -> StoreResult<ParameterRecord> {
        let mut tables = self.tables.write().await;
        let now = self.clock.now();

        let type_id = match tables.type_for_key(key) {
            Some(existing) => existing.id,
            None => {
                let id = tables.next_type_id;
                tables.next_type_id += 1;
                tables.types.insert(
                    id,
                    ParameterTypeRecord {
                        id,
                        key: key.to_string(),
                        description: Some(ParameterTypeRecord::auto_description(key)),
                        active: true,
                        created_at: now,
                        updated_at: now,
                    },
                );
                tracing::debug!(key = %key, type_id = id, "Created parameter type");
                id
            }
        };

        if let Some(existing) = tables.active_for_key_mut(key) {
            existing.value = value.to_string();
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let id = tables.next_parameter_id;
        tables.next_parameter_id += 1;
        let record = ParameterRecord {
            id,
            type_id,
            key: key.to_string(),
            description: None,
            value: value.to_string(),
            active: true,
            created_at: now,
            updated_at: now,
        };
        tables.parameters.insert(id, record.clone());
        Ok(record)
    }

    async fn find_type_by_id(&self, id: i64) -> StoreResult<Option<ParameterTypeRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.types.get(&id).cloned())
    }

    async fn list_types(&self) -> StoreResult<Vec<ParameterTypeRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.types.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, Utc};

    fn store_with_clock() -> (InMemoryPolicyStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (InMemoryPolicyStore::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn first_upsert_creates_type_and_record() {
        let (store, _clock) = store_with_clock();
        let record = store.upsert("password.min.length", "10").await.unwrap();

        assert!(record.active);
        assert_eq!(record.value, "10");
        assert_eq!(record.created_at, record.updated_at);

        let types = store.list_types().await.unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].id, record.type_id);
        assert_eq!(
            types[0].description.as_deref(),
            Some("auto-generated for password.min.length")
        );
    }

    #[tokio::test]
    async fn second_upsert_overwrites_the_active_record() {
        let (store, clock) = store_with_clock();
        let first = store.upsert("password.min.length", "10").await.unwrap();
        clock.advance(Duration::seconds(1));
        let second = store.upsert("password.min.length", "12").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.value, "12");
        assert!(second.updated_at > second.created_at);
        assert_eq!(store.list_active().await.unwrap().len(), 1);
        assert_eq!(store.list_types().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_by_key_ignores_other_keys() {
        let (store, _clock) = store_with_clock();
        store.upsert("password.min.length", "10").await.unwrap();
        store.upsert("some.other.key", "xyz").await.unwrap();

        let found = store.find_by_key("some.other.key").await.unwrap().unwrap();
        assert_eq!(found.value, "xyz");
        assert!(store.find_by_key("password.max.length").await.unwrap().is_none());
        assert_eq!(store.list_active().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_upserts_keep_one_active_record() {
        let store = Arc::new(InMemoryPolicyStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .upsert("password.min.digits", &i.to_string())
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(store.list_types().await.unwrap().len(), 1);
    }
}
