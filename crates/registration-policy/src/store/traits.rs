//! Policy store trait definition

use crate::error::StoreResult;
use crate::model::{ParameterRecord, ParameterTypeRecord};
use async_trait::async_trait;

/// Storage for policy parameters and their type catalog.
///
/// Implementations must keep at most one active [`ParameterRecord`] per key
/// after every committed upsert, and must serialize concurrent upserts to the
/// same key.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// List every active record across all keys.
    async fn list_active(&self) -> StoreResult<Vec<ParameterRecord>>;

    /// Get the active record for a key.
    async fn find_by_key(&self, key: &str) -> StoreResult<Option<ParameterRecord>>;

    /// Update the active record for `key`, or create one.
    ///
    /// Creates the catalog entry for `key` first when it does not exist.
    async fn upsert(&self, key: &str, value: &str) -> StoreResult<ParameterRecord>;

    /// Get a catalog entry by id.
    async fn find_type_by_id(&self, id: i64) -> StoreResult<Option<ParameterTypeRecord>>;

    /// List the whole type catalog.
    async fn list_types(&self) -> StoreResult<Vec<ParameterTypeRecord>>;
}
