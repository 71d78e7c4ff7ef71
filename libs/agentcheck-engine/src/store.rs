/// Execution Store - append-only history of executions
///
/// Two backends: an in-process `MemoryStore` and a `RedisStore` that shares
/// history between API replicas. Neither evicts or mutates a recorded
/// execution.

use crate::error::StoreError;
use agentcheck_common::redis as keys;
use agentcheck_common::types::Execution;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Append an execution, assigning an id when it has none.
    /// Returns the execution as stored.
    async fn record(&self, execution: Execution) -> Result<Execution, StoreError>;

    /// All executions, most recent first
    async fn list(&self) -> Result<Vec<Execution>, StoreError>;

    async fn get(&self, execution_id: Uuid) -> Result<Option<Execution>, StoreError>;
}

#[derive(Default)]
struct MemoryInner {
    order: Vec<Uuid>,
    by_id: HashMap<Uuid, Arc<Execution>>,
}

/// In-process store. The write lock serializes concurrent records, so
/// `list` always reflects record-call order.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn record(&self, mut execution: Execution) -> Result<Execution, StoreError> {
        let id = *execution.execution_id.get_or_insert_with(Uuid::new_v4);

        let mut inner = self.inner.write().await;
        if inner.by_id.contains_key(&id) {
            return Err(StoreError::Collision(id));
        }
        inner.order.push(id);
        inner.by_id.insert(id, Arc::new(execution.clone()));
        debug!(execution_id = %id, total = inner.order.len(), "Execution recorded in memory");

        Ok(execution)
    }

    async fn list(&self) -> Result<Vec<Execution>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.by_id.get(id))
            .map(|execution| execution.as_ref().clone())
            .collect())
    }

    async fn get(&self, execution_id: Uuid) -> Result<Option<Execution>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.by_id.get(&execution_id).map(|e| e.as_ref().clone()))
    }
}

/// Redis-backed store. Each record is a single script call (SET NX plus
/// RPUSH onto the history index), so replicas sharing the instance never see
/// an execution that is stored but missing from history.
pub struct RedisStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }

    pub fn new(conn: redis::aio::ConnectionManager) -> Self {
        Self { conn }
    }

    async fn fetch(
        conn: &mut redis::aio::ConnectionManager,
        execution_id: &Uuid,
    ) -> Result<Option<Execution>, StoreError> {
        match keys::get_execution_payload(conn, execution_id).await? {
            Some(payload) => decode_execution(&payload).map(Some),
            None => Ok(None),
        }
    }
}

fn decode_execution(payload: &str) -> Result<Execution, StoreError> {
    Ok(serde_json::from_str(payload)?)
}

/// Parse history index entries, skipping (and reporting) any that are not ids
fn parse_index(raw: Vec<String>) -> Vec<Uuid> {
    raw.into_iter()
        .filter_map(|entry| match Uuid::parse_str(&entry) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(entry = %entry, error = %e, "Skipping malformed execution index entry");
                None
            }
        })
        .collect()
}

#[async_trait]
impl ExecutionStore for RedisStore {
    async fn record(&self, mut execution: Execution) -> Result<Execution, StoreError> {
        let id = *execution.execution_id.get_or_insert_with(Uuid::new_v4);
        let payload = serde_json::to_string(&execution)?;

        let mut conn = self.conn.clone();
        if !keys::record_execution(&mut conn, &id, &payload).await? {
            return Err(StoreError::Collision(id));
        }
        debug!(execution_id = %id, "Execution recorded in Redis");

        Ok(execution)
    }

    async fn list(&self) -> Result<Vec<Execution>, StoreError> {
        let mut conn = self.conn.clone();
        let ids = parse_index(keys::list_execution_ids(&mut conn).await?);

        let mut executions = Vec::with_capacity(ids.len());
        for id in ids.iter().rev() {
            if let Some(execution) = Self::fetch(&mut conn, id).await? {
                executions.push(execution);
            }
        }
        Ok(executions)
    }

    async fn get(&self, execution_id: Uuid) -> Result<Option<Execution>, StoreError> {
        let mut conn = self.conn.clone();
        Self::fetch(&mut conn, &execution_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::aggregate_results;

    fn empty_execution(model: &str) -> Execution {
        aggregate_results(Vec::new(), model, 0.0)
    }

    #[tokio::test]
    async fn test_record_assigns_id() {
        let store = MemoryStore::new();
        let recorded = store.record(empty_execution("m")).await.unwrap();
        let id = recorded.execution_id.unwrap();

        let fetched = store.get(id).await.unwrap().unwrap();
        assert_eq!(fetched, recorded);
    }

    #[tokio::test]
    async fn test_record_keeps_existing_id() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        let mut execution = empty_execution("m");
        execution.execution_id = Some(id);

        let recorded = store.record(execution).await.unwrap();
        assert_eq!(recorded.execution_id, Some(id));
    }

    #[tokio::test]
    async fn test_collision_rejected() {
        let store = MemoryStore::new();
        let first = store.record(empty_execution("first")).await.unwrap();

        let mut duplicate = empty_execution("second");
        duplicate.execution_id = first.execution_id;
        let err = store.record(duplicate).await.unwrap_err();
        assert!(matches!(err, StoreError::Collision(id) if Some(id) == first.execution_id));

        // Original is untouched
        let stored = store.get(first.execution_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.summary.model_used, "first");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_most_recent_first() {
        let store = MemoryStore::new();
        for model in ["a", "b", "c"] {
            store.record(empty_execution(model)).await.unwrap();
        }

        let models: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.summary.model_used)
            .collect();
        assert_eq!(models, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryStore::new();
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_is_stable() {
        let store = MemoryStore::new();
        let id = store
            .record(empty_execution("m"))
            .await
            .unwrap()
            .execution_id
            .unwrap();

        let first = serde_json::to_string(&store.get(id).await.unwrap()).unwrap();
        let second = serde_json::to_string(&store.get(id).await.unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_not_lost() {
        let store = Arc::new(MemoryStore::new());

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.record(empty_execution(&i.to_string())).await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().execution_id.unwrap());
        }

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 32);
        for id in ids {
            assert!(listed.iter().any(|e| e.execution_id == Some(id)));
        }
    }

    #[test]
    fn test_corrupt_payload_is_serialization_error() {
        let stored = serde_json::to_string(&empty_execution("m")).unwrap();
        assert!(decode_execution(&stored).is_ok());
        assert!(matches!(
            decode_execution("{\"total_tests\": \"three\"}"),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_parse_index_skips_malformed_entries() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let parsed = parse_index(vec![
            first.to_string(),
            "not-an-id".to_string(),
            second.to_string(),
        ]);
        assert_eq!(parsed, vec![first, second]);
    }

    /// Requires a running Redis instance
    #[tokio::test]
    #[ignore]
    async fn test_redis_collision_leaves_history_unchanged() {
        let store = RedisStore::connect("redis://127.0.0.1:6379").await.unwrap();
        let recorded = store.record(empty_execution("redis")).await.unwrap();
        let before = store.list().await.unwrap().len();

        assert!(matches!(
            store.record(recorded.clone()).await,
            Err(StoreError::Collision(_))
        ));
        let after = store.list().await.unwrap();
        assert_eq!(after.len(), before);
        assert_eq!(
            after.iter().filter(|e| e.execution_id == recorded.execution_id).count(),
            1
        );
    }

    /// Requires a running Redis instance
    #[tokio::test]
    #[ignore]
    async fn test_redis_store_roundtrip() {
        let store = RedisStore::connect("redis://127.0.0.1:6379").await.unwrap();
        let recorded = store.record(empty_execution("redis")).await.unwrap();
        let id = recorded.execution_id.unwrap();

        assert_eq!(store.get(id).await.unwrap(), Some(recorded.clone()));
        assert_eq!(store.list().await.unwrap().first(), Some(&recorded));
        assert!(matches!(
            store.record(recorded).await,
            Err(StoreError::Collision(_))
        ));
    }
}
