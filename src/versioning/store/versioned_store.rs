use std::sync::Arc;
use std::time::Instant;

use crate::error::{ProcurementError, Result};
use crate::metrics::Metrics;
use crate::storage::MutationStore;
use crate::versioning::core::Versioned;

use super::batch::MutationBatch;

// ============================================================================
// Versioned Store - Mutation Protocol
// ============================================================================
//
// Every write to a tender or bid goes through here:
// 1. Remember the version that was read
// 2. Run the caller's mutator
// 3. Advance the version by one
// 4. Commit live row + snapshot atomically, CAS on the remembered version
//
// ============================================================================

pub struct VersionedStore {
    mutations: Arc<dyn MutationStore>,
    metrics: Arc<Metrics>,
}

impl VersionedStore {
    pub fn new(mutations: Arc<dyn MutationStore>, metrics: Arc<Metrics>) -> Self {
        Self { mutations, metrics }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Persist a brand-new entity at version 1 with its first snapshot
    pub async fn create<T: Versioned>(&self, entity: &T) -> Result<()> {
        let mut batch = MutationBatch::new();
        batch.stage_insert(entity)?;
        self.commit(batch).await
    }

    /// Mutate `entity` and persist the result as the next version.
    ///
    /// On failure `entity` is put back to the state it had on entry.
    pub async fn apply_mutation<T, F>(&self, entity: &mut T, mutator: F) -> Result<()>
    where
        T: Versioned,
        F: FnOnce(&mut T),
    {
        let original = entity.clone();

        let mut batch = MutationBatch::new();
        batch.stage_mutation(entity, mutator);

        if let Err(e) = self.commit(batch).await {
            *entity = original;
            return Err(e);
        }
        Ok(())
    }

    /// Commit a multi-entity batch in one transaction
    pub async fn commit(&self, batch: MutationBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let write_count = batch.len();
        let kinds: Vec<&'static str> = batch
            .writes()
            .iter()
            .filter_map(|w| w.entity_kind())
            .map(|k| k.as_str())
            .collect();

        let started = Instant::now();
        let result = self.mutations.commit(batch).await;
        self.metrics
            .commit_duration
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                for kind in &kinds {
                    self.metrics.record_mutation(kind);
                }
                tracing::info!(
                    writes = write_count,
                    entities = ?kinds,
                    "✅ Committed mutation batch"
                );
                Ok(())
            }
            Err(ProcurementError::Conflict {
                kind,
                id,
                expected,
                actual,
            }) => {
                self.metrics.record_conflict(kind.as_str());
                tracing::warn!(
                    kind = %kind,
                    id = %id,
                    expected_version = expected,
                    actual_version = ?actual,
                    "Version conflict, batch discarded"
                );
                Err(ProcurementError::Conflict {
                    kind,
                    id,
                    expected,
                    actual,
                })
            }
            Err(err) => {
                self.metrics.commit_failures.inc();
                tracing::error!(error = %err, writes = write_count, "Failed to commit mutation batch");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tender::{ServiceType, Tender, TenderStatus};
    use crate::error::ErrorKind;
    use crate::storage::{InMemoryStore, VersionedRepository};
    use uuid::Uuid;

    fn setup() -> (Arc<InMemoryStore>, VersionedStore) {
        let memory = Arc::new(InMemoryStore::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        let store = VersionedStore::new(memory.clone(), metrics);
        (memory, store)
    }

    fn test_tender() -> Tender {
        Tender::new(
            "Bridge".to_string(),
            "Paint the bridge".to_string(),
            ServiceType::Construction,
            Uuid::new_v4(),
            "alice".to_string(),
        )
    }

    #[tokio::test]
    async fn test_create_writes_live_row_and_first_snapshot() {
        let (memory, store) = setup();
        let tender = test_tender();

        store.create(&tender).await.unwrap();

        let live = VersionedRepository::<Tender>::find_live(&*memory, tender.id)
            .await
            .unwrap();
        assert_eq!(live.unwrap().version, 1);
        let snapshot = VersionedRepository::<Tender>::find_snapshot(&*memory, tender.id, 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.content, tender.content());
    }

    #[tokio::test]
    async fn test_apply_mutation_advances_version() {
        let (memory, store) = setup();
        let mut tender = test_tender();
        store.create(&tender).await.unwrap();

        store
            .apply_mutation(&mut tender, |t| t.status = TenderStatus::Published)
            .await
            .unwrap();

        assert_eq!(tender.version, 2);
        let snapshot = VersionedRepository::<Tender>::find_snapshot(&*memory, tender.id, 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.content.status, TenderStatus::Published);
        let committed = store
            .metrics()
            .mutations_committed
            .with_label_values(&["Tender"])
            .get();
        assert_eq!(committed, 2);
    }

    #[tokio::test]
    async fn test_stale_copy_gets_conflict_and_is_restored() {
        let (memory, store) = setup();
        let mut first = test_tender();
        store.create(&first).await.unwrap();
        let mut stale = first.clone();

        store
            .apply_mutation(&mut first, |t| t.name = "First".to_string())
            .await
            .unwrap();

        let err = store
            .apply_mutation(&mut stale, |t| t.name = "Second".to_string())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(stale.version, 1);
        assert_eq!(stale.name, "Bridge");

        let live = VersionedRepository::<Tender>::find_live(&*memory, first.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.name, "First");
        assert_eq!(live.version, 2);
        let missing = VersionedRepository::<Tender>::find_snapshot(&*memory, first.id, 3)
            .await
            .unwrap();
        assert!(missing.is_none());
        let conflicts = store
            .metrics()
            .mutation_conflicts
            .with_label_values(&["Tender"])
            .get();
        assert_eq!(conflicts, 1);
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let (_memory, store) = setup();
        store.commit(MutationBatch::new()).await.unwrap();
        assert_eq!(store.metrics().commit_failures.get(), 0);
    }
}
