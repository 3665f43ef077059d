use std::sync::Arc;

use uuid::Uuid;

use crate::domain::authorization::{Actor, AuthorizationResolver};
use crate::error::{ProcurementError, Result};
use crate::storage::VersionedRepository;
use crate::versioning::core::Versioned;

use super::versioned_store::VersionedStore;

// ============================================================================
// Rollback Engine
// ============================================================================
//
// Rollback never rewinds history. The target snapshot's content is copied
// onto the live row and committed as a NEW version (head + 1), so every
// version number ever issued stays in the snapshot table.
//
// ============================================================================

pub struct RollbackEngine {
    store: Arc<VersionedStore>,
    authz: Arc<AuthorizationResolver>,
}

impl RollbackEngine {
    pub fn new(store: Arc<VersionedStore>, authz: Arc<AuthorizationResolver>) -> Self {
        Self { store, authz }
    }

    pub async fn rollback<T, R>(
        &self,
        repo: &R,
        entity_id: Uuid,
        target_version: i64,
        actor: &Actor,
    ) -> Result<T>
    where
        T: Versioned,
        R: VersionedRepository<T> + ?Sized,
    {
        let snapshot = repo
            .find_snapshot(entity_id, target_version)
            .await?
            .ok_or_else(|| ProcurementError::not_found(T::KIND, entity_id))?;

        self.authz.authorize_snapshot(actor, T::KIND, &snapshot)?;

        let mut live = repo.find_live(entity_id).await?.ok_or_else(|| {
            ProcurementError::Internal(format!(
                "{} {} has snapshots but no live row",
                T::KIND,
                entity_id
            ))
        })?;

        let from_version = live.version();
        self.store
            .apply_mutation(&mut live, |entity| entity.restore(&snapshot.content))
            .await?;

        self.store.metrics().record_rollback(T::KIND.as_str());
        tracing::info!(
            kind = %T::KIND,
            id = %entity_id,
            target_version,
            from_version,
            new_version = live.version(),
            actor = %actor.username(),
            "⏪ Rolled back"
        );

        Ok(live)
    }
}
