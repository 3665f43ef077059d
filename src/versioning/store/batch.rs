use crate::domain::bid::{Bid, Feedback};
use crate::domain::tender::Tender;
use crate::error::{ProcurementError, Result};
use crate::versioning::core::{EntityKind, Snapshot, Versioned};

// ============================================================================
// Mutation Batch - Unit of Atomic Write
// ============================================================================
//
// A batch collects every write a use case needs (live rows, snapshots,
// feedback) and is committed by the store in ONE transaction: either all
// writes land or none do.
//
// Versioned writes carry the version the caller read. The store applies them
// as compare-and-swap on that version and reports `Conflict` on mismatch.
//
// ============================================================================

/// A live row plus the snapshot that records it
#[derive(Debug, Clone)]
pub struct VersionedWrite<T: Versioned> {
    pub entity: T,
    /// `None` for the creation write, otherwise the version read before mutating
    pub expected_version: Option<i64>,
    pub snapshot: Snapshot<T::Content>,
}

impl<T: Versioned> VersionedWrite<T> {
    pub fn is_insert(&self) -> bool {
        self.expected_version.is_none()
    }
}

/// Store-level union of everything a batch can hold
#[derive(Debug, Clone)]
pub enum StagedWrite {
    Tender(VersionedWrite<Tender>),
    Bid(VersionedWrite<Bid>),
    Feedback(Feedback),
}

impl StagedWrite {
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self {
            StagedWrite::Tender(_) => Some(EntityKind::Tender),
            StagedWrite::Bid(_) => Some(EntityKind::Bid),
            StagedWrite::Feedback(_) => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct MutationBatch {
    writes: Vec<StagedWrite>,
}

impl MutationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the creation of a fresh entity together with its first snapshot
    pub fn stage_insert<T: Versioned>(&mut self, entity: &T) -> Result<()> {
        if entity.version() != 1 {
            return Err(ProcurementError::Internal(format!(
                "{} {} must start at version 1, got {}",
                T::KIND,
                entity.id(),
                entity.version()
            )));
        }

        self.writes.push(T::into_staged(VersionedWrite {
            entity: entity.clone(),
            expected_version: None,
            snapshot: Snapshot::capture(entity),
        }));
        Ok(())
    }

    /// Run `mutator`, advance the version by one and stage the live row plus
    /// a snapshot of the post-mutation state.
    pub fn stage_mutation<T, F>(&mut self, entity: &mut T, mutator: F)
    where
        T: Versioned,
        F: FnOnce(&mut T),
    {
        let expected_version = entity.version();
        mutator(entity);
        entity.set_version(expected_version + 1);

        self.writes.push(T::into_staged(VersionedWrite {
            entity: entity.clone(),
            expected_version: Some(expected_version),
            snapshot: Snapshot::capture(entity),
        }));
    }

    pub fn stage_feedback(&mut self, feedback: Feedback) {
        self.writes.push(StagedWrite::Feedback(feedback));
    }

    pub fn writes(&self) -> &[StagedWrite] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<StagedWrite> {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}
