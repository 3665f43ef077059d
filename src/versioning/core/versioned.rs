use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::versioning::store::{StagedWrite, VersionedWrite};

// ============================================================================
// Versioned Entity Pattern
// ============================================================================
//
// Key Principles:
// 1. The live row is the current state; history is a list of snapshots
// 2. Every mutation advances the version by exactly one
// 3. The snapshot written with a mutation carries the post-mutation content
// 4. Content excludes identity (id, owner, creator) and the version itself
//
// This is the GENERIC trait that works for ANY versioned aggregate.
//
// ============================================================================

/// Kind tag for versioned aggregates; used in errors, logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Tender,
    Bid,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Tender => "Tender",
            EntityKind::Bid => "Bid",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic versioned aggregate - tenders and bids implement this
///
/// Type Parameters:
/// - `Content`: the restorable field set captured by every snapshot
pub trait Versioned: Clone + Send + Sync + 'static {
    type Content: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    const KIND: EntityKind;

    /// Get aggregate ID
    fn id(&self) -> Uuid;

    /// Get current version
    fn version(&self) -> i64;

    fn set_version(&mut self, version: i64);

    /// Organization that owns the entity; fixed at creation
    fn organization_id(&self) -> Uuid;

    fn creator_username(&self) -> &str;

    /// False once the entity is soft-deleted
    fn is_live(&self) -> bool;

    /// Copy of the current content fields
    fn content(&self) -> Self::Content;

    /// Overwrite every content field; identity and version are untouched
    fn restore(&mut self, content: &Self::Content);

    /// Wrap a staged write into the store-level union
    fn into_staged(write: VersionedWrite<Self>) -> StagedWrite;
}
