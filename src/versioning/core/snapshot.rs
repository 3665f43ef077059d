use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::versioned::Versioned;

// ============================================================================
// Snapshot - Immutable Version Record
// ============================================================================
//
// One snapshot per version ever reached by an entity. Snapshots are keyed by
// (entity_id, version) and never updated after insertion.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Snapshot<C> {
    // Row identity
    pub snapshot_id: Uuid,
    pub entity_id: Uuid,
    pub version: i64,

    // Ownership at the time of capture
    pub organization_id: Uuid,
    pub creator_username: String,

    // Restorable content
    pub content: C,

    pub created_at: DateTime<Utc>,
}

impl<C> Snapshot<C> {
    /// Capture the entity's current state, tagged with its current version
    pub fn capture<T>(entity: &T) -> Self
    where
        T: Versioned<Content = C>,
    {
        Self {
            snapshot_id: Uuid::now_v7(),
            entity_id: entity.id(),
            version: entity.version(),
            organization_id: entity.organization_id(),
            creator_username: entity.creator_username().to_string(),
            content: entity.content(),
            created_at: Utc::now(),
        }
    }
}
