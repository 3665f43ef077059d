use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::versioning::{EntityKind, StagedWrite, Versioned, VersionedWrite};

use super::value_objects::{AuthorType, BidStatus};

// ============================================================================
// Bid Aggregate
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: BidStatus,
    pub tender_id: Uuid,
    pub author_type: AuthorType,
    pub author_id: Uuid,

    // Fixed at creation
    pub organization_id: Uuid,
    pub creator_username: String,

    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The restorable part of a bid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidContent {
    pub name: String,
    pub description: String,
    pub status: BidStatus,
    pub tender_id: Uuid,
    pub author_type: AuthorType,
}

/// Field-level change; `None` leaves the field as it is
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BidPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<BidStatus>,
    pub tender_id: Option<Uuid>,
}

/// Immutable comment from the tender's organization on a bid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub bid_id: Uuid,
    pub text: String,
    pub creator_username: String,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(bid_id: Uuid, text: String, creator_username: String, organization_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            bid_id,
            text,
            creator_username,
            organization_id,
            created_at: Utc::now(),
        }
    }
}

impl Bid {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        description: String,
        tender_id: Uuid,
        author_type: AuthorType,
        author_id: Uuid,
        organization_id: Uuid,
        creator_username: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            status: BidStatus::Created,
            tender_id,
            author_type,
            author_id,
            organization_id,
            creator_username,
            version: 1,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    pub fn apply_patch(&mut self, patch: BidPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(tender_id) = patch.tender_id {
            self.tender_id = tender_id;
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == BidStatus::Published
    }
}

impl Versioned for Bid {
    type Content = BidContent;

    const KIND: EntityKind = EntityKind::Bid;

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn creator_username(&self) -> &str {
        &self.creator_username
    }

    fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    fn content(&self) -> BidContent {
        BidContent {
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status,
            tender_id: self.tender_id,
            author_type: self.author_type,
        }
    }

    fn restore(&mut self, content: &BidContent) {
        self.name = content.name.clone();
        self.description = content.description.clone();
        self.status = content.status;
        self.tender_id = content.tender_id;
        self.author_type = content.author_type;
    }

    fn into_staged(write: VersionedWrite<Self>) -> StagedWrite {
        StagedWrite::Bid(write)
    }
}
