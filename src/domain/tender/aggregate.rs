use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::versioning::{EntityKind, StagedWrite, Versioned, VersionedWrite};

use super::value_objects::{ServiceType, TenderStatus};

// ============================================================================
// Tender Aggregate
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tender {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub service_type: ServiceType,
    pub status: TenderStatus,

    // Fixed at creation
    pub organization_id: Uuid,
    pub creator_username: String,

    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The restorable part of a tender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenderContent {
    pub name: String,
    pub description: String,
    pub service_type: ServiceType,
    pub status: TenderStatus,
}

/// Field-level change; `None` leaves the field as it is
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenderPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub service_type: Option<ServiceType>,
    pub status: Option<TenderStatus>,
}

impl Tender {
    pub fn new(
        name: String,
        description: String,
        service_type: ServiceType,
        organization_id: Uuid,
        creator_username: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            service_type,
            status: TenderStatus::Created,
            organization_id,
            creator_username,
            version: 1,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    pub fn apply_patch(&mut self, patch: TenderPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(service_type) = patch.service_type {
            self.service_type = service_type;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == TenderStatus::Published
    }
}

impl Versioned for Tender {
    type Content = TenderContent;

    const KIND: EntityKind = EntityKind::Tender;

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

    fn content(&self) -> TenderContent {
        TenderContent {
            name: self.name.clone(),
            description: self.description.clone(),
            service_type: self.service_type,
            status: self.status,
        }
    }

    fn restore(&mut self, content: &TenderContent) {
        self.name = content.name.clone();
        self.description = content.description.clone();
        self.service_type = content.service_type;
        self.status = content.status;
    }

    fn into_staged(write: VersionedWrite<Self>) -> StagedWrite {
        StagedWrite::Tender(write)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
