use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::aggregate::Tender;
use super::value_objects::{ServiceType, TenderStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub service_type: ServiceType,
    pub status: TenderStatus,
    pub organization_id: Uuid,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Tender> for TenderView {
    fn from(tender: &Tender) -> Self {
        Self {
            id: tender.id,
            name: tender.name.clone(),
            description: tender.description.clone(),
            service_type: tender.service_type,
            status: tender.status,
            organization_id: tender.organization_id,
            version: tender.version,
            created_at: tender.created_at,
        }
    }
}
