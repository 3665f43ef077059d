use std::sync::Arc;

use uuid::Uuid;

use crate::domain::authorization::AuthorizationResolver;
use crate::domain::page::Page;
use crate::error::{ProcurementError, Result};
use crate::storage::TenderRepository;
use crate::versioning::EntityKind;

use super::value_objects::{ServiceType, TenderStatus};
use super::views::TenderView;

// ============================================================================
// Tender Queries - read-only use cases
// ============================================================================

pub struct TenderQueries {
    authz: Arc<AuthorizationResolver>,
    tenders: Arc<dyn TenderRepository>,
}

impl TenderQueries {
    pub fn new(authz: Arc<AuthorizationResolver>, tenders: Arc<dyn TenderRepository>) -> Self {
        Self { authz, tenders }
    }

    /// Published tenders; an empty filter means every service type
    pub async fn list_tenders(&self, service_types: &[String], page: Page) -> Result<Vec<TenderView>> {
        let service_types = service_types
            .iter()
            .map(|s| s.parse::<ServiceType>())
            .collect::<Result<Vec<_>>>()?;

        let tenders = self.tenders.list_published(&service_types, page).await?;
        tracing::debug!(count = tenders.len(), "Listed published tenders");
        Ok(tenders.iter().map(TenderView::from).collect())
    }

    pub async fn list_my_tenders(&self, username: &str, page: Page) -> Result<Vec<TenderView>> {
        let employee = self.authz.identity().resolve_employee(username).await?;
        let tenders = self.tenders.list_by_creator(&employee.username, page).await?;
        Ok(tenders.iter().map(TenderView::from).collect())
    }

    pub async fn tender_status(&self, tender_id: Uuid, username: &str) -> Result<TenderStatus> {
        let actor = self.authz.resolve_actor(username).await?;
        let tender = self
            .tenders
            .find_live(tender_id)
            .await?
            .ok_or_else(|| ProcurementError::not_found(EntityKind::Tender, tender_id))?;
        self.authz.authorize_mutation(&actor, &tender)?;
        Ok(tender.status)
    }
}
