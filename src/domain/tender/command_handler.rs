use std::sync::Arc;

use uuid::Uuid;

use crate::domain::authorization::AuthorizationResolver;
use crate::domain::validation::{validate_description, validate_name};
use crate::error::{ProcurementError, Result};
use crate::storage::TenderRepository;
use crate::versioning::{EntityKind, RollbackEngine, VersionedStore};

use super::aggregate::{Tender, TenderPatch};
use super::commands::TenderCommand;
use super::value_objects::{ServiceType, TenderStatus};
use super::views::TenderView;

// ============================================================================
// Tender Command Handler
// ============================================================================
//
// Orchestrates: Command → Identity → Authorization → Aggregate → Versioned Store
//
// ============================================================================

pub struct TenderCommandHandler {
    authz: Arc<AuthorizationResolver>,
    tenders: Arc<dyn TenderRepository>,
    store: Arc<VersionedStore>,
    rollbacks: RollbackEngine,
}

impl TenderCommandHandler {
    pub fn new(
        authz: Arc<AuthorizationResolver>,
        tenders: Arc<dyn TenderRepository>,
        store: Arc<VersionedStore>,
    ) -> Self {
        let rollbacks = RollbackEngine::new(store.clone(), authz.clone());
        Self {
            authz,
            tenders,
            store,
            rollbacks,
        }
    }

    /// Handle a command and return the resulting tender state
    pub async fn handle(&self, command: TenderCommand) -> Result<TenderView> {
        match command {
            TenderCommand::CreateTender {
                name,
                description,
                service_type,
                organization_id,
                creator_username,
            } => {
                let service_type: ServiceType = service_type.parse()?;
                validate_name(&name)?;
                validate_description(&description)?;
                self.create(name, description, service_type, organization_id, &creator_username)
                    .await
            }
            TenderCommand::SetTenderStatus {
                tender_id,
                username,
                status,
            } => {
                let status: TenderStatus = status.parse()?;
                self.update(
                    tender_id,
                    &username,
                    TenderPatch {
                        status: Some(status),
                        ..Default::default()
                    },
                )
                .await
            }
            TenderCommand::PatchTender {
                tender_id,
                username,
                name,
                description,
                service_type,
                status,
            } => {
                let patch = TenderPatch {
                    service_type: service_type.map(|s| s.parse::<ServiceType>()).transpose()?,
                    status: status.map(|s| s.parse::<TenderStatus>()).transpose()?,
                    name,
                    description,
                };
                if let Some(name) = &patch.name {
                    validate_name(name)?;
                }
                if let Some(description) = &patch.description {
                    validate_description(description)?;
                }
                self.update(tender_id, &username, patch).await
            }
            TenderCommand::RollbackTender {
                tender_id,
                version,
                username,
            } => self.rollback(tender_id, version, &username).await,
        }
    }

    async fn create(
        &self,
        name: String,
        description: String,
        service_type: ServiceType,
        organization_id: Uuid,
        creator_username: &str,
    ) -> Result<TenderView> {
        let employee = self.authz.identity().resolve_employee(creator_username).await?;
        self.authz
            .authorize_membership(&employee, organization_id)
            .await?;

        let tender = Tender::new(
            name,
            description,
            service_type,
            organization_id,
            employee.username,
        );
        self.store.create(&tender).await?;

        tracing::info!(
            tender_id = %tender.id,
            organization_id = %organization_id,
            service_type = %service_type,
            "Tender created"
        );
        Ok(TenderView::from(&tender))
    }

    async fn update(&self, tender_id: Uuid, username: &str, patch: TenderPatch) -> Result<TenderView> {
        let actor = self.authz.resolve_actor(username).await?;
        let mut tender = self.load(tender_id).await?;
        self.authz.authorize_mutation(&actor, &tender)?;

        self.store
            .apply_mutation(&mut tender, |t| t.apply_patch(patch))
            .await?;

        tracing::info!(
            tender_id = %tender.id,
            version = tender.version,
            status = %tender.status,
            actor = %actor.username(),
            "Tender updated"
        );
        Ok(TenderView::from(&tender))
    }

    async fn rollback(&self, tender_id: Uuid, version: i64, username: &str) -> Result<TenderView> {
        let actor = self.authz.resolve_actor(username).await?;
        let tender: Tender = self
            .rollbacks
            .rollback(&*self.tenders, tender_id, version, &actor)
            .await?;
        Ok(TenderView::from(&tender))
    }

    async fn load(&self, tender_id: Uuid) -> Result<Tender> {
        self.tenders
            .find_live(tender_id)
            .await?
            .ok_or_else(|| ProcurementError::not_found(EntityKind::Tender, tender_id))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
