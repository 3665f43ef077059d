use std::sync::Arc;

use uuid::Uuid;

use crate::domain::identity::{Employee, IdentityResolver};
use crate::domain::tender::Tender;
use crate::error::{ProcurementError, Result};
use crate::metrics::Metrics;
use crate::versioning::{EntityKind, Snapshot, Versioned};

// ============================================================================
// Authorization Resolver
// ============================================================================
//
// Rule: an actor may mutate a tender or bid iff the actor's organization is
// the entity's owning organization. Decisions and feedback are judged
// against the TENDER's organization, not the bid's.
//
// ============================================================================

/// An employee together with the organization they act for
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub employee: Employee,
    pub organization_id: Uuid,
}

impl Actor {
    pub fn username(&self) -> &str {
        &self.employee.username
    }

    pub fn belongs_to(&self, organization_id: Uuid) -> bool {
        self.organization_id == organization_id
    }
}

pub struct AuthorizationResolver {
    identity: IdentityResolver,
    metrics: Arc<Metrics>,
}

impl AuthorizationResolver {
    pub fn new(identity: IdentityResolver, metrics: Arc<Metrics>) -> Self {
        Self { identity, metrics }
    }

    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    /// Employee plus organization; both missing cases are `ActorNotFound`
    pub async fn resolve_actor(&self, username: &str) -> Result<Actor> {
        let employee = self.identity.resolve_employee(username).await?;
        self.with_organization(employee).await
    }

    pub async fn resolve_actor_by_id(&self, employee_id: Uuid) -> Result<Actor> {
        let employee = self.identity.resolve_employee_by_id(employee_id).await?;
        self.with_organization(employee).await
    }

    async fn with_organization(&self, employee: Employee) -> Result<Actor> {
        let organization_id = self.identity.resolve_organization(employee.id).await?;
        Ok(Actor {
            employee,
            organization_id,
        })
    }

    /// Actor for decision and feedback: an employee without a membership
    /// cannot act for the tender's organization, so that case is `Forbidden`.
    pub async fn resolve_reviewer(&self, employee: Employee, kind: EntityKind, id: Uuid) -> Result<Actor> {
        match self.identity.resolve_organization(employee.id).await {
            Ok(organization_id) => Ok(Actor {
                employee,
                organization_id,
            }),
            Err(ProcurementError::ActorNotFound(_)) => Err(self.deny(&employee.username, kind, id)),
            Err(err) => Err(err),
        }
    }

    /// Tender creation: the creator must be a member of the named organization
    pub async fn authorize_membership(&self, employee: &Employee, organization_id: Uuid) -> Result<Uuid> {
        match self.identity.resolve_organization(employee.id).await {
            Ok(own) if own == organization_id => Ok(own),
            Ok(_) | Err(ProcurementError::ActorNotFound(_)) => {
                tracing::warn!(
                    username = %employee.username,
                    organization_id = %organization_id,
                    "Employee is not a member of the organization"
                );
                self.metrics.record_denial(EntityKind::Tender.as_str());
                Err(ProcurementError::Forbidden {
                    actor: employee.username.clone(),
                    kind: EntityKind::Tender,
                    id: organization_id,
                })
            }
            Err(err) => Err(err),
        }
    }

    pub fn authorize_owner(&self, actor: &Actor, kind: EntityKind, id: Uuid, owner: Uuid) -> Result<()> {
        if actor.belongs_to(owner) {
            Ok(())
        } else {
            Err(self.deny(actor.username(), kind, id))
        }
    }

    pub fn authorize_mutation<T: Versioned>(&self, actor: &Actor, entity: &T) -> Result<()> {
        self.authorize_owner(actor, T::KIND, entity.id(), entity.organization_id())
    }

    /// Rollback authority comes from the snapshot's organization
    pub fn authorize_snapshot<C>(&self, actor: &Actor, kind: EntityKind, snapshot: &Snapshot<C>) -> Result<()> {
        self.authorize_owner(actor, kind, snapshot.entity_id, snapshot.organization_id)
    }

    /// Bids may only be submitted against a published tender
    pub fn authorize_bid_submission(&self, actor: &Actor, tender: &Tender) -> Result<()> {
        if tender.is_published() {
            Ok(())
        } else {
            tracing::debug!(tender_id = %tender.id, status = %tender.status, "Tender not open for bids");
            Err(self.deny(actor.username(), EntityKind::Tender, tender.id))
        }
    }

    /// Decision, feedback and review reads belong to the tender's organization
    pub fn authorize_review(&self, actor: &Actor, tender: &Tender) -> Result<()> {
        self.authorize_owner(actor, EntityKind::Tender, tender.id, tender.organization_id)
    }

    fn deny(&self, actor: &str, kind: EntityKind, id: Uuid) -> ProcurementError {
        tracing::warn!(actor = %actor, kind = %kind, id = %id, "Access denied");
        self.metrics.record_denial(kind.as_str());
        ProcurementError::forbidden(actor, kind, id)
    }
}
