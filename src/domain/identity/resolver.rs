use std::sync::Arc;

use uuid::Uuid;

use crate::error::{ProcurementError, Result};
use crate::storage::IdentityRepository;

use super::entities::{Employee, Membership};

// ============================================================================
// Identity Resolver
// ============================================================================
//
// username -> employee, employee -> owning organization.
// Usernames are re-validated on every request.
//
// ============================================================================

#[derive(Clone)]
pub struct IdentityResolver {
    repo: Arc<dyn IdentityRepository>,
}

impl IdentityResolver {
    pub fn new(repo: Arc<dyn IdentityRepository>) -> Self {
        Self { repo }
    }

    pub async fn resolve_employee(&self, username: &str) -> Result<Employee> {
        if username.trim().is_empty() {
            return Err(ProcurementError::ActorNotFound(username.to_string()));
        }

        self.repo
            .find_employee_by_username(username)
            .await?
            .ok_or_else(|| {
                tracing::debug!(username = %username, "Unknown employee");
                ProcurementError::ActorNotFound(username.to_string())
            })
    }

    pub async fn resolve_employee_by_id(&self, id: Uuid) -> Result<Employee> {
        if id.is_nil() {
            return Err(ProcurementError::ActorNotFound(id.to_string()));
        }

        self.repo
            .find_employee_by_id(id)
            .await?
            .ok_or_else(|| ProcurementError::ActorNotFound(id.to_string()))
    }

    /// The single organization the employee acts for
    pub async fn resolve_organization(&self, employee_id: Uuid) -> Result<Uuid> {
        let memberships = self.repo.find_memberships(employee_id).await?;

        match memberships.as_slice() {
            [] => Err(ProcurementError::ActorNotFound(employee_id.to_string())),
            [membership] => Ok(membership.organization_id),
            many => {
                tracing::error!(
                    employee_id = %employee_id,
                    memberships = many.len(),
                    "Employee has more than one membership"
                );
                Err(ProcurementError::Internal(format!(
                    "employee {} has {} memberships",
                    employee_id,
                    many.len()
                )))
            }
        }
    }

    pub async fn add_membership(&self, organization_id: Uuid, employee_id: Uuid) -> Result<Membership> {
        let membership = Membership::new(organization_id, employee_id);
        self.repo.add_membership(membership.clone()).await?;

        tracing::info!(
            organization_id = %organization_id,
            employee_id = %employee_id,
            "Membership added"
        );
        Ok(membership)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::InMemoryStore;

    async fn setup() -> (Arc<InMemoryStore>, IdentityResolver, Employee) {
        let store = Arc::new(InMemoryStore::new());
        let employee = Employee::new("alice");
        store.insert_employee(employee.clone()).await;
        let resolver = IdentityResolver::new(store.clone());
        (store, resolver, employee)
    }

    #[tokio::test]
    async fn test_resolve_employee() {
        let (_store, resolver, employee) = setup().await;

        let found = resolver.resolve_employee("alice").await.unwrap();
        assert_eq!(found.id, employee.id);

        let by_id = resolver.resolve_employee_by_id(employee.id).await.unwrap();
        assert_eq!(by_id.username, "alice");
    }

    #[tokio::test]
    async fn test_empty_or_unknown_username_is_actor_not_found() {
        let (_store, resolver, _employee) = setup().await;

        for username in ["", "   ", "mallory"] {
            let err = resolver.resolve_employee(username).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ActorNotFound);
        }

        let err = resolver.resolve_employee_by_id(Uuid::nil()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ActorNotFound);
    }

    #[tokio::test]
    async fn test_soft_deleted_employee_is_not_resolved() {
        let store = Arc::new(InMemoryStore::new());
        let mut employee = Employee::new("bob");
        employee.deleted_at = Some(chrono::Utc::now());
        store.insert_employee(employee).await;

        let resolver = IdentityResolver::new(store);
        let err = resolver.resolve_employee("bob").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ActorNotFound);
    }

    #[tokio::test]
    async fn test_organization_requires_membership() {
        let (_store, resolver, employee) = setup().await;

        let err = resolver.resolve_organization(employee.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ActorNotFound);

        let org_id = Uuid::new_v4();
        resolver.add_membership(org_id, employee.id).await.unwrap();
        assert_eq!(resolver.resolve_organization(employee.id).await.unwrap(), org_id);
    }

    #[tokio::test]
    async fn test_second_membership_is_rejected() {
        let (_store, resolver, employee) = setup().await;
        let first_org = Uuid::new_v4();
        resolver.add_membership(first_org, employee.id).await.unwrap();

        let err = resolver
            .add_membership(Uuid::new_v4(), employee.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MembershipExists);
        assert_eq!(resolver.resolve_organization(employee.id).await.unwrap(), first_org);
    }

    #[tokio::test]
    async fn test_duplicate_membership_rows_are_internal() {
        let (store, resolver, employee) = setup().await;
        store.insert_membership_unchecked(Membership::new(Uuid::new_v4(), employee.id)).await;
        store.insert_membership_unchecked(Membership::new(Uuid::new_v4(), employee.id)).await;

        let err = resolver.resolve_organization(employee.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
