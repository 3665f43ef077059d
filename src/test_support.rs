// ============================================================================
// Test fixture
// ============================================================================
//
// Three organizations with one member each, plus an employee who belongs
// to none, on a fresh in-memory store.
//
// ============================================================================

use std::sync::Arc;

use uuid::Uuid;

use crate::app::Procurement;
use crate::domain::authorization::{Actor, AuthorizationResolver};
use crate::domain::bid::{BidCommand, BidView};
use crate::domain::identity::{Employee, Organization, OrganizationKind};
use crate::domain::tender::{TenderCommand, TenderView};
use crate::metrics::Metrics;
use crate::storage::InMemoryStore;
use crate::versioning::VersionedStore;

pub(crate) struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub store_handle: Arc<VersionedStore>,
    pub metrics: Arc<Metrics>,
    pub authz: Arc<AuthorizationResolver>,
    pub app: Procurement,
    pub o1: Actor,
    pub o2: Actor,
    pub o3: Actor,
    pub loner: Employee,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        let app = Procurement::in_memory(store.clone(), metrics.clone());

        let o1 = Self::seed_member(&store, &app, "o1_employee", OrganizationKind::LLC).await;
        let o2 = Self::seed_member(&store, &app, "o2_employee", OrganizationKind::IE).await;
        let o3 = Self::seed_member(&store, &app, "o3_employee", OrganizationKind::JSC).await;

        let loner = Employee::new("loner");
        store.insert_employee(loner.clone()).await;

        Self {
            store_handle: app.versioned_store().clone(),
            authz: app.authz().clone(),
            store,
            metrics,
            app,
            o1,
            o2,
            o3,
            loner,
        }
    }

    async fn seed_member(
        store: &InMemoryStore,
        app: &Procurement,
        username: &str,
        kind: OrganizationKind,
    ) -> Actor {
        let organization = Organization::new(format!("{} org", username), kind);
        let employee = Employee::new(username);
        store.insert_organization(organization.clone()).await;
        store.insert_employee(employee.clone()).await;
        app.identity()
            .add_membership(organization.id, employee.id)
            .await
            .unwrap();

        Actor {
            employee,
            organization_id: organization.id,
        }
    }

    pub async fn create_tender(&self, owner: &Actor, name: &str) -> TenderView {
        self.app
            .tenders
            .handle(TenderCommand::CreateTender {
                name: name.to_string(),
                description: format!("{} description", name),
                service_type: "Construction".to_string(),
                organization_id: owner.organization_id,
                creator_username: owner.username().to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn publish_tender(&self, owner: &Actor, tender_id: Uuid) -> TenderView {
        self.app
            .tenders
            .handle(TenderCommand::SetTenderStatus {
                tender_id,
                username: owner.username().to_string(),
                status: "Published".to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn published_tender(&self, owner: &Actor, name: &str) -> TenderView {
        let tender = self.create_tender(owner, name).await;
        self.publish_tender(owner, tender.id).await
    }

    pub async fn create_bid(&self, bidder: &Actor, tender_id: Uuid, name: &str) -> BidView {
        self.app
            .bids
            .handle(BidCommand::CreateBid {
                name: name.to_string(),
                description: format!("{} description", name),
                tender_id,
                author_type: "Organization".to_string(),
                author_id: bidder.employee.id,
            })
            .await
            .unwrap()
    }

    pub async fn publish_bid(&self, bidder: &Actor, bid_id: Uuid) -> BidView {
        self.app
            .bids
            .handle(BidCommand::SetBidStatus {
                bid_id,
                username: bidder.username().to_string(),
                status: "Published".to_string(),
            })
            .await
            .unwrap()
    }
}
