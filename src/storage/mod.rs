// ============================================================================
// Storage Ports
// ============================================================================
//
// Repository traits injected into the domain layer. Two implementations
// share the same contract:
// - `InMemoryStore`: tests and the demo binary
// - `PgStore`: Postgres via sqlx
//
// Reads never return soft-deleted rows. All writes to versioned entities go
// through `MutationStore::commit` so they land atomically.
//
// ============================================================================

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::bid::{Bid, Feedback};
use crate::domain::identity::{Employee, Membership};
use crate::domain::page::Page;
use crate::domain::tender::{ServiceType, Tender};
use crate::error::Result;
use crate::versioning::{MutationBatch, Snapshot, Versioned};

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn find_employee_by_username(&self, username: &str) -> Result<Option<Employee>>;

    async fn find_employee_by_id(&self, id: Uuid) -> Result<Option<Employee>>;

    /// Every membership row of the employee; more than one is an integrity fault
    async fn find_memberships(&self, employee_id: Uuid) -> Result<Vec<Membership>>;

    /// Fails with `MembershipExists` if the employee already has one
    async fn add_membership(&self, membership: Membership) -> Result<()>;
}

/// Read side shared by every versioned aggregate
#[async_trait]
pub trait VersionedRepository<T: Versioned>: Send + Sync {
    async fn find_live(&self, id: Uuid) -> Result<Option<T>>;

    async fn find_snapshot(&self, id: Uuid, version: i64) -> Result<Option<Snapshot<T::Content>>>;

    /// Full history ordered by version
    async fn list_snapshots(&self, id: Uuid) -> Result<Vec<Snapshot<T::Content>>>;
}

#[async_trait]
pub trait TenderRepository: VersionedRepository<Tender> {
    /// Published tenders, optionally restricted to the given service types
    async fn list_published(&self, service_types: &[ServiceType], page: Page) -> Result<Vec<Tender>>;

    async fn list_by_creator(&self, username: &str, page: Page) -> Result<Vec<Tender>>;
}

#[async_trait]
pub trait BidRepository: VersionedRepository<Bid> {
    /// The bid only if it is currently `Published`
    async fn find_published(&self, id: Uuid) -> Result<Option<Bid>>;

    async fn list_published_for_tender(&self, tender_id: Uuid, page: Page) -> Result<Vec<Bid>>;

    async fn list_by_creator(&self, username: &str, page: Page) -> Result<Vec<Bid>>;

    /// Feedback left on `author_username`'s bids for the tender, oldest first
    async fn list_feedback(
        &self,
        tender_id: Uuid,
        author_username: &str,
        page: Page,
    ) -> Result<Vec<Feedback>>;
}

#[async_trait]
pub trait MutationStore: Send + Sync {
    /// Apply every staged write or none of them.
    ///
    /// Each versioned write is a compare-and-swap on its expected version;
    /// the first mismatch aborts the whole batch with `Conflict`.
    async fn commit(&self, batch: MutationBatch) -> Result<()>;
}
