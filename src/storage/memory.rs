use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::bid::{Bid, BidContent, BidStatus, Feedback};
use crate::domain::identity::{Employee, Membership, Organization};
use crate::domain::page::Page;
use crate::domain::tender::{ServiceType, Tender, TenderContent, TenderStatus};
use crate::error::{ProcurementError, Result};
use crate::versioning::{MutationBatch, Snapshot, StagedWrite, Versioned, VersionedWrite};

use super::{BidRepository, IdentityRepository, MutationStore, TenderRepository, VersionedRepository};

// ============================================================================
// In-Memory Store
// ============================================================================
//
// Same contract as the Postgres store. A batch is validated completely
// under the write lock before any row is touched, so a failed commit leaves
// no trace.
//
// ============================================================================

type SnapshotTable<C> = BTreeMap<(Uuid, i64), Snapshot<C>>;

#[derive(Default)]
struct Tables {
    employees: HashMap<Uuid, Employee>,
    organizations: HashMap<Uuid, Organization>,
    memberships: Vec<Membership>,
    tenders: HashMap<Uuid, Tender>,
    tender_snapshots: SnapshotTable<TenderContent>,
    bids: HashMap<Uuid, Bid>,
    bid_snapshots: SnapshotTable<BidContent>,
    feedback: Vec<Feedback>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_employee(&self, employee: Employee) {
        let mut tables = self.tables.write().await;
        tables.employees.insert(employee.id, employee);
    }

    pub async fn insert_organization(&self, organization: Organization) {
        let mut tables = self.tables.write().await;
        tables.organizations.insert(organization.id, organization);
    }

    /// Hide a tender from every lookup; its history stays
    pub async fn soft_delete_tender(&self, id: Uuid) -> bool {
        let mut tables = self.tables.write().await;
        match tables.tenders.get_mut(&id) {
            Some(tender) => {
                tender.deleted_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    pub async fn soft_delete_bid(&self, id: Uuid) -> bool {
        let mut tables = self.tables.write().await;
        match tables.bids.get_mut(&id) {
            Some(bid) => {
                bid.deleted_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    /// Bypasses the one-membership rule to simulate a corrupted table
    #[cfg(test)]
    pub(crate) async fn insert_membership_unchecked(&self, membership: Membership) {
        self.tables.write().await.memberships.push(membership);
    }
}

fn live<T: Versioned>(row: Option<&T>) -> Option<T> {
    row.filter(|r| r.is_live()).cloned()
}

fn check_write<T: Versioned>(
    rows: &HashMap<Uuid, T>,
    snapshots: &SnapshotTable<T::Content>,
    write: &VersionedWrite<T>,
) -> Result<()> {
    let id = write.entity.id();
    let current = rows.get(&id).filter(|r| r.is_live()).map(|r| r.version());

    let conflict = match write.expected_version {
        None => rows.contains_key(&id).then_some(0),
        Some(expected) => (current != Some(expected)).then_some(expected),
    };
    if let Some(expected) = conflict {
        return Err(ProcurementError::Conflict {
            kind: T::KIND,
            id,
            expected,
            actual: current,
        });
    }

    if snapshots.contains_key(&(id, write.snapshot.version)) {
        return Err(ProcurementError::Conflict {
            kind: T::KIND,
            id,
            expected: write.snapshot.version - 1,
            actual: current,
        });
    }
    Ok(())
}

fn apply_write<T: Versioned>(
    rows: &mut HashMap<Uuid, T>,
    snapshots: &mut SnapshotTable<T::Content>,
    write: VersionedWrite<T>,
) {
    let id = write.entity.id();
    snapshots.insert((id, write.snapshot.version), write.snapshot);
    rows.insert(id, write.entity);
}

fn sorted_page<T, K: Ord>(mut rows: Vec<T>, page: Page, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by_key(key);
    page.slice(rows)
}

fn history<C: Clone>(snapshots: &SnapshotTable<C>, id: Uuid) -> Vec<Snapshot<C>> {
    snapshots
        .range((id, i64::MIN)..=(id, i64::MAX))
        .map(|(_, s)| s.clone())
        .collect()
}

#[async_trait]
impl IdentityRepository for InMemoryStore {
    async fn find_employee_by_username(&self, username: &str) -> Result<Option<Employee>> {
        let tables = self.tables.read().await;
        Ok(tables
            .employees
            .values()
            .find(|e| e.username == username && e.deleted_at.is_none())
            .cloned())
    }

    async fn find_employee_by_id(&self, id: Uuid) -> Result<Option<Employee>> {
        let tables = self.tables.read().await;
        Ok(tables
            .employees
            .get(&id)
            .filter(|e| e.deleted_at.is_none())
            .cloned())
    }

    async fn find_memberships(&self, employee_id: Uuid) -> Result<Vec<Membership>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|m| m.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn add_membership(&self, membership: Membership) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables
            .memberships
            .iter()
            .any(|m| m.employee_id == membership.employee_id)
        {
            return Err(ProcurementError::MembershipExists(membership.employee_id));
        }
        tables.memberships.push(membership);
        Ok(())
    }
}

#[async_trait]
impl VersionedRepository<Tender> for InMemoryStore {
    async fn find_live(&self, id: Uuid) -> Result<Option<Tender>> {
        let tables = self.tables.read().await;
        Ok(live(tables.tenders.get(&id)))
    }

    async fn find_snapshot(&self, id: Uuid, version: i64) -> Result<Option<Snapshot<TenderContent>>> {
        let tables = self.tables.read().await;
        Ok(tables.tender_snapshots.get(&(id, version)).cloned())
    }

    async fn list_snapshots(&self, id: Uuid) -> Result<Vec<Snapshot<TenderContent>>> {
        let tables = self.tables.read().await;
        Ok(history(&tables.tender_snapshots, id))
    }
}

#[async_trait]
impl TenderRepository for InMemoryStore {
    async fn list_published(&self, service_types: &[ServiceType], page: Page) -> Result<Vec<Tender>> {
        let tables = self.tables.read().await;
        let rows = tables
            .tenders
            .values()
            .filter(|t| t.is_live() && t.status == TenderStatus::Published)
            .filter(|t| service_types.is_empty() || service_types.contains(&t.service_type))
            .cloned()
            .collect();
        Ok(sorted_page(rows, page, |t: &Tender| (t.name.clone(), t.id)))
    }

    async fn list_by_creator(&self, username: &str, page: Page) -> Result<Vec<Tender>> {
        let tables = self.tables.read().await;
        let rows = tables
            .tenders
            .values()
            .filter(|t| t.is_live() && t.creator_username == username)
            .cloned()
            .collect();
        Ok(sorted_page(rows, page, |t: &Tender| (t.name.clone(), t.id)))
    }
}

#[async_trait]
impl VersionedRepository<Bid> for InMemoryStore {
    async fn find_live(&self, id: Uuid) -> Result<Option<Bid>> {
        let tables = self.tables.read().await;
        Ok(live(tables.bids.get(&id)))
    }

    async fn find_snapshot(&self, id: Uuid, version: i64) -> Result<Option<Snapshot<BidContent>>> {
        let tables = self.tables.read().await;
        Ok(tables.bid_snapshots.get(&(id, version)).cloned())
    }

    async fn list_snapshots(&self, id: Uuid) -> Result<Vec<Snapshot<BidContent>>> {
        let tables = self.tables.read().await;
        Ok(history(&tables.bid_snapshots, id))
    }
}

#[async_trait]
impl BidRepository for InMemoryStore {
    async fn find_published(&self, id: Uuid) -> Result<Option<Bid>> {
        let tables = self.tables.read().await;
        Ok(live(tables.bids.get(&id)).filter(|b| b.status == BidStatus::Published))
    }

    async fn list_published_for_tender(&self, tender_id: Uuid, page: Page) -> Result<Vec<Bid>> {
        let tables = self.tables.read().await;
        let rows = tables
            .bids
            .values()
            .filter(|b| b.is_live() && b.tender_id == tender_id && b.status == BidStatus::Published)
            .cloned()
            .collect();
        Ok(sorted_page(rows, page, |b: &Bid| (b.name.clone(), b.id)))
    }

    async fn list_by_creator(&self, username: &str, page: Page) -> Result<Vec<Bid>> {
        let tables = self.tables.read().await;
        let rows = tables
            .bids
            .values()
            .filter(|b| b.is_live() && b.creator_username == username)
            .cloned()
            .collect();
        Ok(sorted_page(rows, page, |b: &Bid| (b.name.clone(), b.id)))
    }

    async fn list_feedback(&self, tender_id: Uuid, author_username: &str, page: Page) -> Result<Vec<Feedback>> {
        let tables = self.tables.read().await;
        let rows = tables
            .feedback
            .iter()
            .filter(|f| {
                tables.bids.get(&f.bid_id).is_some_and(|b| {
                    b.is_live() && b.tender_id == tender_id && b.creator_username == author_username
                })
            })
            .cloned()
            .collect();
        Ok(sorted_page(rows, page, |f: &Feedback| (f.created_at, f.id)))
    }
}

#[async_trait]
impl MutationStore for InMemoryStore {
    async fn commit(&self, batch: MutationBatch) -> Result<()> {
        let mut tables = self.tables.write().await;

        for write in batch.writes() {
            match write {
                StagedWrite::Tender(w) => check_write(&tables.tenders, &tables.tender_snapshots, w)?,
                StagedWrite::Bid(w) => check_write(&tables.bids, &tables.bid_snapshots, w)?,
                StagedWrite::Feedback(f) => {
                    if !tables.bids.contains_key(&f.bid_id) {
                        return Err(ProcurementError::Internal(format!(
                            "feedback {} references unknown bid {}",
                            f.id, f.bid_id
                        )));
                    }
                }
            }
        }

        let tables = &mut *tables;
        for write in batch.into_writes() {
            match write {
                StagedWrite::Tender(w) => apply_write(&mut tables.tenders, &mut tables.tender_snapshots, w),
                StagedWrite::Bid(w) => apply_write(&mut tables.bids, &mut tables.bid_snapshots, w),
                StagedWrite::Feedback(f) => tables.feedback.push(f),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bid::AuthorType;
    use crate::error::ErrorKind;

    fn tender(name: &str, status: TenderStatus) -> Tender {
        let mut tender = Tender::new(
            name.to_string(),
            String::new(),
            ServiceType::Construction,
            Uuid::new_v4(),
            "alice".to_string(),
        );
        tender.status = status;
        tender
    }

    async fn insert<T: Versioned>(store: &InMemoryStore, entity: &T) {
        let mut batch = MutationBatch::new();
        batch.stage_insert(entity).unwrap();
        store.commit(batch).await.unwrap();
    }

    #[tokio::test]
    async fn test_soft_deleted_tender_is_hidden_but_history_stays() {
        let store = InMemoryStore::new();
        let t = tender("Road", TenderStatus::Published);
        insert(&store, &t).await;

        assert!(store.soft_delete_tender(t.id).await);

        let found = VersionedRepository::<Tender>::find_live(&store, t.id).await.unwrap();
        assert!(found.is_none());
        let listed = store.list_published(&[], Page::default()).await.unwrap();
        assert!(listed.is_empty());
        let history = VersionedRepository::<Tender>::list_snapshots(&store, t.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_no_partial_writes() {
        let store = InMemoryStore::new();
        let mut t = tender("Road", TenderStatus::Published);
        insert(&store, &t).await;

        let mut bid = Bid::new(
            "Offer".to_string(),
            String::new(),
            t.id,
            AuthorType::User,
            Uuid::new_v4(),
            Uuid::new_v4(),
            "bob".to_string(),
        );
        insert(&store, &bid).await;

        // Bid is fresh, tender copy is stale
        let mut stale = t.clone();
        let mut bump = MutationBatch::new();
        bump.stage_mutation(&mut t, |_| {});
        store.commit(bump).await.unwrap();

        let mut batch = MutationBatch::new();
        batch.stage_mutation(&mut bid, |b| b.status = BidStatus::Approved);
        batch.stage_mutation(&mut stale, |t| t.status = TenderStatus::Closed);
        let err = store.commit(batch).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let live_bid = VersionedRepository::<Bid>::find_live(&store, bid.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live_bid.version, 1);
        assert_eq!(live_bid.status, BidStatus::Created);
        let bid_history = VersionedRepository::<Bid>::list_snapshots(&store, bid.id).await.unwrap();
        assert_eq!(bid_history.len(), 1);
    }

    #[tokio::test]
    async fn test_soft_deleted_bid_is_not_published() {
        let store = InMemoryStore::new();
        let mut bid = Bid::new(
            "Offer".to_string(),
            String::new(),
            Uuid::new_v4(),
            AuthorType::User,
            Uuid::new_v4(),
            Uuid::new_v4(),
            "bob".to_string(),
        );
        bid.status = BidStatus::Published;
        insert(&store, &bid).await;
        assert!(store.find_published(bid.id).await.unwrap().is_some());

        assert!(store.soft_delete_bid(bid.id).await);
        assert!(store.find_published(bid.id).await.unwrap().is_none());
        assert!(!store.soft_delete_bid(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_double_insert_is_conflict() {
        let store = InMemoryStore::new();
        let t = tender("Road", TenderStatus::Created);
        insert(&store, &t).await;

        let mut batch = MutationBatch::new();
        batch.stage_insert(&t).unwrap();
        let err = store.commit(batch).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_published_listing_is_ordered_by_name() {
        let store = InMemoryStore::new();
        for name in ["delta", "alpha", "charlie", "bravo"] {
            insert(&store, &tender(name, TenderStatus::Published)).await;
        }
        insert(&store, &tender("aaa-draft", TenderStatus::Created)).await;

        let listed = store
            .list_published(&[], Page::new(Some(3), None))
            .await
            .unwrap();
        let names: Vec<&str> = listed.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
    }
}
