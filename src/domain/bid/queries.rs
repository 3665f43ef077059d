use std::sync::Arc;

use uuid::Uuid;

use crate::domain::authorization::AuthorizationResolver;
use crate::domain::page::Page;
use crate::domain::tender::Tender;
use crate::error::{ProcurementError, Result};
use crate::storage::{BidRepository, TenderRepository};
use crate::versioning::EntityKind;

use super::value_objects::BidStatus;
use super::views::{BidView, ReviewView};

// ============================================================================
// Bid Queries - read-only use cases
// ============================================================================

pub struct BidQueries {
    authz: Arc<AuthorizationResolver>,
    bids: Arc<dyn BidRepository>,
    tenders: Arc<dyn TenderRepository>,
}

impl BidQueries {
    pub fn new(
        authz: Arc<AuthorizationResolver>,
        bids: Arc<dyn BidRepository>,
        tenders: Arc<dyn TenderRepository>,
    ) -> Self {
        Self { authz, bids, tenders }
    }

    /// Published bids on a tender, visible to the tender's organization
    pub async fn list_bids_for_tender(&self, tender_id: Uuid, username: &str, page: Page) -> Result<Vec<BidView>> {
        let actor = self.authz.resolve_actor(username).await?;
        let tender = self.load_tender(tender_id).await?;
        self.authz.authorize_mutation(&actor, &tender)?;

        let bids = self.bids.list_published_for_tender(tender_id, page).await?;
        tracing::debug!(tender_id = %tender_id, count = bids.len(), "Listed bids for tender");
        Ok(bids.iter().map(BidView::from).collect())
    }

    pub async fn list_my_bids(&self, username: &str, page: Page) -> Result<Vec<BidView>> {
        let employee = self.authz.identity().resolve_employee(username).await?;
        let bids = self.bids.list_by_creator(&employee.username, page).await?;
        Ok(bids.iter().map(BidView::from).collect())
    }

    /// Feedback left on `author_username`'s bids for the tender
    pub async fn list_reviews(
        &self,
        tender_id: Uuid,
        author_username: &str,
        requester_username: &str,
        page: Page,
    ) -> Result<Vec<ReviewView>> {
        let requester = self.authz.resolve_actor(requester_username).await?;
        let author = self.authz.identity().resolve_employee(author_username).await?;
        let tender = self.load_tender(tender_id).await?;
        self.authz.authorize_review(&requester, &tender)?;

        let feedback = self.bids.list_feedback(tender_id, &author.username, page).await?;
        Ok(feedback.iter().map(ReviewView::from).collect())
    }

    /// Readable by the bidder's organization and by the tender's organization
    pub async fn bid_status(&self, bid_id: Uuid, username: &str) -> Result<BidStatus> {
        let actor = self.authz.resolve_actor(username).await?;
        let bid = self
            .bids
            .find_live(bid_id)
            .await?
            .ok_or_else(|| ProcurementError::not_found(EntityKind::Bid, bid_id))?;

        if actor.belongs_to(bid.organization_id) {
            return Ok(bid.status);
        }

        let tender = self.load_tender(bid.tender_id).await?;
        self.authz
            .authorize_owner(&actor, EntityKind::Bid, bid.id, tender.organization_id)?;
        Ok(bid.status)
    }

    async fn load_tender(&self, tender_id: Uuid) -> Result<Tender> {
        self.tenders
            .find_live(tender_id)
            .await?
            .ok_or_else(|| ProcurementError::not_found(EntityKind::Tender, tender_id))
    }
}
