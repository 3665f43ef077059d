use std::sync::Arc;

use uuid::Uuid;

use crate::domain::authorization::AuthorizationResolver;
use crate::domain::tender::{Tender, TenderStatus};
use crate::domain::validation::{validate_description, validate_feedback, validate_name};
use crate::error::{ProcurementError, Result};
use crate::storage::{BidRepository, TenderRepository};
use crate::versioning::{EntityKind, MutationBatch, RollbackEngine, VersionedStore};

use super::aggregate::{Bid, BidPatch, Feedback};
use super::commands::BidCommand;
use super::value_objects::{AuthorType, BidStatus, Decision};
use super::views::BidView;

// ============================================================================
// Bid Command Handler
// ============================================================================
//
// Orchestrates: Command → Identity → Authorization → Aggregate → Versioned Store
//
// Decision and feedback touch more than one row and are committed as a
// single MutationBatch.
//
// ============================================================================

pub struct BidCommandHandler {
    authz: Arc<AuthorizationResolver>,
    bids: Arc<dyn BidRepository>,
    tenders: Arc<dyn TenderRepository>,
    store: Arc<VersionedStore>,
    rollbacks: RollbackEngine,
}

impl BidCommandHandler {
    pub fn new(
        authz: Arc<AuthorizationResolver>,
        bids: Arc<dyn BidRepository>,
        tenders: Arc<dyn TenderRepository>,
        store: Arc<VersionedStore>,
    ) -> Self {
        let rollbacks = RollbackEngine::new(store.clone(), authz.clone());
        Self {
            authz,
            bids,
            tenders,
            store,
            rollbacks,
        }
    }

    /// Handle a command and return the resulting bid state
    pub async fn handle(&self, command: BidCommand) -> Result<BidView> {
        match command {
            BidCommand::CreateBid {
                name,
                description,
                tender_id,
                author_type,
                author_id,
            } => {
                let author_type: AuthorType = author_type.parse()?;
                validate_name(&name)?;
                validate_description(&description)?;
                self.create(name, description, tender_id, author_type, author_id)
                    .await
            }
            BidCommand::SetBidStatus {
                bid_id,
                username,
                status,
            } => {
                let status = BidStatus::parse_settable(&status)?;
                self.update(
                    bid_id,
                    &username,
                    BidPatch {
                        status: Some(status),
                        ..Default::default()
                    },
                )
                .await
            }
            BidCommand::PatchBid {
                bid_id,
                username,
                name,
                description,
                status,
                tender_id,
            } => {
                let patch = BidPatch {
                    status: status.as_deref().map(BidStatus::parse_settable).transpose()?,
                    name,
                    description,
                    tender_id,
                };
                if let Some(name) = &patch.name {
                    validate_name(name)?;
                }
                if let Some(description) = &patch.description {
                    validate_description(description)?;
                }
                self.update(bid_id, &username, patch).await
            }
            BidCommand::SubmitDecision {
                bid_id,
                username,
                decision,
            } => {
                let decision: Decision = decision.parse()?;
                self.decide(bid_id, &username, decision).await
            }
            BidCommand::SubmitFeedback {
                bid_id,
                username,
                feedback,
            } => {
                validate_feedback(&feedback)?;
                self.feedback(bid_id, &username, feedback).await
            }
            BidCommand::RollbackBid {
                bid_id,
                version,
                username,
            } => self.rollback(bid_id, version, &username).await,
        }
    }

    async fn create(
        &self,
        name: String,
        description: String,
        tender_id: Uuid,
        author_type: AuthorType,
        author_id: Uuid,
    ) -> Result<BidView> {
        let actor = self.authz.resolve_actor_by_id(author_id).await?;
        let tender = self.load_tender(tender_id).await?;
        self.authz.authorize_bid_submission(&actor, &tender)?;

        let bid = Bid::new(
            name,
            description,
            tender.id,
            author_type,
            actor.employee.id,
            actor.organization_id,
            actor.employee.username.clone(),
        );
        self.store.create(&bid).await?;

        tracing::info!(
            bid_id = %bid.id,
            tender_id = %tender.id,
            organization_id = %actor.organization_id,
            "Bid submitted"
        );
        Ok(BidView::from(&bid))
    }

    async fn update(&self, bid_id: Uuid, username: &str, patch: BidPatch) -> Result<BidView> {
        let actor = self.authz.resolve_actor(username).await?;
        let mut bid = self.load_bid(bid_id).await?;
        self.authz.authorize_mutation(&actor, &bid)?;

        if let Some(tender_id) = patch.tender_id {
            self.load_tender(tender_id).await?;
        }

        self.store
            .apply_mutation(&mut bid, |b| b.apply_patch(patch))
            .await?;

        tracing::info!(
            bid_id = %bid.id,
            version = bid.version,
            status = %bid.status,
            actor = %actor.username(),
            "Bid updated"
        );
        Ok(BidView::from(&bid))
    }

    async fn decide(&self, bid_id: Uuid, username: &str, decision: Decision) -> Result<BidView> {
        let employee = self.authz.identity().resolve_employee(username).await?;
        let mut bid = self.load_published_bid(bid_id).await?;
        let mut tender = self.load_tender(bid.tender_id).await?;

        let reviewer = self
            .authz
            .resolve_reviewer(employee, EntityKind::Bid, bid.id)
            .await?;
        self.authz.authorize_review(&reviewer, &tender)?;

        let mut batch = MutationBatch::new();
        batch.stage_mutation(&mut bid, |b| b.status = decision.into());
        batch.stage_mutation(&mut tender, |t| t.status = TenderStatus::Closed);
        self.store.commit(batch).await?;

        tracing::info!(
            bid_id = %bid.id,
            tender_id = %tender.id,
            decision = %bid.status,
            actor = %reviewer.username(),
            "Decision recorded, tender closed"
        );
        Ok(BidView::from(&bid))
    }

    async fn feedback(&self, bid_id: Uuid, username: &str, text: String) -> Result<BidView> {
        let employee = self.authz.identity().resolve_employee(username).await?;
        let mut bid = self.load_published_bid(bid_id).await?;
        let tender = self.load_tender(bid.tender_id).await?;

        let reviewer = self
            .authz
            .resolve_reviewer(employee, EntityKind::Bid, bid.id)
            .await?;
        self.authz.authorize_review(&reviewer, &tender)?;

        let feedback = Feedback::new(
            bid.id,
            text,
            reviewer.employee.username.clone(),
            reviewer.organization_id,
        );
        let feedback_id = feedback.id;

        let mut batch = MutationBatch::new();
        batch.stage_feedback(feedback);
        batch.stage_mutation(&mut bid, |_| {});
        self.store.commit(batch).await?;

        tracing::info!(
            bid_id = %bid.id,
            feedback_id = %feedback_id,
            version = bid.version,
            "Feedback attached"
        );
        Ok(BidView::from(&bid))
    }

    async fn rollback(&self, bid_id: Uuid, version: i64, username: &str) -> Result<BidView> {
        let actor = self.authz.resolve_actor(username).await?;

        // The restored tender reference must still point at a live tender
        if let Some(snapshot) = self.bids.find_snapshot(bid_id, version).await? {
            self.authz.authorize_snapshot(&actor, EntityKind::Bid, &snapshot)?;
            self.load_tender(snapshot.content.tender_id).await?;
        }

        let bid: Bid = self
            .rollbacks
            .rollback(&*self.bids, bid_id, version, &actor)
            .await?;
        Ok(BidView::from(&bid))
    }

    async fn load_bid(&self, bid_id: Uuid) -> Result<Bid> {
        self.bids
            .find_live(bid_id)
            .await?
            .ok_or_else(|| ProcurementError::not_found(EntityKind::Bid, bid_id))
    }

    async fn load_published_bid(&self, bid_id: Uuid) -> Result<Bid> {
        self.bids
            .find_published(bid_id)
            .await?
            .ok_or_else(|| ProcurementError::not_found(EntityKind::Bid, bid_id))
    }

    async fn load_tender(&self, tender_id: Uuid) -> Result<Tender> {
        self.tenders
            .find_live(tender_id)
            .await?
            .ok_or_else(|| ProcurementError::not_found(EntityKind::Tender, tender_id))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::VersionedRepository;
    use crate::test_support::Fixture;

    fn decision(bid_id: Uuid, username: &str, decision: &str) -> BidCommand {
        BidCommand::SubmitDecision {
            bid_id,
            username: username.to_string(),
            decision: decision.to_string(),
        }
    }

    fn feedback(bid_id: Uuid, username: &str, text: &str) -> BidCommand {
        BidCommand::SubmitFeedback {
            bid_id,
            username: username.to_string(),
            feedback: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_bid_against_published_tender() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;

        let bid = fx.create_bid(&fx.o2, tender.id, "Offer").await;
        assert_eq!(bid.version, 1);
        assert_eq!(bid.status, BidStatus::Created);
        assert_eq!(bid.author_id, fx.o2.employee.id);

        let stored = VersionedRepository::<Bid>::find_live(&*fx.store, bid.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.organization_id, fx.o2.organization_id);
    }

    #[tokio::test]
    async fn test_submit_bid_against_unpublished_tender_is_forbidden() {
        let fx = Fixture::new().await;
        let draft = fx.create_tender(&fx.o1, "Draft").await;

        let err = fx
            .app
            .bids
            .handle(BidCommand::CreateBid {
                name: "Offer".to_string(),
                description: String::new(),
                tender_id: draft.id,
                author_type: "User".to_string(),
                author_id: fx.o2.employee.id,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_submit_bid_against_closed_tender_is_forbidden() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;
        let bid = fx.create_bid(&fx.o2, tender.id, "Offer").await;
        fx.publish_bid(&fx.o2, bid.id).await;
        fx.app
            .bids
            .handle(decision(bid.id, fx.o1.username(), "Rejected"))
            .await
            .unwrap();

        let err = fx
            .app
            .bids
            .handle(BidCommand::CreateBid {
                name: "Late offer".to_string(),
                description: String::new(),
                tender_id: tender.id,
                author_type: "Organization".to_string(),
                author_id: fx.o3.employee.id,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_submit_bid_by_unknown_author() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;

        let err = fx
            .app
            .bids
            .handle(BidCommand::CreateBid {
                name: "Offer".to_string(),
                description: String::new(),
                tender_id: tender.id,
                author_type: "User".to_string(),
                author_id: Uuid::new_v4(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ActorNotFound);
    }

    #[tokio::test]
    async fn test_decision_closes_tender_atomically() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;
        let bid = fx.create_bid(&fx.o2, tender.id, "Offer").await;
        let published = fx.publish_bid(&fx.o2, bid.id).await;

        let decided = fx
            .app
            .bids
            .handle(decision(bid.id, fx.o1.username(), "Approved"))
            .await
            .unwrap();

        assert_eq!(decided.status, BidStatus::Approved);
        assert_eq!(decided.version, published.version + 1);

        let closed = VersionedRepository::<Tender>::find_live(&*fx.store, tender.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.status, TenderStatus::Closed);
        assert_eq!(closed.version, 3);
    }

    #[tokio::test]
    async fn test_decision_requires_published_bid() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;
        let bid = fx.create_bid(&fx.o2, tender.id, "Offer").await;

        let err = fx
            .app
            .bids
            .handle(decision(bid.id, fx.o1.username(), "Approved"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EntityNotFound);
    }

    #[tokio::test]
    async fn test_decision_by_bidder_is_forbidden() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;
        let bid = fx.create_bid(&fx.o2, tender.id, "Offer").await;
        fx.publish_bid(&fx.o2, bid.id).await;

        let err = fx
            .app
            .bids
            .handle(decision(bid.id, fx.o2.username(), "Approved"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let untouched = VersionedRepository::<Tender>::find_live(&*fx.store, tender.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.status, TenderStatus::Published);
    }

    #[tokio::test]
    async fn test_decision_by_employee_without_membership_is_forbidden() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;
        let bid = fx.create_bid(&fx.o2, tender.id, "Offer").await;
        fx.publish_bid(&fx.o2, bid.id).await;

        let err = fx
            .app
            .bids
            .handle(decision(bid.id, &fx.loner.username, "Rejected"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_invalid_decision_value() {
        let fx = Fixture::new().await;
        let err = fx
            .app
            .bids
            .handle(decision(Uuid::new_v4(), fx.o1.username(), "Maybe"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEnumValue);
    }

    #[tokio::test]
    async fn test_conflicting_decision_leaves_tender_untouched() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;
        let bid = fx.create_bid(&fx.o2, tender.id, "Offer").await;
        fx.publish_bid(&fx.o2, bid.id).await;

        // A concurrent writer bumps the bid between read and commit
        let mut stale_bid = VersionedRepository::<Bid>::find_live(&*fx.store, bid.id)
            .await
            .unwrap()
            .unwrap();
        let mut live_tender = VersionedRepository::<Tender>::find_live(&*fx.store, tender.id)
            .await
            .unwrap()
            .unwrap();
        fx.app
            .bids
            .handle(BidCommand::PatchBid {
                bid_id: bid.id,
                username: fx.o2.username().to_string(),
                name: Some("Racing edit".to_string()),
                description: None,
                status: None,
                tender_id: None,
            })
            .await
            .unwrap();

        let mut batch = MutationBatch::new();
        batch.stage_mutation(&mut stale_bid, |b| b.status = BidStatus::Approved);
        batch.stage_mutation(&mut live_tender, |t| t.status = TenderStatus::Closed);
        let err = fx.store_handle.commit(batch).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let tender_after = VersionedRepository::<Tender>::find_live(&*fx.store, tender.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tender_after.status, TenderStatus::Published);
        assert_eq!(tender_after.version, 2);
    }

    #[tokio::test]
    async fn test_feedback_is_recorded_and_bumps_version() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;
        let bid = fx.create_bid(&fx.o2, tender.id, "Offer").await;
        let published = fx.publish_bid(&fx.o2, bid.id).await;

        let after = fx
            .app
            .bids
            .handle(feedback(bid.id, fx.o1.username(), "Too expensive"))
            .await
            .unwrap();
        assert_eq!(after.version, published.version + 1);
        assert_eq!(after.status, BidStatus::Published);

        let reviews = fx
            .app
            .bid_queries
            .list_reviews(tender.id, fx.o2.username(), fx.o1.username(), Default::default())
            .await
            .unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].description, "Too expensive");
    }

    #[tokio::test]
    async fn test_feedback_rules() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;
        let bid = fx.create_bid(&fx.o2, tender.id, "Offer").await;
        fx.publish_bid(&fx.o2, bid.id).await;

        let too_long = "x".repeat(1001);
        let err = fx
            .app
            .bids
            .handle(feedback(bid.id, fx.o1.username(), &too_long))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = fx
            .app
            .bids
            .handle(feedback(bid.id, fx.o3.username(), "Nice"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = fx
            .app
            .bids
            .handle(feedback(bid.id, "ghost", "Nice"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ActorNotFound);
    }

    #[tokio::test]
    async fn test_patch_bid_name_only() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;
        let bid = fx.create_bid(&fx.o2, tender.id, "Offer").await;

        let patched = fx
            .app
            .bids
            .handle(BidCommand::PatchBid {
                bid_id: bid.id,
                username: fx.o2.username().to_string(),
                name: Some("Better offer".to_string()),
                description: None,
                status: None,
                tender_id: None,
            })
            .await
            .unwrap();

        assert_eq!(patched.name, "Better offer");
        assert_eq!(patched.description, bid.description);
        assert_eq!(patched.status, bid.status);
        assert_eq!(patched.version, bid.version + 1);
    }

    #[tokio::test]
    async fn test_patch_bid_cannot_set_decision_statuses() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;
        let bid = fx.create_bid(&fx.o2, tender.id, "Offer").await;

        let err = fx
            .app
            .bids
            .handle(BidCommand::SetBidStatus {
                bid_id: bid.id,
                username: fx.o2.username().to_string(),
                status: "Approved".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEnumValue);
    }

    #[tokio::test]
    async fn test_retarget_to_missing_tender_is_not_found() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;
        let bid = fx.create_bid(&fx.o2, tender.id, "Offer").await;

        let err = fx
            .app
            .bids
            .handle(BidCommand::PatchBid {
                bid_id: bid.id,
                username: fx.o2.username().to_string(),
                name: None,
                description: None,
                status: None,
                tender_id: Some(Uuid::new_v4()),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EntityNotFound);
    }

    #[tokio::test]
    async fn test_rollback_bid_after_three_mutations() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;
        let bid = fx.create_bid(&fx.o2, tender.id, "Offer").await;

        for (i, name) in ["Second", "Third", "Fourth"].iter().enumerate() {
            let view = fx
                .app
                .bids
                .handle(BidCommand::PatchBid {
                    bid_id: bid.id,
                    username: fx.o2.username().to_string(),
                    name: Some(name.to_string()),
                    description: Some(format!("rev {}", i)),
                    status: None,
                    tender_id: None,
                })
                .await
                .unwrap();
            assert_eq!(view.version, i as i64 + 2);
        }

        let rolled = fx
            .app
            .bids
            .handle(BidCommand::RollbackBid {
                bid_id: bid.id,
                version: 1,
                username: fx.o2.username().to_string(),
            })
            .await
            .unwrap();

        let v1 = VersionedRepository::<Bid>::find_snapshot(&*fx.store, bid.id, 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rolled.version, 5);
        assert_eq!(rolled.name, v1.content.name);
        assert_eq!(rolled.description, v1.content.description);

        let v5 = VersionedRepository::<Bid>::find_snapshot(&*fx.store, bid.id, 5)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(v5.content, v1.content);
    }

    #[tokio::test]
    async fn test_rollback_bid_by_other_organization_is_forbidden() {
        let fx = Fixture::new().await;
        let tender = fx.published_tender(&fx.o1, "Road").await;
        let bid = fx.create_bid(&fx.o2, tender.id, "Offer").await;

        let err = fx
            .app
            .bids
            .handle(BidCommand::RollbackBid {
                bid_id: bid.id,
                version: 1,
                username: fx.o1.username().to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_rollback_bid_to_deleted_tender_is_not_found() {
        let fx = Fixture::new().await;
        let first = fx.published_tender(&fx.o1, "Road").await;
        let second = fx.published_tender(&fx.o1, "Bridge").await;
        let bid = fx.create_bid(&fx.o2, first.id, "Offer").await;

        let moved = fx
            .app
            .bids
            .handle(BidCommand::PatchBid {
                bid_id: bid.id,
                username: fx.o2.username().to_string(),
                name: None,
                description: None,
                status: None,
                tender_id: Some(second.id),
            })
            .await
            .unwrap();
        assert_eq!(moved.version, 2);

        assert!(fx.store.soft_delete_tender(first.id).await);

        let err = fx
            .app
            .bids
            .handle(BidCommand::RollbackBid {
                bid_id: bid.id,
                version: 1,
                username: fx.o2.username().to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EntityNotFound);

        let live = VersionedRepository::<Bid>::find_live(&*fx.store, bid.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.version, 2);
        assert_eq!(live.tender_id, second.id);
    }
}
