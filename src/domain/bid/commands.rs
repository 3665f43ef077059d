use uuid::Uuid;

// ============================================================================
// Bid Commands - Represent user intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum BidCommand {
    CreateBid {
        name: String,
        description: String,
        tender_id: Uuid,
        author_type: String,
        author_id: Uuid,
    },
    SetBidStatus {
        bid_id: Uuid,
        username: String,
        status: String,
    },
    PatchBid {
        bid_id: Uuid,
        username: String,
        name: Option<String>,
        description: Option<String>,
        status: Option<String>,
        tender_id: Option<Uuid>,
    },
    SubmitDecision {
        bid_id: Uuid,
        username: String,
        decision: String,
    },
    SubmitFeedback {
        bid_id: Uuid,
        username: String,
        feedback: String,
    },
    RollbackBid {
        bid_id: Uuid,
        version: i64,
        username: String,
    },
}
