use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::aggregate::{Bid, Feedback};
use super::value_objects::{AuthorType, BidStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: BidStatus,
    pub tender_id: Uuid,
    pub author_type: AuthorType,
    pub author_id: Uuid,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Bid> for BidView {
    fn from(bid: &Bid) -> Self {
        Self {
            id: bid.id,
            name: bid.name.clone(),
            description: bid.description.clone(),
            status: bid.status,
            tender_id: bid.tender_id,
            author_type: bid.author_type,
            author_id: bid.author_id,
            version: bid.version,
            created_at: bid.created_at,
        }
    }
}

/// Feedback as shown to the tender's organization
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Feedback> for ReviewView {
    fn from(feedback: &Feedback) -> Self {
        Self {
            id: feedback.id,
            description: feedback.text.clone(),
            created_at: feedback.created_at,
        }
    }
}
