use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProcurementError;

// ============================================================================
// Bid Value Objects
// ============================================================================

/// Created -> Published -> {Approved | Rejected | Canceled} (advisory)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BidStatus {
    Created,
    Published,
    Canceled,
    Approved,
    Rejected,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Created => "Created",
            BidStatus::Published => "Published",
            BidStatus::Canceled => "Canceled",
            BidStatus::Approved => "Approved",
            BidStatus::Rejected => "Rejected",
        }
    }

    /// Statuses a bid author may set directly; the rest come from a decision
    pub fn parse_settable(s: &str) -> Result<Self, ProcurementError> {
        match s.parse::<BidStatus>()? {
            status @ (BidStatus::Created | BidStatus::Published | BidStatus::Canceled) => Ok(status),
            _ => Err(ProcurementError::invalid_enum("bid status", s)),
        }
    }
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BidStatus {
    type Err = ProcurementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(BidStatus::Created),
            "Published" => Ok(BidStatus::Published),
            "Canceled" => Ok(BidStatus::Canceled),
            "Approved" => Ok(BidStatus::Approved),
            "Rejected" => Ok(BidStatus::Rejected),
            other => Err(ProcurementError::invalid_enum("bid status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorType {
    User,
    Organization,
}

impl AuthorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorType::User => "User",
            AuthorType::Organization => "Organization",
        }
    }
}

impl fmt::Display for AuthorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthorType {
    type Err = ProcurementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(AuthorType::User),
            "Organization" => Ok(AuthorType::Organization),
            other => Err(ProcurementError::invalid_enum("author type", other)),
        }
    }
}

/// The tender owner's verdict on a published bid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Rejected,
}

impl FromStr for Decision {
    type Err = ProcurementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Approved" => Ok(Decision::Approved),
            "Rejected" => Ok(Decision::Rejected),
            other => Err(ProcurementError::invalid_enum("decision", other)),
        }
    }
}

impl From<Decision> for BidStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => BidStatus::Approved,
            Decision::Rejected => BidStatus::Rejected,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
