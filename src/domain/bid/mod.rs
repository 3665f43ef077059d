// ============================================================================
// Bid Domain - Business Logic for the Bid Aggregate
// ============================================================================
//
// This module contains ALL Bid-specific code:
// - Value objects (BidStatus, AuthorType, Decision)
// - Aggregate (Bid, BidContent, BidPatch, Feedback)
// - Commands (CreateBid, SetBidStatus, PatchBid, SubmitDecision, ...)
// - Views returned to the boundary layer
// - Command handler and read-only queries
//
// ============================================================================

pub mod value_objects;
pub mod aggregate;
pub mod commands;
pub mod views;
pub mod command_handler;
pub mod queries;

// Re-export for convenience
pub use value_objects::*;
pub use aggregate::*;
pub use commands::*;
pub use views::*;
pub use command_handler::*;
pub use queries::*;
