// ============================================================================
// Tender Domain - Business Logic for the Tender Aggregate
// ============================================================================
//
// This module contains ALL Tender-specific code:
// - Value objects (ServiceType, TenderStatus)
// - Aggregate (Tender, TenderContent, TenderPatch)
// - Commands (CreateTender, SetTenderStatus, PatchTender, RollbackTender)
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
