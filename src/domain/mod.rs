// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// This module contains the procurement aggregates and the rules around them.
// Each aggregate has its own subdirectory with:
// - Value objects
// - Aggregate implementation
// - Commands
// - Views
// - Command handler and queries
//
// Shared pieces (identity, authorization, pagination, validation) sit next
// to them. Version history is handled by src/versioning/.
//
// ============================================================================

pub mod authorization;
pub mod identity;
pub mod page;
pub mod validation;

pub mod bid;
pub mod tender;
