// ============================================================================
// tender_service - versioned tender/bid core
// ============================================================================
//
// Layers:
// - versioning: generic snapshot history, mutation protocol, rollback
// - domain: identity, authorization, tender and bid aggregates
// - storage: repository ports with in-memory and Postgres implementations
//
// ============================================================================

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod storage;
pub mod versioning;

#[cfg(test)]
mod test_support;

pub use app::Procurement;
pub use error::{ErrorKind, ProcurementError, Result};
