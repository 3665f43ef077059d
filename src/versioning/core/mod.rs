// ============================================================================
// Versioning Core - Generic Abstractions
// ============================================================================
//
// No domain-specific types live here: tenders and bids plug in by
// implementing `Versioned`.
//
// ============================================================================

pub mod snapshot;
pub mod versioned;

pub use snapshot::Snapshot;
pub use versioned::{EntityKind, Versioned};
