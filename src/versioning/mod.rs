// ============================================================================
// Versioning Infrastructure
// ============================================================================
//
// Generic version-history machinery shared by every versioned aggregate.
// Domain-specific code is in src/domain/
//
// ============================================================================

// Core abstractions (GENERIC - works with any versioned entity)
mod core;
mod store;

pub use self::core::*;
pub use self::store::*;
