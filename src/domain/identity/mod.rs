// ============================================================================
// Identity - employees, organizations and memberships
// ============================================================================

pub mod entities;
pub mod resolver;

pub use entities::*;
pub use resolver::*;
