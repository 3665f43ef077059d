mod batch;
mod rollback;
mod versioned_store;

pub use batch::{MutationBatch, StagedWrite, VersionedWrite};
pub use rollback::RollbackEngine;
pub use versioned_store::VersionedStore;
