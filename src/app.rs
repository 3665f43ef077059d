use std::sync::Arc;

use crate::domain::authorization::AuthorizationResolver;
use crate::domain::bid::{BidCommandHandler, BidQueries};
use crate::domain::identity::IdentityResolver;
use crate::domain::tender::{TenderCommandHandler, TenderQueries};
use crate::metrics::Metrics;
use crate::storage::{BidRepository, IdentityRepository, InMemoryStore, MutationStore, PgStore, TenderRepository};
use crate::versioning::VersionedStore;

// ============================================================================
// Procurement - wiring of the core services
// ============================================================================
//
// One instance per process. Every use case is reachable from here:
// command handlers for writes, query services for reads.
//
// ============================================================================

pub struct Procurement {
    pub tenders: TenderCommandHandler,
    pub tender_queries: TenderQueries,
    pub bids: BidCommandHandler,
    pub bid_queries: BidQueries,
    authz: Arc<AuthorizationResolver>,
    store: Arc<VersionedStore>,
    metrics: Arc<Metrics>,
}

impl Procurement {
    pub fn new(
        identity: Arc<dyn IdentityRepository>,
        tenders: Arc<dyn TenderRepository>,
        bids: Arc<dyn BidRepository>,
        mutations: Arc<dyn MutationStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let authz = Arc::new(AuthorizationResolver::new(
            IdentityResolver::new(identity),
            metrics.clone(),
        ));
        let store = Arc::new(VersionedStore::new(mutations, metrics.clone()));

        Self {
            tenders: TenderCommandHandler::new(authz.clone(), tenders.clone(), store.clone()),
            tender_queries: TenderQueries::new(authz.clone(), tenders.clone()),
            bids: BidCommandHandler::new(authz.clone(), bids.clone(), tenders.clone(), store.clone()),
            bid_queries: BidQueries::new(authz.clone(), bids, tenders),
            authz,
            store,
            metrics,
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>, metrics: Arc<Metrics>) -> Self {
        Self::new(store.clone(), store.clone(), store.clone(), store, metrics)
    }

    pub fn postgres(store: Arc<PgStore>, metrics: Arc<Metrics>) -> Self {
        Self::new(store.clone(), store.clone(), store.clone(), store, metrics)
    }

    pub fn authz(&self) -> &Arc<AuthorizationResolver> {
        &self.authz
    }

    pub fn identity(&self) -> &IdentityResolver {
        self.authz.identity()
    }

    pub fn versioned_store(&self) -> &Arc<VersionedStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}
