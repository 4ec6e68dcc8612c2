//! # Unilink
//!
//! A contact identity reconciliation engine.
//!
//! Unilink resolves partial, possibly overlapping contact observations (an
//! email, a phone number, or both) into canonical identity clusters. An
//! observation that matches nothing becomes a fresh primary record; one
//! that extends a known identity becomes a secondary linked to the
//! cluster's primary; one that proves two previously-separate clusters
//! belong to the same person merges them, demoting the newer primary and
//! re-pointing its secondaries at the survivor.
//!
//! The engine is stateless between calls: the record store is the only
//! shared state, and every reconciliation runs inside one serializable
//! store transaction.

pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod projection;
pub mod reconcile;
pub mod resolver;
pub mod store;
pub mod test_support;

// Re-export main types for convenience
pub use config::ServiceConfig;
pub use error::{EngineError, EngineResult, StoreError, StoreResult};
pub use model::{
    ClusterView, ContactId, ContactRecord, LinkPrecedence, NewContact, Observation, Timestamp,
};
pub use reconcile::Reconciler;
pub use store::{ContactReads, ContactStore, ContactTx, MemoryStore};

use std::sync::Arc;

/// Main API for contact identity reconciliation
pub struct Unilink {
    reconciler: Reconciler,
}

impl Unilink {
    /// Create an engine over a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// Create an engine over a custom store implementation.
    pub fn with_store<S>(store: S) -> Self
    where
        S: ContactStore + 'static,
    {
        Self {
            reconciler: Reconciler::new(Arc::new(store)),
        }
    }

    /// Create an engine with an explicit configuration.
    pub fn with_store_and_config<S>(store: S, config: &ServiceConfig) -> Self
    where
        S: ContactStore + 'static,
    {
        Self {
            reconciler: Reconciler::with_retries(Arc::new(store), config.max_tx_retries),
        }
    }

    pub fn store(&self) -> &Arc<dyn ContactStore> {
        self.reconciler.store()
    }

    /// Fold an observation into the record set; returns the cluster primary id.
    pub fn reconcile(&self, observation: &Observation) -> EngineResult<ContactId> {
        self.reconciler.reconcile(observation)
    }

    /// Canonical view of the cluster anchored at `primary_id`.
    pub fn project(&self, primary_id: ContactId) -> EngineResult<ClusterView> {
        projection::project(self.store().as_ref(), primary_id)
    }

    /// The single inbound operation: reconcile the observation, then
    /// project the cluster it resolved to.
    pub fn identify(&self, observation: &Observation) -> EngineResult<ClusterView> {
        let primary = self.reconcile(observation)?;
        self.project(primary)
    }
}

impl Default for Unilink {
    fn default() -> Self {
        Self::new()
    }
}
