//! Per-location vote counting.
//!
//! Counts are recomputed from the stored votes on every call. There is no
//! separately maintained counter, so two votes racing on the same key are
//! both counted without any read-modify-write coordination.

use std::sync::Arc;

use tracing::trace;

use crate::error::Result;
use crate::storage::VoteStore;
use crate::vote::{Aggregate, LocationKey};

/// Turns a location key into safe/unsafe counts.
#[derive(Debug, Clone)]
pub struct AggregationService {
    store: Arc<dyn VoteStore>,
}

impl AggregationService {
    /// Create a service reading from the given store.
    #[must_use]
    pub fn new(store: Arc<dyn VoteStore>) -> Self {
        Self { store }
    }

    /// Count the votes stored under `key`.
    ///
    /// A key with no votes yields an empty aggregate.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the votes cannot be read.
    pub fn aggregate(&self, key: &LocationKey) -> Result<Aggregate> {
        let votes = self.store.find_by_key(key)?;
        let aggregate: Aggregate = votes.iter().collect();
        trace!(
            "Aggregated {} votes for {key}: {} safe, {} unsafe",
            votes.len(),
            aggregate.safe_count,
            aggregate.unsafe_count
        );
        Ok(aggregate)
    }
}
