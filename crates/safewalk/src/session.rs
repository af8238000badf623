//! Client-side cache of aggregates seen during one session.
//!
//! The cache only remembers what the feedback API last reported. It is
//! never consulted by the API itself and is dropped with the session.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::feedback::{ApiResult, FeedbackApi};
use crate::vote::{Aggregate, Classification, LatLng, LocationKey};

/// How a location is presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// At least as many safe votes as unsafe ones.
    Safe,
    /// Strictly more unsafe votes than safe ones.
    Unsafe,
}

impl Verdict {
    /// Verdict for a set of counts. Ties, including no votes, read as safe.
    #[must_use]
    pub fn of(aggregate: &Aggregate) -> Self {
        if aggregate.unsafe_count > aggregate.safe_count {
            Self::Unsafe
        } else {
            Self::Safe
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Unsafe => write!(f, "unsafe"),
        }
    }
}

/// Per-session map of location key to last known counts.
#[derive(Debug, Default, Clone)]
pub struct SessionCache {
    entries: HashMap<LocationKey, Aggregate>,
}

impl SessionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the current counts for `key` and remember them.
    ///
    /// # Errors
    ///
    /// Propagates the API error. The cached entry is left as it was.
    pub fn sync(&mut self, api: &FeedbackApi, key: &LocationKey) -> ApiResult<Aggregate> {
        let aggregate = api.get_aggregate(key.as_str())?;
        debug!("Cached {key}: {} safe, {} unsafe", aggregate.safe_count, aggregate.unsafe_count);
        self.entries.insert(key.clone(), aggregate);
        Ok(aggregate)
    }

    /// Submit a vote and remember the counts the API returns for its bucket.
    ///
    /// # Errors
    ///
    /// Propagates the API error. Nothing is cached on failure.
    pub fn vote(
        &mut self,
        api: &FeedbackApi,
        lat: f64,
        lng: f64,
        classification: Classification,
    ) -> ApiResult<Aggregate> {
        let aggregate = api.submit_vote(Some(lat), Some(lng), classification.as_str())?;
        self.entries
            .insert(LocationKey::quantize(LatLng { lat, lng }), aggregate);
        Ok(aggregate)
    }

    /// Last known counts for `key`, zero if never seen.
    #[must_use]
    pub fn get(&self, key: &LocationKey) -> Aggregate {
        self.entries.get(key).copied().unwrap_or_default()
    }

    /// Presentation verdict for `key` from the cached counts.
    #[must_use]
    pub fn verdict(&self, key: &LocationKey) -> Verdict {
        Verdict::of(&self.get(key))
    }

    /// Number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
