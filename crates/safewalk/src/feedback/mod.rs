//! The feedback API consumed by the map UI.
//!
//! Every operation validates its input before touching storage. Validation
//! failures become [`ApiError::Validation`] (400) with a short message;
//! storage failures are logged and become [`ApiError::Service`] (500) with
//! a fixed message that carries no internal detail.

mod wire;

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::aggregate::AggregationService;
use crate::error::Error;
use crate::storage::VoteStore;
use crate::vote::{Aggregate, Classification, LatLng, LocationKey, Vote};

pub use wire::{AggregateResponse, ErrorResponse, FeedbackRequest, MessageResponse, VoteRequest};

/// Generic message for a failed `POST /vote`.
pub const VOTE_FAILED: &str = "Server error";
/// Generic message for a failed `POST /feedback`.
pub const FEEDBACK_SAVE_FAILED: &str = "Failed to save feedback";
/// Generic message for a failed `GET /feedback/:latlngKey`.
pub const FEEDBACK_FETCH_FAILED: &str = "Failed to fetch feedback";
/// Generic message for a failed `GET /all`.
pub const LIST_FAILED: &str = "Could not fetch votes";

/// Error returned across the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request was malformed or out of range.
    #[error("{0}")]
    Validation(String),

    /// The request was valid but could not be served.
    #[error("{0}")]
    Service(&'static str),
}

impl ApiError {
    /// HTTP status code equivalent.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Service(_) => 500,
        }
    }

    /// JSON body for this error.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }

    /// Check if this is a client-side error.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Map a library error, logging anything that is not the caller's fault.
    fn from_error(err: Error, generic: &'static str) -> Self {
        match err {
            Error::Validation(message) => Self::Validation(message),
            other => {
                error!("{generic}: {other}");
                Self::Service(generic)
            }
        }
    }
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Submit, read, and list community safety votes.
#[derive(Debug, Clone)]
pub struct FeedbackApi {
    store: Arc<dyn VoteStore>,
    aggregation: AggregationService,
}

impl FeedbackApi {
    /// Create an API over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn VoteStore>) -> Self {
        let aggregation = AggregationService::new(Arc::clone(&store));
        Self { store, aggregation }
    }

    /// Record a vote for a raw coordinate and return the fresh counts for its bucket.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] if a coordinate is missing or out of range, or
    /// the classification is not `safe`/`unsafe`. [`ApiError::Service`] if the
    /// vote cannot be stored or counted.
    pub fn submit_vote(
        &self,
        lat: Option<f64>,
        lng: Option<f64>,
        classification: &str,
    ) -> ApiResult<Aggregate> {
        let point =
            LatLng::from_parts(lat, lng).map_err(|e| ApiError::from_error(e, VOTE_FAILED))?;
        let classification = parse_classification(classification, VOTE_FAILED)?;

        self.record(Vote::at(point, classification), VOTE_FAILED)
    }

    /// Record a vote for an existing location key and return the fresh counts.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] if the key is malformed or the classification
    /// is not `safe`/`unsafe`. [`ApiError::Service`] on storage failure.
    pub fn submit_vote_by_key(&self, key: &str, classification: &str) -> ApiResult<Aggregate> {
        let key = parse_key(key, FEEDBACK_SAVE_FAILED)?;
        let classification = parse_classification(classification, FEEDBACK_SAVE_FAILED)?;

        self.record(Vote::for_key(key, classification), FEEDBACK_SAVE_FAILED)
    }

    /// Current counts for a location key.
    ///
    /// A key nobody has voted on returns zero counts, not an error.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] if the key is malformed. [`ApiError::Service`]
    /// on storage failure.
    pub fn get_aggregate(&self, key: &str) -> ApiResult<Aggregate> {
        let key = parse_key(key, FEEDBACK_FETCH_FAILED)?;
        self.aggregation
            .aggregate(&key)
            .map_err(|e| ApiError::from_error(e, FEEDBACK_FETCH_FAILED))
    }

    /// Every stored vote, unfiltered and unpaginated.
    ///
    /// # Errors
    ///
    /// [`ApiError::Service`] on storage failure.
    pub fn list_all_votes(&self) -> ApiResult<Vec<Vote>> {
        self.store
            .find_all()
            .map_err(|e| ApiError::from_error(e, LIST_FAILED))
    }

    /// `POST /vote`.
    ///
    /// # Errors
    ///
    /// See [`FeedbackApi::submit_vote`].
    pub fn handle_vote(&self, request: &VoteRequest) -> ApiResult<MessageResponse> {
        let safety = request.safety.as_deref().unwrap_or_default();
        self.submit_vote(request.lat, request.lng, safety)?;
        Ok(MessageResponse::vote_submitted())
    }

    /// `POST /feedback`.
    ///
    /// # Errors
    ///
    /// See [`FeedbackApi::submit_vote_by_key`].
    pub fn handle_feedback(&self, request: &FeedbackRequest) -> ApiResult<AggregateResponse> {
        let key = request.latlng_key.as_deref().unwrap_or_default();
        let kind = request.kind.as_deref().unwrap_or_default();
        self.submit_vote_by_key(key, kind).map(AggregateResponse::from)
    }

    /// `GET /feedback/:latlngKey`.
    ///
    /// # Errors
    ///
    /// See [`FeedbackApi::get_aggregate`].
    pub fn handle_get_feedback(&self, key: &str) -> ApiResult<AggregateResponse> {
        self.get_aggregate(key).map(AggregateResponse::from)
    }

    /// `GET /all`.
    ///
    /// # Errors
    ///
    /// See [`FeedbackApi::list_all_votes`].
    pub fn handle_all(&self) -> ApiResult<Vec<Vote>> {
        self.list_all_votes()
    }

    fn record(&self, vote: Vote, generic: &'static str) -> ApiResult<Aggregate> {
        let id = self
            .store
            .append(&vote)
            .map_err(|e| ApiError::from_error(e, generic))?;
        info!(
            "Recorded {} vote {id} at {}",
            vote.classification, vote.location_key
        );

        self.aggregation
            .aggregate(&vote.location_key)
            .map_err(|e| ApiError::from_error(e, generic))
    }
}

fn parse_classification(raw: &str, generic: &'static str) -> ApiResult<Classification> {
    raw.parse().map_err(|e| ApiError::from_error(e, generic))
}

fn parse_key(raw: &str, generic: &'static str) -> ApiResult<LocationKey> {
    if raw.trim().is_empty() {
        return Err(ApiError::Validation("location key is required".to_string()));
    }
    LocationKey::parse(raw).map_err(|e| ApiError::from_error(e, generic))
}
