//! JSON request and response bodies exchanged with the map UI.
//!
//! Two request shapes exist: the coordinate shape (`POST /vote`) and the
//! key shape (`POST /feedback`). Fields are optional here so that missing
//! values reach validation instead of failing deserialization.

use serde::{Deserialize, Serialize};

use crate::vote::Aggregate;

/// Body of `POST /vote`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteRequest {
    /// Latitude of the clicked point.
    pub lat: Option<f64>,
    /// Longitude of the clicked point.
    pub lng: Option<f64>,
    /// `"safe"` or `"unsafe"`.
    pub safety: Option<String>,
}

/// Body of `POST /feedback`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// Location key, `"<lat>,<lng>"`.
    #[serde(rename = "latlngKey")]
    pub latlng_key: Option<String>,
    /// `"safe"` or `"unsafe"`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Acknowledgement returned by `POST /vote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable acknowledgement.
    pub message: String,
}

impl MessageResponse {
    /// The acknowledgement for a stored vote.
    #[must_use]
    pub fn vote_submitted() -> Self {
        Self {
            message: "Vote submitted".to_string(),
        }
    }
}

/// Counts returned by the feedback endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResponse {
    /// Number of safe votes.
    #[serde(rename = "safe")]
    pub safe_votes: u64,
    /// Number of unsafe votes.
    #[serde(rename = "unsafe")]
    pub unsafe_votes: u64,
}

impl From<Aggregate> for AggregateResponse {
    fn from(aggregate: Aggregate) -> Self {
        Self {
            safe_votes: aggregate.safe_count,
            unsafe_votes: aggregate.unsafe_count,
        }
    }
}

impl From<AggregateResponse> for Aggregate {
    fn from(response: AggregateResponse) -> Self {
        Self {
            safe_count: response.safe_votes,
            unsafe_count: response.unsafe_votes,
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short, client-safe description.
    pub error: String,
}
