//! `safewalk` - Community safety votes for walking routes
//!
//! This library records anonymous safe/unsafe votes against map locations,
//! buckets them by rounded coordinate, and serves per-location counts to
//! a map client. Route planning is delegated to an external service.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod feedback;
pub mod logging;
pub mod routing;
pub mod session;
pub mod storage;
pub mod vote;

pub use aggregate::AggregationService;
pub use config::Config;
pub use error::{Error, Result};
pub use feedback::{ApiError, ApiResult, FeedbackApi};
pub use logging::init_logging;
pub use routing::{OpenRouteService, Route, RouteProvider};
pub use session::{SessionCache, Verdict};
pub use storage::{SqliteVoteStore, VoteStats, VoteStore};
pub use vote::{Aggregate, Classification, LatLng, LocationKey, Vote, VoteId};
