//! Core vote types for safewalk.
//!
//! A [`Vote`] is a single community observation that a spot on a walking
//! route felt safe or unsafe. Votes are bucketed by [`LocationKey`], a
//! coordinate quantized to five decimal places (roughly 1.1m), and an
//! [`Aggregate`] is the per-bucket count derived from them.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of decimal places kept when quantizing a coordinate.
pub const KEY_PRECISION: u32 = 5;

/// Identifier assigned to a vote by the storage layer.
pub type VoteId = i64;

/// Two comma-separated decimal numbers, e.g. `28.61390,77.20900`.
static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([+-]?\d+(?:\.\d+)?)\s*,\s*([+-]?\d+(?:\.\d+)?)\s*$")
        .expect("location key pattern is valid")
});

/// Whether a voter considered a location safe or unsafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// The location felt safe.
    Safe,
    /// The location felt unsafe.
    Unsafe,
}

impl Classification {
    /// Both classifications, in display order.
    pub const ALL: [Self; 2] = [Self::Safe, Self::Unsafe];

    /// The stored and wire form of this classification.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Unsafe => "unsafe",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "safe" => Ok(Self::Safe),
            "unsafe" => Ok(Self::Unsafe),
            other => Err(Error::validation(format!(
                "classification must be \"safe\" or \"unsafe\", got {other:?}"
            ))),
        }
    }
}

/// A latitude/longitude pair in degrees.
///
/// Always (latitude, longitude). The routing service speaks
/// (longitude, latitude); that conversion happens in [`crate::routing`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees, -90 to 90.
    pub lat: f64,
    /// Longitude in degrees, -180 to 180.
    pub lng: f64,
}

impl LatLng {
    /// Create a coordinate, rejecting non-finite or out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if either component is out of range.
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(Error::validation(format!(
                "latitude must be between -90 and 90, got {lat}"
            )));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(Error::validation(format!(
                "longitude must be between -180 and 180, got {lng}"
            )));
        }
        Ok(Self { lat, lng })
    }

    /// Build a coordinate from optional request fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if either component is missing or out of range.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Result<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Self::new(lat, lng),
            (None, _) => Err(Error::validation("latitude is required")),
            (_, None) => Err(Error::validation("longitude is required")),
        }
    }

    /// The aggregation bucket this coordinate falls into.
    #[must_use]
    pub fn key(&self) -> LocationKey {
        LocationKey::quantize(*self)
    }
}

/// Aggregation bucket derived from a coordinate.
///
/// Both components are rounded to [`KEY_PRECISION`] decimal places and
/// joined with a comma. Points that round to the same value share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocationKey(String);

impl LocationKey {
    /// Quantize a coordinate into its bucket.
    #[must_use]
    pub fn quantize(point: LatLng) -> Self {
        Self(format!(
            "{},{}",
            format_component(point.lat),
            format_component(point.lng)
        ))
    }

    /// Parse a caller-supplied key and re-quantize it.
    ///
    /// Accepts any `<lat>,<lng>` pair of decimal numbers, so `28.6139,77.209`
    /// and `28.61390,77.20900` name the same bucket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the key is malformed or out of range.
    pub fn parse(raw: &str) -> Result<Self> {
        let caps = KEY_PATTERN
            .captures(raw)
            .ok_or_else(|| Error::validation(format!("malformed location key {raw:?}")))?;

        let lat: f64 = caps[1]
            .parse()
            .map_err(|_| Error::validation(format!("malformed latitude in {raw:?}")))?;
        let lng: f64 = caps[2]
            .parse()
            .map_err(|_| Error::validation(format!("malformed longitude in {raw:?}")))?;

        Ok(Self::quantize(LatLng::new(lat, lng)?))
    }

    /// The canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Round the exact binary value half away from zero, the same rule the map
/// UI's `toFixed` applies, with `-0.00000` folded into `0.00000`.
fn format_component(value: f64) -> String {
    let places = KEY_PRECISION as usize;
    let Some(exact) = Decimal::from_f64_retain(value) else {
        return format!("{value:.places$}");
    };

    let mut rounded =
        exact.round_dp_with_strategy(KEY_PRECISION, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded = Decimal::ZERO;
    }
    format!("{rounded:.places$}")
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LocationKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LocationKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<LocationKey> for String {
    fn from(key: LocationKey) -> Self {
        key.0
    }
}

/// A single stored safety observation.
///
/// Votes are immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    /// Identifier assigned by the storage layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<VoteId>,

    /// The aggregation bucket.
    pub location_key: LocationKey,

    /// Raw latitude, when the vote was submitted by coordinate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    /// Raw longitude, when the vote was submitted by coordinate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,

    /// Safe or unsafe.
    pub classification: Classification,

    /// When the vote was submitted.
    pub recorded_at: DateTime<Utc>,
}

impl Vote {
    /// Create a vote for a raw coordinate, stamped with the current time.
    #[must_use]
    pub fn at(point: LatLng, classification: Classification) -> Self {
        Self {
            id: None,
            location_key: point.key(),
            lat: Some(point.lat),
            lng: Some(point.lng),
            classification,
            recorded_at: Utc::now(),
        }
    }

    /// Create a vote for an already-quantized key, stamped with the current time.
    #[must_use]
    pub fn for_key(location_key: LocationKey, classification: Classification) -> Self {
        Self {
            id: None,
            location_key,
            lat: None,
            lng: None,
            classification,
            recorded_at: Utc::now(),
        }
    }

    /// The raw coordinate, if the vote carried one.
    #[must_use]
    pub fn coordinates(&self) -> Option<LatLng> {
        Some(LatLng {
            lat: self.lat?,
            lng: self.lng?,
        })
    }
}

/// Safe and unsafe counts for one location key.
///
/// Derived from stored votes on demand; never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    /// Number of safe votes.
    pub safe_count: u64,
    /// Number of unsafe votes.
    pub unsafe_count: u64,
}

impl Aggregate {
    /// Count one more vote of the given classification.
    pub fn record(&mut self, classification: Classification) {
        match classification {
            Classification::Safe => self.safe_count += 1,
            Classification::Unsafe => self.unsafe_count += 1,
        }
    }

    /// Count for a single classification.
    #[must_use]
    pub fn count(&self, classification: Classification) -> u64 {
        match classification {
            Classification::Safe => self.safe_count,
            Classification::Unsafe => self.unsafe_count,
        }
    }

    /// Total number of votes.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.safe_count + self.unsafe_count
    }

    /// Whether no votes were counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl<'a> FromIterator<&'a Vote> for Aggregate {
    fn from_iter<I: IntoIterator<Item = &'a Vote>>(iter: I) -> Self {
        let mut aggregate = Self::default();
        for vote in iter {
            aggregate.record(vote.classification);
        }
        aggregate
    }
}
