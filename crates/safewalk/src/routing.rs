//! Walking routes from an external routing service.
//!
//! Routing itself is delegated to OpenRouteService. This module is the only
//! place that knows the service wants `[longitude, latitude]` pairs; every
//! other part of safewalk works in (latitude, longitude).
//!
//! See <https://openrouteservice.org/dev/#/api-docs/v2/directions>

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::RoutingConfig;
use crate::error::{Error, Result};
use crate::vote::LatLng;

/// A walking route as an ordered list of points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    /// Points along the route, start to finish, in (latitude, longitude).
    pub points: Vec<LatLng>,
    /// Total length reported by the service, in meters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    /// Expected walking time reported by the service, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

/// Something that can compute a walking route between two points.
#[async_trait]
pub trait RouteProvider: Send + Sync + std::fmt::Debug {
    /// Compute a walking route from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] if the service fails or finds no route.
    async fn walking_route(&self, from: LatLng, to: LatLng) -> Result<Route>;
}

/// OpenRouteService directions client.
#[derive(Debug, Clone)]
pub struct OpenRouteService {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenRouteService {
    /// Build a client from the routing configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] if the HTTP client cannot be constructed.
    pub fn new(config: &RoutingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl RouteProvider for OpenRouteService {
    async fn walking_route(&self, from: LatLng, to: LatLng) -> Result<Route> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::upstream("routing API key is not configured"))?;

        debug!("Requesting walking route {from:?} -> {to:?}");
        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, api_key)
            .json(&request_body(from, to))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Routing service returned {status}: {body}");
            return Err(Error::upstream(format!("routing service returned {status}")));
        }

        let body: serde_json::Value = resp.json().await?;
        parse_route(&body)
    }
}

/// Validate raw coordinates and ask `provider` for a walking route.
///
/// # Errors
///
/// Returns [`Error::Validation`] for an out-of-range coordinate, before any
/// request is made, or whatever the provider returns.
pub async fn plan_walk(
    provider: &dyn RouteProvider,
    (from_lat, from_lng): (f64, f64),
    (to_lat, to_lng): (f64, f64),
) -> Result<Route> {
    let from = LatLng::new(from_lat, from_lng)?;
    let to = LatLng::new(to_lat, to_lng)?;
    provider.walking_route(from, to).await
}

/// Directions request body; the service takes `[lng, lat]` pairs.
fn request_body(from: LatLng, to: LatLng) -> serde_json::Value {
    serde_json::json!({
        "coordinates": [[from.lng, from.lat], [to.lng, to.lat]],
    })
}

/// Pull the first route out of a GeoJSON directions response.
fn parse_route(body: &serde_json::Value) -> Result<Route> {
    let feature = body["features"]
        .as_array()
        .and_then(|features| features.first())
        .ok_or_else(|| Error::upstream("no route found"))?;

    let coordinates = feature["geometry"]["coordinates"]
        .as_array()
        .ok_or_else(|| Error::upstream("route has no geometry"))?;

    let points = coordinates
        .iter()
        .map(|pair| {
            let lng = pair[0].as_f64();
            let lat = pair[1].as_f64();
            match (lat, lng) {
                (Some(lat), Some(lng)) => LatLng::new(lat, lng)
                    .map_err(|e| Error::upstream(format!("bad route point: {e}"))),
                _ => Err(Error::upstream(format!("malformed route point: {pair}"))),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    if points.is_empty() {
        return Err(Error::upstream("no route found"));
    }

    let summary = &feature["properties"]["summary"];
    Ok(Route {
        points,
        distance_meters: summary["distance"].as_f64(),
        duration_seconds: summary["duration"].as_f64(),
    })
}
