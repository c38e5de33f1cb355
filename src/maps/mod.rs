//! Provider Adapter module.
//!
//! This module defines the `DirectionsApi` trait that abstracts over the
//! external mapping provider, the raw response shapes it returns, and the
//! `RouteService` that turns those responses into `NormalizedRoute`s.
//!
//! Key concepts:
//! - **DirectionsApi**: one HTTP round-trip to the provider. The Google
//!   implementation lives in `google`; tests plug in a scripted fake.
//! - **RouteService**: builds provider requests from route queries, checks
//!   the provider status, selects the canonical route and normalizes it.
//! - **FanOutPolicy**: how concurrent sub-queries are joined (see `fanout`).

pub mod fanout;
pub mod google;
pub mod service;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::types::{Bounds, DepartureTime, Maneuver, TrafficModel};

pub use service::RouteService;

/// Trait that every directions provider must implement.
#[async_trait]
pub trait DirectionsApi: Send + Sync {
    /// Issue one directions query and return the decoded provider body.
    ///
    /// Implementations only fail for transport-level problems; the
    /// provider's own `status` field is interpreted by `RouteService`.
    async fn directions(&self, request: &DirectionsRequest) -> Result<DirectionsResponse>;

    /// Return the provider's display name (for logging).
    fn name(&self) -> &str;
}

/// A fully resolved provider query. Always driving mode.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsRequest {
    pub origin: String,
    pub destination: String,
    pub waypoints: Vec<String>,
    /// Pipe-joined avoid list, `None` when nothing is avoided
    pub avoid: Option<String>,
    pub departure_time: Option<DepartureTime>,
    pub traffic_model: TrafficModel,
    pub alternatives: bool,
}

// --- Provider Response Types ---
// These match the Google Directions API JSON format

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub routes: Vec<ProviderRoute>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderRoute {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub legs: Vec<ProviderLeg>,
    #[serde(default)]
    pub overview_polyline: Option<ProviderPolyline>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub bounds: Option<Bounds>,
    #[serde(default)]
    pub copyrights: String,
}

impl ProviderRoute {
    pub fn distance_meters(&self) -> u64 {
        self.legs.iter().map(|leg| leg.distance.value).sum()
    }

    pub fn duration_seconds(&self) -> u64 {
        self.legs.iter().map(|leg| leg.duration.value).sum()
    }

    /// Traffic-adjusted duration; legs without an estimate count their plain duration.
    pub fn duration_in_traffic_seconds(&self) -> u64 {
        self.legs
            .iter()
            .map(|leg| {
                leg.duration_in_traffic
                    .as_ref()
                    .unwrap_or(&leg.duration)
                    .value
            })
            .sum()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderLeg {
    pub distance: TextValue,
    pub duration: TextValue,
    #[serde(default)]
    pub duration_in_traffic: Option<TextValue>,
    #[serde(default)]
    pub steps: Vec<ProviderStep>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderStep {
    #[serde(default)]
    pub html_instructions: String,
    pub distance: TextValue,
    pub duration: TextValue,
    #[serde(default)]
    pub maneuver: Option<Maneuver>,
}

/// Provider quantity: display text plus the raw value (meters or seconds).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextValue {
    #[serde(default)]
    pub text: String,
    pub value: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderPolyline {
    pub points: String,
}
