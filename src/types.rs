//! Core data types used throughout routeplanner.
//!
//! This module defines the route query, the normalized route shape that every
//! tool returns, and the tool catalog / tool output formats exchanged with the
//! protocol front-end.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RouteError;

// --- Query Types ---

/// Provider-side prediction mode for how congestion affects duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficModel {
    #[default]
    BestGuess,
    Pessimistic,
    Optimistic,
}

impl TrafficModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficModel::BestGuess => "best_guess",
            TrafficModel::Pessimistic => "pessimistic",
            TrafficModel::Optimistic => "optimistic",
        }
    }
}

impl fmt::Display for TrafficModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When the trip starts: right now, or at a fixed instant.
///
/// Accepted as the string `"now"` or an ISO 8601 datetime. A datetime
/// without an offset is read as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DepartureTime {
    Now,
    At(DateTime<Utc>),
}

impl DepartureTime {
    pub fn parse(input: &str) -> Result<Self, RouteError> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("now") {
            return Ok(DepartureTime::Now);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(DepartureTime::At(dt.with_timezone(&Utc)));
        }
        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(DepartureTime::At(naive.and_utc()));
            }
        }
        Err(RouteError::InvalidArguments(format!(
            "departureTime must be \"now\" or an ISO 8601 datetime, got '{}'",
            input
        )))
    }
}

impl TryFrom<String> for DepartureTime {
    type Error = RouteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DepartureTime::parse(&value)
    }
}

impl From<DepartureTime> for String {
    fn from(value: DepartureTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DepartureTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepartureTime::Now => f.write_str("now"),
            DepartureTime::At(dt) => f.write_str(&dt.to_rfc3339()),
        }
    }
}

/// Caller-selected routing options.
///
/// `traffic_model` stays `None` when the caller did not pick one; the route
/// service substitutes the configured default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteOptions {
    pub avoid_tolls: bool,
    pub avoid_highways: bool,
    pub avoid_ferries: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<DepartureTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traffic_model: Option<TrafficModel>,
    #[serde(skip_serializing)]
    pub alternatives: bool,
}

impl RouteOptions {
    /// Fold the avoid flags into the provider's `a|b|c` token list.
    ///
    /// Returns `None` when nothing is avoided so the parameter is left out
    /// of the request entirely.
    pub fn avoid_tokens(&self) -> Option<String> {
        let tokens: Vec<&str> = [
            (self.avoid_tolls, "tolls"),
            (self.avoid_highways, "highways"),
            (self.avoid_ferries, "ferries"),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, token)| token)
        .collect();

        if tokens.is_empty() {
            None
        } else {
            Some(tokens.join("|"))
        }
    }
}

/// A desired trip: endpoints, intermediate stops and options.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    pub origin: String,
    pub destination: String,
    pub waypoints: Vec<String>,
    pub options: RouteOptions,
}

impl RouteQuery {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            waypoints: Vec::new(),
            options: RouteOptions::default(),
        }
    }

    pub fn with_waypoints(mut self, waypoints: Vec<String>) -> Self {
        self.waypoints = waypoints;
        self
    }

    pub fn with_options(mut self, options: RouteOptions) -> Self {
        self.options = options;
        self
    }
}

/// Input of the live traffic lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficQuery {
    pub origin: String,
    pub destination: String,
    pub departure_time: DepartureTime,
}

// --- Normalized Route ---

/// Turn-by-turn maneuver reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Maneuver {
    TurnLeft,
    TurnRight,
    TurnSlightLeft,
    TurnSlightRight,
    TurnSharpLeft,
    TurnSharpRight,
    UturnLeft,
    UturnRight,
    Straight,
    RampLeft,
    RampRight,
    Merge,
    ForkLeft,
    ForkRight,
    KeepLeft,
    KeepRight,
    RoundaboutLeft,
    RoundaboutRight,
    Ferry,
    FerryTrain,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub instruction: String,
    #[serde(default)]
    pub distance_text: String,
    #[serde(default)]
    pub duration_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maneuver: Option<Maneuver>,
}

/// Best-effort toll signal derived from route warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TollInfo {
    pub has_tolls: bool,
    pub warnings: Vec<String>,
    pub estimated_cost: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub northeast: LatLng,
    pub southwest: LatLng,
}

/// The provider-agnostic route shape returned by every tool.
///
/// Also accepted back as input by `estimate_costs`; see `RouteInput` for the
/// defaults applied then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RouteInput")]
pub struct NormalizedRoute {
    pub summary: String,
    pub distance_meters: u64,
    pub duration_seconds: u64,
    pub duration_in_traffic_seconds: u64,
    pub polyline: String,
    pub steps: Vec<Step>,
    pub warnings: Vec<String>,
    pub toll_info: TollInfo,
    pub bounds: Option<Bounds>,
    pub copyrights: String,
}

/// A caller-supplied route. Only the distance is required; a missing
/// traffic duration falls back to the plain duration.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteInput {
    #[serde(default)]
    summary: String,
    distance_meters: u64,
    #[serde(default)]
    duration_seconds: u64,
    #[serde(default)]
    duration_in_traffic_seconds: Option<u64>,
    #[serde(default)]
    polyline: String,
    #[serde(default)]
    steps: Vec<Step>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    toll_info: TollInfo,
    #[serde(default)]
    bounds: Option<Bounds>,
    #[serde(default)]
    copyrights: String,
}

impl From<RouteInput> for NormalizedRoute {
    fn from(input: RouteInput) -> Self {
        Self {
            duration_in_traffic_seconds: input
                .duration_in_traffic_seconds
                .unwrap_or(input.duration_seconds),
            summary: input.summary,
            distance_meters: input.distance_meters,
            duration_seconds: input.duration_seconds,
            polyline: input.polyline,
            steps: input.steps,
            warnings: input.warnings,
            toll_info: input.toll_info,
            bounds: input.bounds,
            copyrights: input.copyrights,
        }
    }
}

/// Duration in traffic for a later departure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeTime {
    pub offset_minutes: i64,
    pub departure_time: DateTime<Utc>,
    pub duration_in_traffic_seconds: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafficSnapshot {
    pub duration_seconds: u64,
    pub duration_in_traffic_seconds: u64,
    pub route: NormalizedRoute,
    pub alternative_times: Vec<AlternativeTime>,
}

// --- Costs ---

/// Caller-supplied vehicle parameters; missing values use configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleOptions {
    /// Liters per 100 km
    pub fuel_efficiency: Option<f64>,
    /// Currency per liter
    pub fuel_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub distance_km: String,
    pub fuel_needed_liters: String,
    pub fuel_efficiency: String,
    pub fuel_price: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostAssumptions {
    pub fuel_efficiency: f64,
    pub fuel_price: f64,
    pub toll_estimate_per_km: f64,
    /// "route" when the route carried a toll estimate, "per_km_estimate" otherwise
    pub toll_source: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub fuel_cost: f64,
    pub toll_cost: f64,
    pub total_cost: f64,
    pub currency: String,
    pub breakdown: CostBreakdown,
    pub assumptions: CostAssumptions,
}

// --- Tool Catalog / Output ---

/// Describes a tool's interface via JSON Schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// What a tool call hands back to the protocol front-end.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    pub content: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(message: impl fmt::Display) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: format!("Error: {}", message),
            }],
            is_error: true,
        }
    }
}
