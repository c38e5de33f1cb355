//! Live Traffic tool implementation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{envelope, parse_args, require_non_empty, Tool};
use crate::error::Result;
use crate::maps::RouteService;
use crate::traffic::classify;
use crate::types::{DepartureTime, TrafficQuery};

pub struct LiveTrafficTool {
    service: Arc<RouteService>,
}

impl LiveTrafficTool {
    pub fn new(service: Arc<RouteService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveTrafficArgs {
    origin: String,
    destination: String,
    #[serde(default)]
    departure_time: Option<DepartureTime>,
}

#[async_trait]
impl Tool for LiveTrafficTool {
    fn name(&self) -> &str {
        "get_live_traffic"
    }

    fn description(&self) -> &str {
        "Get current traffic conditions between two locations: normal duration, \
         duration in traffic, the delay, a congestion rating (light, moderate, \
         heavy, severe) and travel times for departures 30, 60 and 120 minutes later."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "origin": {
                    "type": "string",
                    "description": "Starting point (address or \"lat,lng\")"
                },
                "destination": {
                    "type": "string",
                    "description": "End point (address or \"lat,lng\")"
                },
                "departureTime": {
                    "type": "string",
                    "description": "\"now\" (default) or an ISO 8601 datetime"
                }
            },
            "required": ["origin", "destination"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let args: LiveTrafficArgs = parse_args(self.name(), params)?;
        require_non_empty("origin", &args.origin)?;
        require_non_empty("destination", &args.destination)?;

        let query = TrafficQuery {
            origin: args.origin,
            destination: args.destination,
            departure_time: args.departure_time.unwrap_or(DepartureTime::Now),
        };
        let snapshot = self.service.get_traffic_info(&query).await?;

        let condition = classify(snapshot.duration_seconds, snapshot.duration_in_traffic_seconds)?;
        let delay_seconds =
            snapshot.duration_in_traffic_seconds as i64 - snapshot.duration_seconds as i64;

        Ok(envelope(
            json!({
                "traffic": {
                    "durationSeconds": snapshot.duration_seconds,
                    "durationInTrafficSeconds": snapshot.duration_in_traffic_seconds,
                    "trafficDelaySeconds": delay_seconds,
                    "trafficDelayMinutes": (delay_seconds as f64 / 60.0).round() as i64,
                    "trafficConditions": condition,
                    "route": snapshot.route,
                    "alternativeTimes": snapshot.alternative_times,
                }
            }),
            json!({
                "origin": query.origin,
                "destination": query.destination,
                "departureTime": query.departure_time,
                "trafficModel": self.service.default_traffic_model(),
            }),
        ))
    }
}
