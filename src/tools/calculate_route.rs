//! Calculate Route tool implementation.
//!
//! One provider query, returned as a normalized route together with the
//! traffic model that was actually used.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{envelope, parse_args, require_non_empty, Tool};
use crate::error::Result;
use crate::maps::RouteService;
use crate::types::{RouteOptions, RouteQuery};

pub struct CalculateRouteTool {
    service: Arc<RouteService>,
}

impl CalculateRouteTool {
    pub fn new(service: Arc<RouteService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalculateRouteArgs {
    origin: String,
    destination: String,
    #[serde(default)]
    waypoints: Vec<String>,
    #[serde(default)]
    options: RouteOptions,
}

#[async_trait]
impl Tool for CalculateRouteTool {
    fn name(&self) -> &str {
        "calculate_route"
    }

    fn description(&self) -> &str {
        "Calculate a driving route between two locations, optionally through \
         waypoints. Returns distance, duration, duration in traffic, \
         turn-by-turn steps, warnings and toll information."
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
                "waypoints": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Intermediate stops, visited in order"
                },
                "options": {
                    "type": "object",
                    "properties": {
                        "avoidTolls": { "type": "boolean", "description": "Avoid toll roads" },
                        "avoidHighways": { "type": "boolean", "description": "Avoid highways" },
                        "avoidFerries": { "type": "boolean", "description": "Avoid ferries" },
                        "departureTime": {
                            "type": "string",
                            "description": "\"now\" or an ISO 8601 datetime"
                        },
                        "trafficModel": {
                            "type": "string",
                            "enum": ["best_guess", "pessimistic", "optimistic"],
                            "description": "Traffic prediction model (default: best_guess)"
                        }
                    }
                }
            },
            "required": ["origin", "destination"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let args: CalculateRouteArgs = parse_args(self.name(), params)?;
        require_non_empty("origin", &args.origin)?;
        require_non_empty("destination", &args.destination)?;

        let traffic_model = args
            .options
            .traffic_model
            .unwrap_or_else(|| self.service.default_traffic_model());
        let waypoint_count = args.waypoints.len();

        let query = RouteQuery::new(args.origin, args.destination)
            .with_waypoints(args.waypoints)
            .with_options(args.options);
        let route = self.service.calculate_route(&query).await?;

        Ok(envelope(
            json!({ "route": route }),
            json!({
                "origin": query.origin,
                "destination": query.destination,
                "waypointCount": waypoint_count,
                "trafficModel": traffic_model,
            }),
        ))
    }
}
