//! Compare Routes tool implementation.
//!
//! Queries the default route and one route per caller-supplied option set,
//! all concurrently, then picks the fastest and the shortest. Unlike the
//! traffic samples, every query must succeed.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{envelope, parse_args, require_non_empty, Tool};
use crate::error::{Result, RouteError};
use crate::maps::fanout::{fan_out, FanOutPolicy};
use crate::maps::RouteService;
use crate::types::{NormalizedRoute, RouteOptions, RouteQuery, TollInfo, TrafficModel};

const RECOMMENDATION_REASON: &str = "Fastest route considering current traffic conditions";

pub struct CompareRoutesTool {
    service: Arc<RouteService>,
}

impl CompareRoutesTool {
    pub fn new(service: Arc<RouteService>) -> Self {
        Self { service }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompareRoutesArgs {
    origin: String,
    destination: String,
    #[serde(default)]
    waypoints: Vec<String>,
    #[serde(default = "default_true")]
    alternatives: bool,
    #[serde(default)]
    compare_options: Vec<RouteOptions>,
}

/// One compared route, without steps or polyline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComparedRoute {
    id: usize,
    description: String,
    options: RouteOptions,
    traffic_model: TrafficModel,
    summary: String,
    distance_meters: u64,
    duration_seconds: u64,
    duration_in_traffic_seconds: u64,
    warnings: Vec<String>,
    toll_info: TollInfo,
}

impl ComparedRoute {
    fn new(
        id: usize,
        description: String,
        query: &RouteQuery,
        model: TrafficModel,
        route: NormalizedRoute,
    ) -> Self {
        Self {
            id,
            description,
            options: query.options.clone(),
            traffic_model: model,
            summary: route.summary,
            distance_meters: route.distance_meters,
            duration_seconds: route.duration_seconds,
            duration_in_traffic_seconds: route.duration_in_traffic_seconds,
            warnings: route.warnings,
            toll_info: route.toll_info,
        }
    }
}

fn describe(options: &RouteOptions, index: usize) -> String {
    let mut parts = Vec::new();
    if options.avoid_tolls {
        parts.push("avoid tolls".to_string());
    }
    if options.avoid_highways {
        parts.push("avoid highways".to_string());
    }
    if options.avoid_ferries {
        parts.push("avoid ferries".to_string());
    }
    if let Some(model) = options.traffic_model {
        parts.push(format!("{} traffic", model));
    }
    if parts.is_empty() {
        format!("Option {}: default settings", index)
    } else {
        format!("Option {}: {}", index, parts.join(", "))
    }
}

#[async_trait]
impl Tool for CompareRoutesTool {
    fn name(&self) -> &str {
        "compare_routes"
    }

    fn description(&self) -> &str {
        "Compare the default route against routes computed with different options \
         (avoid tolls, avoid highways, traffic model). Returns every route with \
         the fastest, the shortest and a recommendation."
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
                "alternatives": {
                    "type": "boolean",
                    "description": "Request alternatives for the default query (default: true)"
                },
                "compareOptions": {
                    "type": "array",
                    "description": "Extra option sets; each one is queried as its own route",
                    "items": {
                        "type": "object",
                        "properties": {
                            "avoidTolls": { "type": "boolean" },
                            "avoidHighways": { "type": "boolean" },
                            "avoidFerries": { "type": "boolean" },
                            "trafficModel": {
                                "type": "string",
                                "enum": ["best_guess", "pessimistic", "optimistic"]
                            }
                        }
                    }
                }
            },
            "required": ["origin", "destination"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let args: CompareRoutesArgs = parse_args(self.name(), params)?;
        require_non_empty("origin", &args.origin)?;
        require_non_empty("destination", &args.destination)?;

        let max = self.service.max_alternatives();
        if args.compare_options.len() > max {
            return Err(RouteError::InvalidArguments(format!(
                "{} compareOptions given, at most {} are allowed",
                args.compare_options.len(),
                max
            )));
        }

        let base = RouteQuery::new(args.origin.clone(), args.destination.clone())
            .with_waypoints(args.waypoints.clone());

        let mut queries = vec![(
            "Default route".to_string(),
            base.clone().with_options(RouteOptions {
                alternatives: args.alternatives,
                ..Default::default()
            }),
        )];
        for (i, options) in args.compare_options.into_iter().enumerate() {
            let options = RouteOptions {
                alternatives: false,
                ..options
            };
            queries.push((describe(&options, i + 1), base.clone().with_options(options)));
        }

        let tasks = queries
            .iter()
            .map(|(label, query)| (label.clone(), self.service.calculate_route(query)))
            .collect::<Vec<_>>();
        let results = fan_out(FanOutPolicy::AllOrNothing, tasks).await?;

        let default_model = self.service.default_traffic_model();
        let routes: Vec<ComparedRoute> = results
            .into_iter()
            .zip(queries.iter())
            .enumerate()
            .map(|(id, ((description, route), (_, query)))| {
                let model = query.options.traffic_model.unwrap_or(default_model);
                ComparedRoute::new(id, description, query, model, route)
            })
            .collect();

        // min_by_key keeps the first of equal elements
        let fastest = routes
            .iter()
            .min_by_key(|r| r.duration_in_traffic_seconds)
            .ok_or_else(|| RouteError::NoRouteFound("no routes to compare".to_string()))?;
        let shortest = routes
            .iter()
            .min_by_key(|r| r.distance_meters)
            .ok_or_else(|| RouteError::NoRouteFound("no routes to compare".to_string()))?;

        Ok(envelope(
            json!({
                "routes": routes,
                "comparison": {
                    "fastest": fastest,
                    "shortest": shortest,
                },
                "recommendation": {
                    "recommended": fastest,
                    "reason": RECOMMENDATION_REASON,
                },
            }),
            json!({
                "origin": args.origin,
                "destination": args.destination,
                "totalRoutes": routes.len(),
            }),
        ))
    }
}
