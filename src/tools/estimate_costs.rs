//! Estimate Costs tool implementation.
//!
//! Costs a trip from either a route object (as returned by
//! `calculate_route`) or an origin/destination pair, in which case the route
//! is calculated first.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{envelope, parse_args, Tool};
use crate::config::CostConfig;
use crate::cost::estimate_costs;
use crate::error::{Result, RouteError};
use crate::maps::RouteService;
use crate::types::{NormalizedRoute, RouteQuery, VehicleOptions};

pub struct EstimateCostsTool {
    service: Arc<RouteService>,
    defaults: CostConfig,
}

impl EstimateCostsTool {
    pub fn new(service: Arc<RouteService>, defaults: CostConfig) -> Self {
        Self { service, defaults }
    }

    /// Use the supplied route, or calculate one from origin/destination.
    async fn resolve_route(
        &self,
        args: &EstimateCostsArgs,
    ) -> Result<(NormalizedRoute, &'static str)> {
        if let Some(route) = &args.route {
            return Ok((route.clone(), "provided"));
        }

        let origin = args.origin.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let destination = args
            .destination
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        match (origin, destination) {
            (Some(origin), Some(destination)) => {
                let route = self
                    .service
                    .calculate_route(&RouteQuery::new(origin, destination))
                    .await?;
                Ok((route, "calculated"))
            }
            _ => Err(RouteError::InsufficientData(
                "provide either a route or both origin and destination".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EstimateCostsArgs {
    #[serde(default)]
    route: Option<NormalizedRoute>,
    #[serde(default)]
    origin: Option<String>,
    #[serde(default)]
    destination: Option<String>,
    #[serde(default)]
    vehicle_options: VehicleOptions,
}

#[async_trait]
impl Tool for EstimateCostsTool {
    fn name(&self) -> &str {
        "estimate_costs"
    }

    fn description(&self) -> &str {
        "Estimate fuel and toll costs for a trip. Pass a route returned by \
         calculate_route, or an origin and destination to calculate one. \
         Vehicle fuel efficiency and fuel price fall back to configured defaults."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "route": {
                    "type": "object",
                    "description": "Route object from calculate_route (needs distanceMeters)"
                },
                "origin": {
                    "type": "string",
                    "description": "Starting point, used when no route is given"
                },
                "destination": {
                    "type": "string",
                    "description": "End point, used when no route is given"
                },
                "vehicleOptions": {
                    "type": "object",
                    "properties": {
                        "fuelEfficiency": {
                            "type": "number",
                            "description": "Fuel consumption in liters per 100 km"
                        },
                        "fuelPrice": {
                            "type": "number",
                            "description": "Fuel price per liter"
                        }
                    }
                }
            },
            "required": []
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let args: EstimateCostsArgs = parse_args(self.name(), params)?;
        let (route, source) = self.resolve_route(&args).await?;
        let costs = estimate_costs(&route, &args.vehicle_options, &self.defaults)?;

        Ok(envelope(
            json!({
                "costs": costs,
                "route": {
                    "summary": route.summary,
                    "distanceMeters": route.distance_meters,
                    "durationSeconds": route.duration_seconds,
                    "hasTolls": route.toll_info.has_tolls,
                    "source": source,
                },
            }),
            json!({ "currency": self.defaults.currency }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::testing::{route_body, FakeDirections};
    use crate::tools::test_support::{output_json, router_with, rt};
    use crate::types::ContentBlock;

    fn fake() -> Arc<FakeDirections> {
        Arc::new(FakeDirections::always(route_body("A4", 100_000, 3600, None)))
    }

    #[test]
    fn test_costs_from_route_object() {
        let rt = rt();
        rt.block_on(async {
            let fake = fake();
            let output = router_with(fake.clone())
                .call_tool(
                    "estimate_costs",
                    json!({
                        "route": { "summary": "given", "distanceMeters": 100000 },
                        "vehicleOptions": { "fuelEfficiency": 8.0, "fuelPrice": 1.5 }
                    }),
                )
                .await;
            let value = output_json(&output);
            assert_eq!(value["costs"]["fuelCost"], 12.0);
            assert_eq!(value["costs"]["tollCost"], 5.0);
            assert_eq!(value["costs"]["totalCost"], 17.0);
            assert_eq!(value["route"]["source"], "provided");
            assert!(fake.requests().is_empty());
        });
    }

    #[test]
    fn test_costs_from_origin_destination() {
        let rt = rt();
        rt.block_on(async {
            let fake = fake();
            let value = router_with(fake.clone())
                .execute(
                    "estimate_costs",
                    json!({ "origin": "Frankfurt", "destination": "Cologne" }),
                )
                .await
                .unwrap();
            assert_eq!(fake.requests().len(), 1);
            assert_eq!(value["route"]["source"], "calculated");
            assert_eq!(value["route"]["summary"], "A4");
            assert_eq!(value["costs"]["totalCost"], 17.0);
            assert_eq!(value["metadata"]["currency"], "USD");
        });
    }

    #[test]
    fn test_route_output_round_trips_into_costs() {
        let rt = rt();
        rt.block_on(async {
            let router = router_with(fake());
            let calculated = router
                .execute("calculate_route", json!({ "origin": "a", "destination": "b" }))
                .await
                .unwrap();
            let value = router
                .execute("estimate_costs", json!({ "route": calculated["route"] }))
                .await
                .unwrap();
            assert_eq!(value["costs"]["fuelCost"], 12.0);
        });
    }

    #[test]
    fn test_insufficient_data_is_error_result() {
        let rt = rt();
        rt.block_on(async {
            let router = router_with(fake());

            let output = router.call_tool("estimate_costs", json!({})).await;
            assert!(output.is_error);
            let ContentBlock::Text { text } = &output.content[0];
            assert!(text.starts_with("Error: Insufficient data"));

            let result = router
                .execute("estimate_costs", json!({ "origin": "only origin" }))
                .await;
            assert!(matches!(result, Err(RouteError::InsufficientData(_))));
        });
    }

    #[test]
    fn test_invalid_vehicle_options() {
        let rt = rt();
        rt.block_on(async {
            let result = router_with(fake())
                .execute(
                    "estimate_costs",
                    json!({
                        "route": { "distanceMeters": 1000 },
                        "vehicleOptions": { "fuelPrice": -2 }
                    }),
                )
                .await;
            assert!(matches!(result, Err(RouteError::InvalidArguments(_))));
        });
    }
}
