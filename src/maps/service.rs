//! Route service: provider queries in, normalized routes out.

use std::sync::Arc;

use chrono::{Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use super::fanout::{fan_out, FanOutPolicy};
use super::{DirectionsApi, DirectionsRequest, DirectionsResponse, ProviderRoute};
use crate::config::RoutingConfig;
use crate::error::{Result, RouteError};
use crate::types::{
    AlternativeTime, DepartureTime, NormalizedRoute, RouteQuery, Step, TollInfo, TrafficModel,
    TrafficQuery, TrafficSnapshot,
};

/// How the canonical route is picked out of the provider's result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSelection {
    /// Trust the provider ranking: take the first route.
    ProviderRanked,
    /// Take the route with the lowest traffic-adjusted duration.
    ShortestDuration,
}

impl RouteSelection {
    pub fn select<'a>(&self, routes: &'a [ProviderRoute]) -> Option<&'a ProviderRoute> {
        match self {
            RouteSelection::ProviderRanked => routes.first(),
            RouteSelection::ShortestDuration => routes
                .iter()
                .min_by_key(|route| route.duration_in_traffic_seconds()),
        }
    }
}

pub const CANONICAL_ROUTE_SELECTION: RouteSelection = RouteSelection::ProviderRanked;

impl Default for RouteSelection {
    fn default() -> Self {
        CANONICAL_ROUTE_SELECTION
    }
}

/// Departure offsets (minutes from now) sampled by the live traffic lookup.
pub const TRAFFIC_SAMPLE_OFFSETS_MINUTES: [i64; 3] = [30, 60, 120];

/// Issues route and traffic queries against a `DirectionsApi`.
pub struct RouteService {
    client: Arc<dyn DirectionsApi>,
    routing: RoutingConfig,
}

impl RouteService {
    pub fn new(client: Arc<dyn DirectionsApi>, routing: RoutingConfig) -> Self {
        Self { client, routing }
    }

    pub fn default_traffic_model(&self) -> TrafficModel {
        self.routing.default_traffic_model
    }

    pub fn max_alternatives(&self) -> usize {
        self.routing.max_alternatives
    }

    /// Query the provider and return the canonical route for `query`.
    pub async fn calculate_route(&self, query: &RouteQuery) -> Result<NormalizedRoute> {
        let request = self.build_request(query)?;
        self.fetch(&request).await
    }

    /// Current traffic for a trip plus samples for later departures.
    ///
    /// Only the primary query can fail the call; a failed sample is logged
    /// and left out of `alternative_times`.
    pub async fn get_traffic_info(&self, query: &TrafficQuery) -> Result<TrafficSnapshot> {
        let primary_request = DirectionsRequest {
            origin: query.origin.clone(),
            destination: query.destination.clone(),
            waypoints: Vec::new(),
            avoid: None,
            departure_time: Some(query.departure_time),
            traffic_model: self.default_traffic_model(),
            alternatives: false,
        };

        let now = Utc::now();
        let sample_requests: Vec<(i64, DirectionsRequest)> = TRAFFIC_SAMPLE_OFFSETS_MINUTES
            .iter()
            .map(|&minutes| {
                let departure = now + Duration::minutes(minutes);
                let request = DirectionsRequest {
                    departure_time: Some(DepartureTime::At(departure)),
                    ..primary_request.clone()
                };
                (minutes, request)
            })
            .collect();

        let sample_tasks = sample_requests
            .iter()
            .map(|(minutes, request)| {
                let label = format!("traffic sample +{}min", minutes);
                (label, self.fetch(request))
            })
            .collect::<Vec<_>>();

        let (primary, samples) = tokio::join!(
            self.fetch(&primary_request),
            fan_out(FanOutPolicy::BestEffort, sample_tasks)
        );
        let route = primary?;
        let samples = samples?;

        let alternative_times = sample_requests
            .iter()
            .filter_map(|(minutes, request)| {
                let label = format!("traffic sample +{}min", minutes);
                let (_, sampled) = samples.iter().find(|(l, _)| *l == label)?;
                let departure_time = match request.departure_time {
                    Some(DepartureTime::At(at)) => at,
                    _ => return None,
                };
                Some(AlternativeTime {
                    offset_minutes: *minutes,
                    departure_time,
                    duration_in_traffic_seconds: sampled.duration_in_traffic_seconds,
                })
            })
            .collect();

        Ok(TrafficSnapshot {
            duration_seconds: route.duration_seconds,
            duration_in_traffic_seconds: route.duration_in_traffic_seconds,
            route,
            alternative_times,
        })
    }

    fn build_request(&self, query: &RouteQuery) -> Result<DirectionsRequest> {
        if query.waypoints.len() > self.routing.max_waypoints {
            return Err(RouteError::InvalidArguments(format!(
                "{} waypoints given, at most {} are allowed",
                query.waypoints.len(),
                self.routing.max_waypoints
            )));
        }

        Ok(DirectionsRequest {
            origin: query.origin.clone(),
            destination: query.destination.clone(),
            waypoints: query.waypoints.clone(),
            avoid: query.options.avoid_tokens(),
            // the provider ignores traffic_model (and returns no traffic
            // duration) unless a departure time is set
            departure_time: Some(query.options.departure_time.unwrap_or(DepartureTime::Now)),
            traffic_model: query
                .options
                .traffic_model
                .unwrap_or(self.routing.default_traffic_model),
            alternatives: query.options.alternatives,
        })
    }

    async fn fetch(&self, request: &DirectionsRequest) -> Result<NormalizedRoute> {
        debug!(
            "[{}] directions {} -> {} (waypoints: {}, avoid: {:?}, departure: {:?})",
            self.client.name(),
            request.origin,
            request.destination,
            request.waypoints.len(),
            request.avoid,
            request.departure_time
        );

        let response = self.client.directions(request).await?;
        let response = check_status(response, request)?;

        let route = self.routing.route_selection.select(&response.routes).ok_or_else(|| {
            RouteError::NoRouteFound(format!(
                "no routes from {} to {}",
                request.origin, request.destination
            ))
        })?;

        Ok(format_route_response(route))
    }
}

fn check_status(
    response: DirectionsResponse,
    request: &DirectionsRequest,
) -> Result<DirectionsResponse> {
    let status = response.status.clone();
    let detail = response.error_message.clone().unwrap_or_default();
    match status.as_str() {
        "OK" => Ok(response),
        "ZERO_RESULTS" | "NOT_FOUND" => Err(RouteError::NoRouteFound(format!(
            "{} -> {}: {} {}",
            request.origin, request.destination, status, detail
        )
        .trim_end()
        .to_string())),
        status => Err(RouteError::Provider(if detail.is_empty() {
            status.to_string()
        } else {
            format!("{}: {}", status, detail)
        })),
    }
}

/// Reshape one provider route into a `NormalizedRoute`.
pub fn format_route_response(route: &ProviderRoute) -> NormalizedRoute {
    let steps = route
        .legs
        .iter()
        .flat_map(|leg| leg.steps.iter())
        .map(|step| Step {
            instruction: strip_html(&step.html_instructions),
            distance_text: step.distance.text.clone(),
            duration_text: step.duration.text.clone(),
            maneuver: step.maneuver,
        })
        .collect();

    let toll_warnings: Vec<String> = route
        .warnings
        .iter()
        .filter(|w| w.to_lowercase().contains("toll"))
        .cloned()
        .collect();

    NormalizedRoute {
        summary: route.summary.clone(),
        distance_meters: route.distance_meters(),
        duration_seconds: route.duration_seconds(),
        duration_in_traffic_seconds: route.duration_in_traffic_seconds(),
        polyline: route
            .overview_polyline
            .as_ref()
            .map(|p| p.points.clone())
            .unwrap_or_default(),
        steps,
        warnings: route.warnings.clone(),
        toll_info: TollInfo {
            has_tolls: !toll_warnings.is_empty(),
            warnings: toll_warnings,
            estimated_cost: None,
        },
        bounds: route.bounds,
        copyrights: route.copyrights.clone(),
    }
}

/// Drop every `<...>` tag. An unterminated `<` is kept as text.
pub fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('<') {
        match rest[start..].find('>') {
            Some(len) => {
                out.push_str(&rest[..start]);
                rest = &rest[start + len + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::testing::{route_body, FakeDirections};
    use serde_json::json;

    fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Runtime::new().unwrap()
    }

    fn service(fake: Arc<FakeDirections>) -> RouteService {
        RouteService::new(fake, RoutingConfig::default())
    }

    fn provider_route(value: serde_json::Value) -> ProviderRoute {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("Turn <b>left</b> onto Main St"),
            "Turn left onto Main St"
        );
        assert_eq!(
            strip_html("Keep right<div style=\"font-size:0.9em\">Toll road</div>"),
            "Keep rightToll road"
        );
        assert_eq!(strip_html("a < b"), "a < b");
        assert_eq!(strip_html("plain"), "plain");
    }

    #[test]
    fn test_traffic_duration_defaults_to_duration() {
        let body = route_body("I-95", 10_000, 600, None);
        let route = provider_route(body["routes"][0].clone());
        let normalized = format_route_response(&route);
        assert_eq!(normalized.duration_seconds, 600);
        assert_eq!(normalized.duration_in_traffic_seconds, 600);
    }

    #[test]
    fn test_format_route_response() {
        let route = provider_route(json!({
            "summary": "A1",
            "legs": [
                {
                    "distance": { "text": "5 km", "value": 5000 },
                    "duration": { "text": "6 mins", "value": 360 },
                    "duration_in_traffic": { "text": "8 mins", "value": 480 },
                    "steps": [{
                        "html_instructions": "Turn <b>left</b> onto Main St",
                        "distance": { "text": "5 km", "value": 5000 },
                        "duration": { "text": "6 mins", "value": 360 },
                        "maneuver": "turn-left"
                    }]
                },
                {
                    "distance": { "text": "3 km", "value": 3000 },
                    "duration": { "text": "4 mins", "value": 240 },
                    "steps": []
                }
            ],
            "overview_polyline": { "points": "xyz" },
            "warnings": ["This route has TOLLS.", "Walking directions may be incomplete"],
            "copyrights": "Map data"
        }));

        let normalized = format_route_response(&route);
        assert_eq!(normalized.distance_meters, 8000);
        assert_eq!(normalized.duration_seconds, 600);
        assert_eq!(normalized.duration_in_traffic_seconds, 720);
        assert_eq!(normalized.polyline, "xyz");
        assert_eq!(normalized.steps.len(), 1);
        assert_eq!(normalized.steps[0].instruction, "Turn left onto Main St");
        assert_eq!(
            normalized.steps[0].maneuver,
            Some(crate::types::Maneuver::TurnLeft)
        );
        assert!(normalized.toll_info.has_tolls);
        assert_eq!(normalized.toll_info.warnings, vec!["This route has TOLLS."]);
        assert_eq!(normalized.toll_info.estimated_cost, None);
        assert_eq!(normalized.warnings.len(), 2);
    }

    #[test]
    fn test_route_selection_policies() {
        let slow = provider_route(route_body("slow", 1000, 900, Some(1200))["routes"][0].clone());
        let fast = provider_route(route_body("fast", 2000, 600, Some(700))["routes"][0].clone());
        let routes = vec![slow, fast];

        let first = RouteSelection::ProviderRanked.select(&routes).unwrap();
        assert_eq!(first.summary, "slow");
        let quickest = RouteSelection::ShortestDuration.select(&routes).unwrap();
        assert_eq!(quickest.summary, "fast");
        assert!(RouteSelection::ProviderRanked.select(&[]).is_none());
    }

    #[test]
    fn test_calculate_route_builds_request() {
        let rt = rt();
        rt.block_on(async {
            let fake = Arc::new(FakeDirections::always(route_body("I-80", 1000, 60, Some(90))));
            let service = service(fake.clone());

            let query = RouteQuery::new("Boston, MA", "New York, NY")
                .with_waypoints(vec!["Hartford, CT".to_string()])
                .with_options(crate::types::RouteOptions {
                    avoid_tolls: true,
                    avoid_highways: true,
                    departure_time: Some(DepartureTime::Now),
                    ..Default::default()
                });
            let route = service.calculate_route(&query).await.unwrap();
            assert_eq!(route.summary, "I-80");
            assert_eq!(route.duration_in_traffic_seconds, 90);

            let requests = fake.requests();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].avoid.as_deref(), Some("tolls|highways"));
            assert_eq!(requests[0].waypoints, vec!["Hartford, CT"]);
            assert_eq!(requests[0].traffic_model, TrafficModel::BestGuess);
            assert_eq!(requests[0].departure_time, Some(DepartureTime::Now));
        });
    }

    #[test]
    fn test_missing_departure_defaults_to_now() {
        let rt = rt();
        rt.block_on(async {
            let fake = Arc::new(FakeDirections::always(route_body("I-80", 1000, 60, Some(90))));
            let query = RouteQuery::new("a", "b").with_options(crate::types::RouteOptions {
                traffic_model: Some(TrafficModel::Pessimistic),
                ..Default::default()
            });
            service(fake.clone()).calculate_route(&query).await.unwrap();

            let requests = fake.requests();
            assert_eq!(requests[0].departure_time, Some(DepartureTime::Now));
            assert_eq!(requests[0].traffic_model, TrafficModel::Pessimistic);
        });
    }

    #[test]
    fn test_configured_selection_is_used() {
        let rt = rt();
        rt.block_on(async {
            let mut body = route_body("slow", 1000, 900, Some(1200));
            let fast = route_body("fast", 2000, 600, Some(700));
            body["routes"]
                .as_array_mut()
                .unwrap()
                .push(fast["routes"][0].clone());
            let fake = Arc::new(FakeDirections::always(body));
            let routing = RoutingConfig {
                route_selection: RouteSelection::ShortestDuration,
                ..Default::default()
            };
            let route = RouteService::new(fake, routing)
                .calculate_route(&RouteQuery::new("a", "b"))
                .await
                .unwrap();
            assert_eq!(route.summary, "fast");
        });
    }

    #[test]
    fn test_zero_results_is_no_route() {
        let rt = rt();
        rt.block_on(async {
            let fake = Arc::new(FakeDirections::always(json!({
                "status": "ZERO_RESULTS",
                "routes": []
            })));
            let result = service(fake)
                .calculate_route(&RouteQuery::new("Honolulu", "Tokyo"))
                .await;
            assert!(matches!(result, Err(RouteError::NoRouteFound(_))));
        });
    }

    #[test]
    fn test_ok_with_empty_routes_is_no_route() {
        let rt = rt();
        rt.block_on(async {
            let fake = Arc::new(FakeDirections::always(json!({ "status": "OK", "routes": [] })));
            let result = service(fake).calculate_route(&RouteQuery::new("a", "b")).await;
            assert!(matches!(result, Err(RouteError::NoRouteFound(_))));
        });
    }

    #[test]
    fn test_denied_is_provider_error_with_message() {
        let rt = rt();
        rt.block_on(async {
            let fake = Arc::new(FakeDirections::always(json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid."
            })));
            let err = service(fake)
                .calculate_route(&RouteQuery::new("a", "b"))
                .await
                .unwrap_err();
            assert!(matches!(err, RouteError::Provider(_)));
            assert!(err.to_string().contains("The provided API key is invalid."));
        });
    }

    #[test]
    fn test_too_many_waypoints() {
        let rt = rt();
        rt.block_on(async {
            let fake = Arc::new(FakeDirections::always(route_body("x", 1, 1, None)));
            let routing = RoutingConfig {
                max_waypoints: 1,
                ..Default::default()
            };
            let service = RouteService::new(fake.clone(), routing);
            let query = RouteQuery::new("a", "b")
                .with_waypoints(vec!["c".to_string(), "d".to_string()]);
            let result = service.calculate_route(&query).await;
            assert!(matches!(result, Err(RouteError::InvalidArguments(_))));
            assert!(fake.requests().is_empty());
        });
    }

    #[test]
    fn test_traffic_info_samples_later_departures() {
        let rt = rt();
        rt.block_on(async {
            let fake = Arc::new(FakeDirections::new(|request| {
                let in_traffic = match request.departure_time {
                    Some(DepartureTime::Now) => 900,
                    _ => 700,
                };
                Ok(serde_json::from_value(route_body("I-5", 20_000, 600, Some(in_traffic)))?)
            }));
            let snapshot = service(fake.clone())
                .get_traffic_info(&TrafficQuery {
                    origin: "Seattle".to_string(),
                    destination: "Tacoma".to_string(),
                    departure_time: DepartureTime::Now,
                })
                .await
                .unwrap();

            assert_eq!(fake.requests().len(), 4);
            assert_eq!(snapshot.duration_seconds, 600);
            assert_eq!(snapshot.duration_in_traffic_seconds, 900);
            let offsets: Vec<i64> = snapshot
                .alternative_times
                .iter()
                .map(|a| a.offset_minutes)
                .collect();
            assert_eq!(offsets, vec![30, 60, 120]);
            assert!(snapshot
                .alternative_times
                .iter()
                .all(|a| a.duration_in_traffic_seconds == 700));
        });
    }

    #[test]
    fn test_traffic_info_tolerates_failed_sample() {
        let rt = rt();
        rt.block_on(async {
            let fake = Arc::new(FakeDirections::new(|request| match request.departure_time {
                Some(DepartureTime::Now) => {
                    Ok(serde_json::from_value(route_body("I-5", 20_000, 600, Some(660)))?)
                }
                Some(DepartureTime::At(at)) if at > Utc::now() + Duration::minutes(90) => {
                    Err(RouteError::Provider("OVER_QUERY_LIMIT".to_string()))
                }
                _ => Ok(serde_json::from_value(route_body("I-5", 20_000, 600, Some(640)))?),
            }));
            let snapshot = service(fake)
                .get_traffic_info(&TrafficQuery {
                    origin: "a".to_string(),
                    destination: "b".to_string(),
                    departure_time: DepartureTime::Now,
                })
                .await
                .unwrap();
            let offsets: Vec<i64> = snapshot
                .alternative_times
                .iter()
                .map(|a| a.offset_minutes)
                .collect();
            assert_eq!(offsets, vec![30, 60]);
        });
    }

    #[test]
    fn test_traffic_info_fails_when_primary_fails() {
        let rt = rt();
        rt.block_on(async {
            let fake = Arc::new(FakeDirections::new(|request| match request.departure_time {
                Some(DepartureTime::Now) => Err(RouteError::Provider("timeout".to_string())),
                _ => Ok(serde_json::from_value(route_body("x", 1, 1, None))?),
            }));
            let result = service(fake)
                .get_traffic_info(&TrafficQuery {
                    origin: "a".to_string(),
                    destination: "b".to_string(),
                    departure_time: DepartureTime::Now,
                })
                .await;
            assert!(matches!(result, Err(RouteError::Provider(_))));
        });
    }
}
