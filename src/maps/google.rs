//! Google Maps Directions API client.
//!
//! Implements `DirectionsApi` for
//! `GET {api_base}/directions/json`.
//!
//! Request notes:
//! - always `mode=driving` and the configured unit system
//! - `waypoints` are pipe-joined, `avoid` is left out when empty
//! - `departure_time` is `now` or unix seconds; `traffic_model` is only
//!   honoured by the API together with a departure time, so it is only sent then

use std::time::Duration;

use async_trait::async_trait;

use super::{DirectionsApi, DirectionsRequest, DirectionsResponse};
use crate::config::GoogleMapsConfig;
use crate::error::{Result, RouteError};
use crate::types::DepartureTime;

pub struct GoogleDirectionsClient {
    api_key: String,
    api_base: String,
    units: String,
    client: reqwest::Client,
}

impl GoogleDirectionsClient {
    pub fn new(api_key: String, config: &GoogleMapsConfig, units: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RouteError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            api_base: config.api_base.clone(),
            units: units.to_string(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/directions/json", self.api_base.trim_end_matches('/'))
    }

    /// Query parameters for one request, API key excluded.
    pub(crate) fn query_params(&self, request: &DirectionsRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("origin", request.origin.clone()),
            ("destination", request.destination.clone()),
            ("mode", "driving".to_string()),
            ("units", self.units.clone()),
            ("alternatives", request.alternatives.to_string()),
        ];

        if !request.waypoints.is_empty() {
            params.push(("waypoints", request.waypoints.join("|")));
        }
        if let Some(avoid) = &request.avoid {
            params.push(("avoid", avoid.clone()));
        }
        if let Some(departure) = &request.departure_time {
            let value = match departure {
                DepartureTime::Now => "now".to_string(),
                DepartureTime::At(at) => at.timestamp().to_string(),
            };
            params.push(("departure_time", value));
            params.push(("traffic_model", request.traffic_model.as_str().to_string()));
        }

        params
    }
}

#[async_trait]
impl DirectionsApi for GoogleDirectionsClient {
    async fn directions(&self, request: &DirectionsRequest) -> Result<DirectionsResponse> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&self.query_params(request))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                // reqwest errors can embed the full URL, key included
                RouteError::Provider(format!(
                    "Failed to reach Google Maps Directions API: {}",
                    e.without_url()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RouteError::Provider(format!(
                "Google Maps API error ({}): {}",
                status, error_body
            )));
        }

        response.json::<DirectionsResponse>().await.map_err(|e| {
            RouteError::Provider(format!(
                "Failed to parse Google Maps response: {}",
                e.without_url()
            ))
        })
    }

    fn name(&self) -> &str {
        "Google Maps"
    }
}
