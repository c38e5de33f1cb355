//! Traffic delay classification.
//!
//! Maps a free-flow duration and a traffic-adjusted duration onto a
//! qualitative congestion label using the delay ratio
//! `(in_traffic - duration) / duration`:
//!
//! | ratio         | condition |
//! |---------------|-----------|
//! | `< 0.10`      | light     |
//! | `0.10..0.30`  | moderate  |
//! | `0.30..0.50`  | heavy     |
//! | `>= 0.50`     | severe    |
//!
//! A ratio sitting exactly on a threshold lands in the more severe bucket.

use serde::Serialize;
use std::fmt;

use crate::error::{Result, RouteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficCondition {
    Light,
    Moderate,
    Heavy,
    Severe,
}

impl TrafficCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficCondition::Light => "light",
            TrafficCondition::Moderate => "moderate",
            TrafficCondition::Heavy => "heavy",
            TrafficCondition::Severe => "severe",
        }
    }

    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 0.10 {
            TrafficCondition::Light
        } else if ratio < 0.30 {
            TrafficCondition::Moderate
        } else if ratio < 0.50 {
            TrafficCondition::Heavy
        } else {
            TrafficCondition::Severe
        }
    }
}

impl fmt::Display for TrafficCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify congestion from the two durations (seconds).
///
/// A zero free-flow duration has no meaningful ratio and is rejected.
/// Traffic faster than free flow (negative delay) is `Light`.
pub fn classify(
    duration_seconds: u64,
    duration_in_traffic_seconds: u64,
) -> Result<TrafficCondition> {
    if duration_seconds == 0 {
        return Err(RouteError::InvalidRoute(
            "route duration is zero, traffic delay ratio is undefined".to_string(),
        ));
    }
    let delay = duration_in_traffic_seconds as f64 - duration_seconds as f64;
    Ok(TrafficCondition::from_ratio(delay / duration_seconds as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets() {
        assert_eq!(classify(1000, 1050).unwrap(), TrafficCondition::Light);
        assert_eq!(classify(1000, 1150).unwrap(), TrafficCondition::Moderate);
        assert_eq!(classify(1000, 1350).unwrap(), TrafficCondition::Heavy);
        assert_eq!(classify(1000, 1600).unwrap(), TrafficCondition::Severe);
    }

    #[test]
    fn test_boundaries_go_to_more_severe_bucket() {
        assert_eq!(classify(600, 660).unwrap(), TrafficCondition::Moderate);
        assert_eq!(classify(600, 780).unwrap(), TrafficCondition::Heavy);
        assert_eq!(classify(600, 900).unwrap(), TrafficCondition::Severe);
    }

    #[test]
    fn test_no_delay_and_negative_delay_are_light() {
        assert_eq!(classify(600, 600).unwrap(), TrafficCondition::Light);
        assert_eq!(classify(600, 500).unwrap(), TrafficCondition::Light);
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert!(matches!(classify(0, 120), Err(RouteError::InvalidRoute(_))));
    }

    #[test]
    fn test_serialized_label() {
        assert_eq!(
            serde_json::to_value(TrafficCondition::Heavy).unwrap(),
            serde_json::json!("heavy")
        );
    }
}
