//! Trip cost estimation.
//!
//! Fuel cost comes from route distance and vehicle consumption. Toll cost is
//! the route's own estimate when one exists, otherwise a flat per-km figure.
//! Money amounts are rounded to cents.

use crate::config::CostConfig;
use crate::error::{Result, RouteError};
use crate::types::{CostAssumptions, CostBreakdown, CostEstimate, NormalizedRoute, VehicleOptions};

/// Vehicle parameters after falling back to configured defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedVehicle {
    pub fuel_efficiency: f64,
    pub fuel_price: f64,
}

/// Fill missing vehicle values from `defaults`; reject non-positive ones.
pub fn resolve_vehicle(options: &VehicleOptions, defaults: &CostConfig) -> Result<ResolvedVehicle> {
    let fuel_efficiency = positive(
        "fuelEfficiency",
        options
            .fuel_efficiency
            .unwrap_or(defaults.fuel_efficiency_l_per_100km),
    )?;
    let fuel_price = positive(
        "fuelPrice",
        options.fuel_price.unwrap_or(defaults.fuel_price_per_liter),
    )?;
    Ok(ResolvedVehicle {
        fuel_efficiency,
        fuel_price,
    })
}

fn positive(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(RouteError::InvalidArguments(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}

fn non_negative(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(RouteError::InvalidArguments(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )))
    }
}

/// Total is rounded from the unrounded parts, so it can differ from the sum
/// of the rounded fuel and toll figures by a cent.
pub fn estimate_costs(
    route: &NormalizedRoute,
    vehicle: &VehicleOptions,
    defaults: &CostConfig,
) -> Result<CostEstimate> {
    let vehicle = resolve_vehicle(vehicle, defaults)?;

    let distance_km = route.distance_meters as f64 / 1000.0;
    let fuel_needed_liters = distance_km / 100.0 * vehicle.fuel_efficiency;
    let fuel_cost = fuel_needed_liters * vehicle.fuel_price;

    let (toll_cost, toll_source) = match route.toll_info.estimated_cost {
        Some(cost) => (non_negative("tollInfo.estimatedCost", cost)?, "route"),
        None => (distance_km * defaults.toll_estimate_per_km, "per_km_estimate"),
    };

    Ok(CostEstimate {
        fuel_cost: round_cents(fuel_cost),
        toll_cost: round_cents(toll_cost),
        total_cost: round_cents(fuel_cost + toll_cost),
        currency: defaults.currency.clone(),
        breakdown: CostBreakdown {
            distance_km: format!("{:.2} km", distance_km),
            fuel_needed_liters: format!("{:.2} L", fuel_needed_liters),
            fuel_efficiency: format!("{} L/100km", vehicle.fuel_efficiency),
            fuel_price: format!("{:.2} {}/L", vehicle.fuel_price, defaults.currency),
        },
        assumptions: CostAssumptions {
            fuel_efficiency: vehicle.fuel_efficiency,
            fuel_price: vehicle.fuel_price,
            toll_estimate_per_km: defaults.toll_estimate_per_km,
            toll_source,
        },
    })
}

/// Round half up to two decimal places. Inputs are never negative.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
