//! Numeric tolerances shared by model checking and solution interpretation.

/// Distance from 0/1 within which a binary value counts as integral.
pub const INTEGRALITY_EPS: f64 = 1e-6;

/// Decision boundary for reading binary variables.
pub const BINARY_THRESHOLD: f64 = 0.5;

/// Shipments at or below this quantity are treated as zero.
pub const SHIPMENT_EPS: f64 = 1e-3;

/// Allowed gap between received shipment and demand.
pub const DEMAND_EPS: f64 = 1e-3;

/// Slack allowed on capacity and generic constraint checks.
pub const FEASIBILITY_EPS: f64 = 1e-6;

pub fn is_on(value: f64) -> bool {
    value > BINARY_THRESHOLD
}

pub fn is_integral(value: f64) -> bool {
    (value - value.round()).abs() <= INTEGRALITY_EPS
}

/// Slack for a row or sum whose largest term has size `magnitude`.
pub fn feasibility_tolerance(magnitude: f64) -> f64 {
    FEASIBILITY_EPS * magnitude.abs().max(1.)
}
