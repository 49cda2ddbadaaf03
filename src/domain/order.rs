//! Order — commercial wrapper around a completed session, created at StopTransaction time.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub session_id: i64,
    pub charge_point_id: String,
    pub energy_kwh: f64,
    pub price_per_kwh: f64,
    pub cost: f64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(session_id: i64, charge_point_id: impl Into<String>, energy_kwh: f64, price_per_kwh: f64) -> Self {
        let cost = round_currency(energy_kwh * price_per_kwh);
        Self {
            id: 0,
            session_id,
            charge_point_id: charge_point_id.into(),
            energy_kwh,
            price_per_kwh,
            cost,
            currency: "COP".to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Rounds to two decimal places (COP minor unit), half-away-from-zero. Goes through
/// `Decimal` rather than scaling the `f64` directly so the rounding step itself can't
/// introduce representation drift.
pub fn round_currency(value: f64) -> f64 {
    Decimal::from_f64_retain(value)
        .unwrap_or_default()
        .round_dp(2)
        .to_f64()
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round_currency(0.5 * 1234.567), 617.28);
    }
}
