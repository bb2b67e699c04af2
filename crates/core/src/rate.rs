//! Billing rate definitions and the rate formula.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Currency applied when a rate has none configured.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// How a rate turns a record's weight into an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateType {
    /// Flat `base_rate` regardless of weight.
    Fixed,
    /// `weight_kg * base_rate`.
    PerKg,
    /// `weight_kg * base_rate * multiplier`.
    Multiplier,
    /// Unrecognised type stored in the database; always yields zero.
    #[serde(other)]
    Unknown,
}

impl RateType {
    pub fn from_str_value(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Self::Fixed,
            "per_kg" => Self::PerKg,
            "multiplier" => Self::Multiplier,
            _ => Self::Unknown,
        }
    }
}

/// A billing definition referenced by rate-assignment rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub id: DbId,
    pub name: String,
    pub rate_type: RateType,
    pub base_rate: f64,
    pub multiplier: Option<f64>,
    pub currency: Option<String>,
    pub is_active: bool,
}

impl Rate {
    /// Configured currency, falling back to [`DEFAULT_CURRENCY`].
    pub fn currency_or_default(&self) -> &str {
        self.currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
    }

    /// A rate is usable when its numeric inputs are finite.
    pub fn is_valid(&self) -> bool {
        self.base_rate.is_finite() && self.multiplier.is_none_or(f64::is_finite)
    }
}

/// Compute the billed amount for `weight_kg` under `rate`, rounded to cents.
pub fn compute_rate_value(rate: &Rate, weight_kg: f64) -> f64 {
    let raw = match rate.rate_type {
        RateType::Fixed => rate.base_rate,
        RateType::PerKg => weight_kg * rate.base_rate,
        RateType::Multiplier => weight_kg * rate.base_rate * rate.multiplier.unwrap_or(1.0),
        RateType::Unknown => 0.0,
    };
    round_to_cents(raw)
}

/// Round to two decimals, half away from zero.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(rate_type: RateType, base_rate: f64, multiplier: Option<f64>) -> Rate {
        Rate {
            id: 1,
            name: "test".into(),
            rate_type,
            base_rate,
            multiplier,
            currency: None,
            is_active: true,
        }
    }

    #[test]
    fn fixed_ignores_weight() {
        assert_eq!(compute_rate_value(&rate(RateType::Fixed, 10.0, None), 99.0), 10.0);
    }

    #[test]
    fn per_kg_rounds_to_cents() {
        let value = compute_rate_value(&rate(RateType::PerKg, 2.5, None), 10.333);
        assert_eq!(value, 25.83);
    }

    #[test]
    fn multiplier_applies_all_three_factors() {
        let value = compute_rate_value(&rate(RateType::Multiplier, 2.0, Some(1.5)), 4.0);
        assert_eq!(value, 12.0);
    }

    #[test]
    fn unknown_type_yields_zero() {
        assert_eq!(compute_rate_value(&rate(RateType::Unknown, 5.0, None), 3.0), 0.0);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to_cents(0.125), 0.13);
        assert_eq!(round_to_cents(-0.125), -0.13);
    }

    #[test]
    fn rate_type_parsing_is_lenient() {
        assert_eq!(RateType::from_str_value(" PER_KG "), RateType::PerKg);
        assert_eq!(RateType::from_str_value("tiered"), RateType::Unknown);
    }

    #[test]
    fn currency_defaults_to_eur() {
        let mut r = rate(RateType::Fixed, 1.0, None);
        assert_eq!(r.currency_or_default(), "EUR");
        r.currency = Some("  ".into());
        assert_eq!(r.currency_or_default(), "EUR");
        r.currency = Some("USD".into());
        assert_eq!(r.currency_or_default(), "USD");
    }

    #[test]
    fn non_finite_rate_is_invalid() {
        assert!(!rate(RateType::Fixed, f64::NAN, None).is_valid());
        assert!(!rate(RateType::Multiplier, 1.0, Some(f64::INFINITY)).is_valid());
        assert!(rate(RateType::PerKg, 1.0, None).is_valid());
    }
}
