//! Billing rate models. Maps to the `rates` table.

use airmail_core::rate::{Rate, RateType};
use airmail_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `rates` table.
///
/// `rate_type` is free text in the database; unknown values survive the
/// round trip and compute to zero.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RateRow {
    pub id: DbId,
    pub name: String,
    pub rate_type: String,
    pub base_rate: f64,
    pub multiplier: Option<f64>,
    pub currency: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<RateRow> for Rate {
    fn from(row: RateRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            rate_type: RateType::from_str_value(&row.rate_type),
            base_rate: row.base_rate,
            multiplier: row.multiplier,
            currency: row.currency,
            is_active: row.is_active,
        }
    }
}

/// DTO for inserting a new rate.
#[derive(Debug, Deserialize)]
pub struct CreateRate {
    pub name: String,
    pub rate_type: String,
    pub base_rate: f64,
    pub multiplier: Option<f64>,
    pub currency: Option<String>,
}
