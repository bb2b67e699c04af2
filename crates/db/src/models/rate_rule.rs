//! Rate rule models. Maps to the `rate_rules` table.

use airmail_core::condition::RuleCondition;
use airmail_core::rate::{Rate, RateType};
use airmail_core::rule::{RateRuleRow, Rule, RuleAction};
use airmail_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::decode_conditions;

/// A row from the `rate_rules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RateRuleEntry {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub priority: i32,
    pub conditions: serde_json::Value,
    pub rate_id: Option<DbId>,
    pub match_count: i64,
    pub last_run: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A rate rule left-joined with its rate. Rate columns are `NULL` when the
/// rule has no rate or the rate row is missing.
#[derive(Debug, Clone, FromRow)]
pub struct RateRuleWithRate {
    pub id: DbId,
    pub name: String,
    pub is_active: bool,
    pub priority: i32,
    pub conditions: serde_json::Value,
    pub rate_id: Option<DbId>,
    pub match_count: i64,
    pub last_run: Option<Timestamp>,
    pub joined_rate_id: Option<DbId>,
    pub rate_name: Option<String>,
    pub rate_type: Option<String>,
    pub base_rate: Option<f64>,
    pub multiplier: Option<f64>,
    pub currency: Option<String>,
    pub rate_is_active: Option<bool>,
}

impl From<RateRuleWithRate> for RateRuleRow {
    fn from(row: RateRuleWithRate) -> Self {
        let rate = row.joined_rate_id.map(|id| Rate {
            id,
            name: row.rate_name.unwrap_or_default(),
            rate_type: row
                .rate_type
                .as_deref()
                .map_or(RateType::Unknown, RateType::from_str_value),
            base_rate: row.base_rate.unwrap_or_default(),
            multiplier: row.multiplier,
            currency: row.currency,
            is_active: row.rate_is_active.unwrap_or(false),
        });
        Self {
            rule: Rule {
                conditions: decode_conditions("rate_rules", row.id, row.conditions),
                id: row.id,
                name: row.name,
                is_active: row.is_active,
                priority: row.priority,
                action: RuleAction::AssignRate {
                    rate_id: row.rate_id,
                },
                match_count: row.match_count,
                last_run: row.last_run,
            },
            rate,
        }
    }
}

/// DTO for inserting a new rate rule.
#[derive(Debug, Deserialize)]
pub struct CreateRateRule {
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub conditions: Vec<RuleCondition>,
    pub rate_id: DbId,
}
