//! Customer-assignment rule models. Maps to the `rules` table.

use airmail_core::condition::RuleCondition;
use airmail_core::rule::{Rule, RuleAction};
use airmail_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::decode_conditions;

/// A row from the `rules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RuleRow {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub priority: i32,
    pub conditions: serde_json::Value,
    /// References `customer_codes.id`.
    pub assign_to: Option<DbId>,
    pub match_count: i64,
    pub last_run: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<RuleRow> for Rule {
    fn from(row: RuleRow) -> Self {
        Self {
            conditions: decode_conditions("rules", row.id, row.conditions),
            id: row.id,
            name: row.name,
            is_active: row.is_active,
            priority: row.priority,
            action: RuleAction::AssignCustomer {
                assign_to: row.assign_to,
            },
            match_count: row.match_count,
            last_run: row.last_run,
        }
    }
}

/// DTO for inserting a new customer-assignment rule.
#[derive(Debug, Deserialize)]
pub struct CreateRule {
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub conditions: Vec<RuleCondition>,
    pub assign_to: DbId,
}
