//! Row models and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A conversion into the engine's domain type where one exists

pub mod cargo_record;
pub mod customer;
pub mod customer_code;
pub mod rate;
pub mod rate_rule;
pub mod rule;

use airmail_core::condition::RuleCondition;
use airmail_core::types::DbId;

/// Decode a JSONB condition list.
///
/// A malformed column yields an empty list, which the compiler reports as
/// a skipped rule instead of failing the whole load.
pub(crate) fn decode_conditions(
    table: &str,
    id: DbId,
    value: serde_json::Value,
) -> Vec<RuleCondition> {
    match serde_json::from_value(value) {
        Ok(conditions) => conditions,
        Err(err) => {
            tracing::warn!(table, id, error = %err, "Malformed conditions column");
            Vec::new()
        }
    }
}
