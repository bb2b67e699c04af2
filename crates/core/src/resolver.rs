//! Turns a (record, rule) match into a staged update.
//!
//! Nothing here writes to the store. Staged updates are handed to an
//! [`AssignmentWriter`](crate::store::AssignmentWriter) by the orchestrator.

use serde::Serialize;

use crate::cargo::CargoRecord;
use crate::compiler::{CompiledRule, CustomerTarget};
use crate::rate::{compute_rate_value, Rate};
use crate::types::{DbId, Timestamp};

/// Columns to set on a cargo record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AssignmentFields {
    Rate {
        rate_id: DbId,
        assigned_rate: f64,
        rate_currency: String,
        assigned_at: Timestamp,
    },
    Customer {
        assigned_customer: DbId,
        customer_code_id: Option<DbId>,
        assigned_at: Timestamp,
    },
}

/// A pending write for one cargo record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagedUpdate {
    pub record_id: DbId,
    pub fields: AssignmentFields,
}

fn guard_identifiable(record: &CargoRecord, rule_id: DbId) -> bool {
    if record.is_identifiable() {
        return true;
    }
    tracing::warn!(
        record_id = record.id,
        rec_id = ?record.rec_id,
        rule_id,
        "Skipping matched record without identifiers"
    );
    false
}

/// Stage the rate columns for `record`, or `None` if it cannot be updated.
pub fn stage_rate_update(
    record: &CargoRecord,
    rule: &CompiledRule<Rate>,
    now: Timestamp,
) -> Option<StagedUpdate> {
    if !guard_identifiable(record, rule.id) {
        return None;
    }
    let rate = &rule.target;
    Some(StagedUpdate {
        record_id: record.id,
        fields: AssignmentFields::Rate {
            rate_id: rate.id,
            assigned_rate: compute_rate_value(rate, record.total_kg),
            rate_currency: rate.currency_or_default().to_string(),
            assigned_at: now,
        },
    })
}

/// Stage the customer columns for `record`, or `None` if it cannot be updated.
pub fn stage_customer_update(
    record: &CargoRecord,
    rule: &CompiledRule<CustomerTarget>,
    now: Timestamp,
) -> Option<StagedUpdate> {
    if !guard_identifiable(record, rule.id) {
        return None;
    }
    let resolution = rule.target.resolution;
    Some(StagedUpdate {
        record_id: record.id,
        fields: AssignmentFields::Customer {
            assigned_customer: resolution.customer_id,
            customer_code_id: resolution.customer_code_id,
            assigned_at: now,
        },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
