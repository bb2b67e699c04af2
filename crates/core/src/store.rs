//! Collaborator interfaces the rule engines read from and write to.
//!
//! The engines never talk to a database directly. `airmail-db` implements
//! these traits over PostgreSQL; tests use an in-memory store.

use std::future::Future;

use serde::Serialize;

use crate::cargo::CargoRecord;
use crate::customer_code::CustomerCode;
use crate::resolver::StagedUpdate;
use crate::rule::{RateRuleRow, Rule, RuleKind};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure reported by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend failed while performing `context`.
    #[error("{context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The store refused the operation.
    #[error("{0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn backend(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared types
// ---------------------------------------------------------------------------

/// Which cargo records a paged read returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFilter {
    /// Records with no `rate_id`.
    WithoutRate,
    /// Records with no `assigned_customer`.
    WithoutCustomer,
    /// Every record.
    All,
}

/// Telemetry written for each compiled rule after a live run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleRunTelemetry {
    pub rule_id: DbId,
    /// Matches found by this run, added to the stored counter.
    pub matches: i64,
    pub last_run: Timestamp,
}

/// A single write that was rejected inside a settled batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFailure {
    pub record_id: DbId,
    pub message: String,
}

/// Settled result of a batch of writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkWriteOutcome {
    pub total_updated: usize,
    pub total_failed: usize,
    pub failures: Vec<WriteFailure>,
}

impl BulkWriteOutcome {
    pub fn merge(&mut self, other: BulkWriteOutcome) {
        self.total_updated += other.total_updated;
        self.total_failed += other.total_failed;
        self.failures.extend(other.failures);
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Paged read of candidate cargo records, ordered by id.
pub trait CargoSource: Send + Sync {
    fn fetch_records(
        &self,
        filter: RecordFilter,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<Vec<CargoRecord>, StoreError>> + Send;
}

/// Read of active rules, optionally restricted to an id list.
pub trait RuleSource: Send + Sync {
    fn active_customer_rules(
        &self,
        rule_ids: Option<&[DbId]>,
    ) -> impl Future<Output = Result<Vec<Rule>, StoreError>> + Send;

    /// Active rate rules, each joined with the rate it references.
    fn active_rate_rules(
        &self,
        rule_ids: Option<&[DbId]>,
    ) -> impl Future<Output = Result<Vec<RateRuleRow>, StoreError>> + Send;
}

/// Read of customer-code mappings.
pub trait CustomerCodeSource: Send + Sync {
    fn active_customer_codes(
        &self,
    ) -> impl Future<Output = Result<Vec<CustomerCode>, StoreError>> + Send;
}

/// Write path for staged updates and rule telemetry.
pub trait AssignmentWriter: Send + Sync {
    /// Apply one batch. Individual rejections are reported in the outcome;
    /// `Err` means the batch as a whole could not be attempted.
    fn apply_updates(
        &self,
        updates: &[StagedUpdate],
    ) -> impl Future<Output = Result<BulkWriteOutcome, StoreError>> + Send;

    /// Upsert match count and last-run time for the given rules.
    fn record_rule_runs(
        &self,
        kind: RuleKind,
        runs: &[RuleRunTelemetry],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Everything an engine run needs from its store.
pub trait EngineStore: CargoSource + RuleSource + CustomerCodeSource + AssignmentWriter {}

impl<T> EngineStore for T where
    T: CargoSource + RuleSource + CustomerCodeSource + AssignmentWriter
{
}

// ---------------------------------------------------------------------------
// In-memory store (tests)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::Mutex;

    use super::*;
    use crate::resolver::AssignmentFields;

    /// Mutex-backed store that records every write call.
    #[derive(Default)]
    pub struct InMemoryStore {
        pub records: Mutex<Vec<CargoRecord>>,
        pub customer_rules: Vec<Rule>,
        pub rate_rules: Vec<RateRuleRow>,
        pub customer_codes: Vec<CustomerCode>,
        pub write_calls: Mutex<usize>,
        pub telemetry: Mutex<Vec<(RuleKind, RuleRunTelemetry)>>,
        /// Record ids whose update is rejected.
        pub reject_ids: Vec<DbId>,
        /// Fail the whole batch on this call number (0-based).
        pub fail_batch: Option<usize>,
    }

    impl InMemoryStore {
        pub fn write_calls(&self) -> usize {
            *self.write_calls.lock().unwrap()
        }

        pub fn record(&self, id: DbId) -> CargoRecord {
            self.records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned()
                .unwrap()
        }
    }

    fn selected(id: DbId, rule_ids: Option<&[DbId]>) -> bool {
        rule_ids.is_none_or(|ids| ids.is_empty() || ids.contains(&id))
    }

    impl CargoSource for InMemoryStore {
        async fn fetch_records(
            &self,
            filter: RecordFilter,
            limit: i64,
            offset: i64,
        ) -> Result<Vec<CargoRecord>, StoreError> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .filter(|r| match filter {
                    RecordFilter::WithoutRate => r.rate_id.is_none(),
                    RecordFilter::WithoutCustomer => r.assigned_customer.is_none(),
                    RecordFilter::All => true,
                })
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    impl RuleSource for InMemoryStore {
        async fn active_customer_rules(
            &self,
            rule_ids: Option<&[DbId]>,
        ) -> Result<Vec<Rule>, StoreError> {
            Ok(self
                .customer_rules
                .iter()
                .filter(|r| r.is_active && selected(r.id, rule_ids))
                .cloned()
                .collect())
        }

        async fn active_rate_rules(
            &self,
            rule_ids: Option<&[DbId]>,
        ) -> Result<Vec<RateRuleRow>, StoreError> {
            Ok(self
                .rate_rules
                .iter()
                .filter(|r| r.rule.is_active && selected(r.rule.id, rule_ids))
                .cloned()
                .collect())
        }
    }

    impl CustomerCodeSource for InMemoryStore {
        async fn active_customer_codes(&self) -> Result<Vec<CustomerCode>, StoreError> {
            Ok(self
                .customer_codes
                .iter()
                .filter(|c| c.is_active)
                .cloned()
                .collect())
        }
    }

    impl AssignmentWriter for InMemoryStore {
        async fn apply_updates(
            &self,
            updates: &[StagedUpdate],
        ) -> Result<BulkWriteOutcome, StoreError> {
            let call = {
                let mut calls = self.write_calls.lock().unwrap();
                *calls += 1;
                *calls - 1
            };
            if self.fail_batch == Some(call) {
                return Err(StoreError::Unavailable("connection reset".into()));
            }

            let mut outcome = BulkWriteOutcome::default();
            let mut records = self.records.lock().unwrap();
            for update in updates {
                if self.reject_ids.contains(&update.record_id) {
                    outcome.total_failed += 1;
                    outcome.failures.push(WriteFailure {
                        record_id: update.record_id,
                        message: "rejected".into(),
                    });
                    continue;
                }
                let Some(record) = records.iter_mut().find(|r| r.id == update.record_id) else {
                    continue;
                };
                match &update.fields {
                    AssignmentFields::Rate {
                        rate_id,
                        assigned_rate,
                        rate_currency,
                        assigned_at,
                    } => {
                        record.rate_id = Some(*rate_id);
                        record.assigned_rate = Some(*assigned_rate);
                        record.rate_currency = Some(rate_currency.clone());
                        record.assigned_at = Some(*assigned_at);
                    }
                    AssignmentFields::Customer {
                        assigned_customer,
                        customer_code_id,
                        assigned_at,
                    } => {
                        record.assigned_customer = Some(*assigned_customer);
                        record.customer_code_id = *customer_code_id;
                        record.assigned_at = Some(*assigned_at);
                    }
                }
                outcome.total_updated += 1;
            }
            Ok(outcome)
        }

        async fn record_rule_runs(
            &self,
            kind: RuleKind,
            runs: &[RuleRunTelemetry],
        ) -> Result<(), StoreError> {
            *self.write_calls.lock().unwrap() += 1;
            let mut telemetry = self.telemetry.lock().unwrap();
            telemetry.extend(runs.iter().cloned().map(|run| (kind, run)));
            Ok(())
        }
    }
}
