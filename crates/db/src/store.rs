//! PostgreSQL implementation of the engine's collaborator traits.

use airmail_core::cargo::CargoRecord;
use airmail_core::customer_code::CustomerCode;
use airmail_core::resolver::{AssignmentFields, StagedUpdate};
use airmail_core::rule::{RateRuleRow, Rule, RuleKind};
use airmail_core::store::{
    AssignmentWriter, BulkWriteOutcome, CargoSource, CustomerCodeSource, RecordFilter,
    RuleRunTelemetry, RuleSource, StoreError, WriteFailure,
};
use airmail_core::types::DbId;
use futures::future::join_all;

use crate::repositories::{CargoRecordRepo, CustomerCodeRepo, RateRuleRepo, RuleRepo};
use crate::DbPool;

/// Engine store backed by a connection pool.
#[derive(Debug, Clone)]
pub struct PgEngineStore {
    pool: DbPool,
}

impl PgEngineStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn apply_one(&self, update: &StagedUpdate) -> Result<u64, sqlx::Error> {
        match &update.fields {
            AssignmentFields::Rate {
                rate_id,
                assigned_rate,
                rate_currency,
                assigned_at,
            } => {
                CargoRecordRepo::assign_rate(
                    &self.pool,
                    update.record_id,
                    *rate_id,
                    *assigned_rate,
                    rate_currency,
                    *assigned_at,
                )
                .await
            }
            AssignmentFields::Customer {
                assigned_customer,
                customer_code_id,
                assigned_at,
            } => {
                CargoRecordRepo::assign_customer(
                    &self.pool,
                    update.record_id,
                    *assigned_customer,
                    *customer_code_id,
                    *assigned_at,
                )
                .await
            }
        }
    }
}

impl CargoSource for PgEngineStore {
    async fn fetch_records(
        &self,
        filter: RecordFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CargoRecord>, StoreError> {
        let rows = CargoRecordRepo::list_page(&self.pool, filter, limit, offset)
            .await
            .map_err(|e| StoreError::backend("Failed to fetch cargo records", e))?;
        Ok(rows.into_iter().map(CargoRecord::from).collect())
    }
}

impl RuleSource for PgEngineStore {
    async fn active_customer_rules(
        &self,
        rule_ids: Option<&[DbId]>,
    ) -> Result<Vec<Rule>, StoreError> {
        let rows = RuleRepo::list_active(&self.pool, rule_ids)
            .await
            .map_err(|e| StoreError::backend("Failed to load customer rules", e))?;
        Ok(rows.into_iter().map(Rule::from).collect())
    }

    async fn active_rate_rules(
        &self,
        rule_ids: Option<&[DbId]>,
    ) -> Result<Vec<RateRuleRow>, StoreError> {
        let rows = RateRuleRepo::list_active_with_rate(&self.pool, rule_ids)
            .await
            .map_err(|e| StoreError::backend("Failed to load rate rules", e))?;
        Ok(rows.into_iter().map(RateRuleRow::from).collect())
    }
}

impl CustomerCodeSource for PgEngineStore {
    async fn active_customer_codes(&self) -> Result<Vec<CustomerCode>, StoreError> {
        let rows = CustomerCodeRepo::list_active(&self.pool)
            .await
            .map_err(|e| StoreError::backend("Failed to load customer codes", e))?;
        Ok(rows.into_iter().map(CustomerCode::from).collect())
    }
}

impl AssignmentWriter for PgEngineStore {
    /// Dispatch every update concurrently and wait for all of them to settle.
    async fn apply_updates(
        &self,
        updates: &[StagedUpdate],
    ) -> Result<BulkWriteOutcome, StoreError> {
        if self.pool.is_closed() {
            return Err(StoreError::Unavailable("database pool is closed".into()));
        }

        let results = join_all(updates.iter().map(|u| self.apply_one(u))).await;

        let mut outcome = BulkWriteOutcome::default();
        for (update, result) in updates.iter().zip(results) {
            match result {
                Ok(0) => {
                    outcome.total_failed += 1;
                    outcome.failures.push(WriteFailure {
                        record_id: update.record_id,
                        message: "record no longer exists".into(),
                    });
                }
                Ok(_) => outcome.total_updated += 1,
                Err(err) => {
                    tracing::warn!(
                        record_id = update.record_id,
                        error = %err,
                        "Cargo record update failed"
                    );
                    outcome.total_failed += 1;
                    outcome.failures.push(WriteFailure {
                        record_id: update.record_id,
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(outcome)
    }

    async fn record_rule_runs(
        &self,
        kind: RuleKind,
        runs: &[RuleRunTelemetry],
    ) -> Result<(), StoreError> {
        if runs.is_empty() {
            return Ok(());
        }
        let updated = match kind {
            RuleKind::Customer => RuleRepo::record_runs(&self.pool, runs).await,
            RuleKind::Rate => RateRuleRepo::record_runs(&self.pool, runs).await,
        }
        .map_err(|e| StoreError::backend("Failed to record rule telemetry", e))?;
        tracing::debug!(kind = kind.as_str(), updated, "Recorded rule telemetry");
        Ok(())
    }
}
