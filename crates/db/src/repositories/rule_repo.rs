//! Repository for the `rules` table (customer-assignment rules).

use airmail_core::store::RuleRunTelemetry;
use airmail_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::rule::{CreateRule, RuleRow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, is_active, priority, conditions, assign_to, \
    match_count, last_run, created_at, updated_at";

/// Provides CRUD and telemetry operations for customer-assignment rules.
pub struct RuleRepo;

impl RuleRepo {
    /// Insert a new rule, returning the created row.
    pub async fn create(pool: &PgPool, body: &CreateRule) -> Result<RuleRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO rules (name, description, priority, conditions, assign_to) \
             VALUES ($1, $2, COALESCE($3, 100), $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RuleRow>(&query)
            .bind(&body.name)
            .bind(&body.description)
            .bind(body.priority)
            .bind(Json(&body.conditions))
            .bind(body.assign_to)
            .fetch_one(pool)
            .await
    }

    /// Find a single rule by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RuleRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rules WHERE id = $1");
        sqlx::query_as::<_, RuleRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all rules, ordered by priority then id.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<RuleRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rules ORDER BY priority, id");
        sqlx::query_as::<_, RuleRow>(&query).fetch_all(pool).await
    }

    /// List active rules, optionally restricted to `rule_ids`.
    pub async fn list_active(
        pool: &PgPool,
        rule_ids: Option<&[DbId]>,
    ) -> Result<Vec<RuleRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rules \
             WHERE is_active AND ($1::BIGINT[] IS NULL OR id = ANY($1)) \
             ORDER BY priority, id"
        );
        sqlx::query_as::<_, RuleRow>(&query)
            .bind(rule_ids.map(<[DbId]>::to_vec))
            .fetch_all(pool)
            .await
    }

    /// Mark a rule inactive. Returns `None` if the rule does not exist.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<Option<RuleRow>, sqlx::Error> {
        let query = format!(
            "UPDATE rules SET is_active = false, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RuleRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Add each run's matches to the stored counters and stamp `last_run`.
    pub async fn record_runs(pool: &PgPool, runs: &[RuleRunTelemetry]) -> Result<u64, sqlx::Error> {
        let (ids, counts, times) = unzip_runs(runs);
        let result = sqlx::query(
            "UPDATE rules AS r \
             SET match_count = r.match_count + t.matches, last_run = t.last_run, \
                 updated_at = NOW() \
             FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::TIMESTAMPTZ[]) \
                 AS t(id, matches, last_run) \
             WHERE r.id = t.id",
        )
        .bind(ids)
        .bind(counts)
        .bind(times)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Split telemetry into parallel arrays for `UNNEST`.
pub(crate) fn unzip_runs(runs: &[RuleRunTelemetry]) -> (Vec<DbId>, Vec<i64>, Vec<Timestamp>) {
    let mut ids = Vec::with_capacity(runs.len());
    let mut counts = Vec::with_capacity(runs.len());
    let mut times = Vec::with_capacity(runs.len());
    for run in runs {
        ids.push(run.rule_id);
        counts.push(run.matches);
        times.push(run.last_run);
    }
    (ids, counts, times)
}
