//! Repository for the `rate_rules` table.

use airmail_core::store::RuleRunTelemetry;
use airmail_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use super::rule_repo::unzip_runs;
use crate::models::rate_rule::{CreateRateRule, RateRuleEntry, RateRuleWithRate};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, is_active, priority, conditions, rate_id, \
    match_count, last_run, created_at, updated_at";

/// Provides CRUD and telemetry operations for rate rules.
pub struct RateRuleRepo;

impl RateRuleRepo {
    /// Insert a new rate rule, returning the created row.
    pub async fn create(
        pool: &PgPool,
        body: &CreateRateRule,
    ) -> Result<RateRuleEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO rate_rules (name, description, priority, conditions, rate_id) \
             VALUES ($1, $2, COALESCE($3, 100), $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RateRuleEntry>(&query)
            .bind(&body.name)
            .bind(&body.description)
            .bind(body.priority)
            .bind(Json(&body.conditions))
            .bind(body.rate_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<RateRuleEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rate_rules WHERE id = $1");
        sqlx::query_as::<_, RateRuleEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all rate rules, ordered by priority then id.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<RateRuleEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rate_rules ORDER BY priority, id");
        sqlx::query_as::<_, RateRuleEntry>(&query)
            .fetch_all(pool)
            .await
    }

    /// Active rate rules left-joined with their rate, optionally restricted
    /// to `rule_ids`.
    pub async fn list_active_with_rate(
        pool: &PgPool,
        rule_ids: Option<&[DbId]>,
    ) -> Result<Vec<RateRuleWithRate>, sqlx::Error> {
        sqlx::query_as::<_, RateRuleWithRate>(
            "SELECT rr.id, rr.name, rr.is_active, rr.priority, rr.conditions, rr.rate_id, \
                    rr.match_count, rr.last_run, \
                    r.id AS joined_rate_id, r.name AS rate_name, r.rate_type, r.base_rate, \
                    r.multiplier, r.currency, r.is_active AS rate_is_active \
             FROM rate_rules rr \
             LEFT JOIN rates r ON r.id = rr.rate_id \
             WHERE rr.is_active AND ($1::BIGINT[] IS NULL OR rr.id = ANY($1)) \
             ORDER BY rr.priority, rr.id",
        )
        .bind(rule_ids.map(<[DbId]>::to_vec))
        .fetch_all(pool)
        .await
    }

    /// Mark a rate rule inactive. Returns `None` if it does not exist.
    pub async fn deactivate(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<RateRuleEntry>, sqlx::Error> {
        let query = format!(
            "UPDATE rate_rules SET is_active = false, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RateRuleEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Add each run's matches to the stored counters and stamp `last_run`.
    pub async fn record_runs(pool: &PgPool, runs: &[RuleRunTelemetry]) -> Result<u64, sqlx::Error> {
        let (ids, counts, times) = unzip_runs(runs);
        let result = sqlx::query(
            "UPDATE rate_rules AS r \
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
