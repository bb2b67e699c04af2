//! Repository for the `rates` table.

use airmail_core::types::DbId;
use sqlx::PgPool;

use crate::models::rate::{CreateRate, RateRow};

const COLUMNS: &str =
    "id, name, rate_type, base_rate, multiplier, currency, is_active, created_at, updated_at";

/// Provides operations for billing rates.
pub struct RateRepo;

impl RateRepo {
    /// Insert a new rate, returning the created row.
    pub async fn create(pool: &PgPool, body: &CreateRate) -> Result<RateRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO rates (name, rate_type, base_rate, multiplier, currency) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RateRow>(&query)
            .bind(&body.name)
            .bind(&body.rate_type)
            .bind(body.base_rate)
            .bind(body.multiplier)
            .bind(&body.currency)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RateRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rates WHERE id = $1");
        sqlx::query_as::<_, RateRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every rate, ordered by name.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<RateRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rates ORDER BY name");
        sqlx::query_as::<_, RateRow>(&query).fetch_all(pool).await
    }
}
