//! Repository for the `customer_codes` table.

use sqlx::PgPool;

use crate::models::customer_code::{CreateCustomerCode, CustomerCodeRow};

const COLUMNS: &str = "id, code, customer_id, is_active, created_at, updated_at";

/// Provides operations for customer codes.
pub struct CustomerCodeRepo;

impl CustomerCodeRepo {
    /// Insert a new customer code, returning the created row.
    pub async fn create(
        pool: &PgPool,
        body: &CreateCustomerCode,
    ) -> Result<CustomerCodeRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO customer_codes (code, customer_id, is_active) \
             VALUES ($1, $2, COALESCE($3, true)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CustomerCodeRow>(&query)
            .bind(&body.code)
            .bind(body.customer_id)
            .bind(body.is_active)
            .fetch_one(pool)
            .await
    }

    /// List every customer code, ordered by code.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<CustomerCodeRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM customer_codes ORDER BY code");
        sqlx::query_as::<_, CustomerCodeRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// List active customer codes, ordered by id.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<CustomerCodeRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM customer_codes WHERE is_active ORDER BY id");
        sqlx::query_as::<_, CustomerCodeRow>(&query)
            .fetch_all(pool)
            .await
    }
}
