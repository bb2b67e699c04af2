//! Repository for the `customers` table.

use sqlx::PgPool;

use crate::models::customer::{CreateCustomer, Customer};

const COLUMNS: &str = "id, name, created_at, updated_at";

/// Provides basic operations for customers.
pub struct CustomerRepo;

impl CustomerRepo {
    /// Insert a new customer, returning the created row.
    pub async fn create(pool: &PgPool, body: &CreateCustomer) -> Result<Customer, sqlx::Error> {
        let query = format!("INSERT INTO customers (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Customer>(&query)
            .bind(&body.name)
            .fetch_one(pool)
            .await
    }
}
