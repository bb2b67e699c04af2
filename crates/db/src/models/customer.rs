//! Customer models. Maps to the `customers` table.

use airmail_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `customers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Customer {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a new customer.
#[derive(Debug, Deserialize)]
pub struct CreateCustomer {
    pub name: String,
}
