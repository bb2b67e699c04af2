//! Customer code models. Maps to the `customer_codes` table.

use airmail_core::customer_code::CustomerCode;
use airmail_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `customer_codes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CustomerCodeRow {
    pub id: DbId,
    pub code: String,
    pub customer_id: DbId,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<CustomerCodeRow> for CustomerCode {
    fn from(row: CustomerCodeRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            customer_id: row.customer_id,
            is_active: row.is_active,
        }
    }
}

/// DTO for inserting a new customer code.
#[derive(Debug, Deserialize)]
pub struct CreateCustomerCode {
    pub code: String,
    pub customer_id: DbId,
    pub is_active: Option<bool>,
}
