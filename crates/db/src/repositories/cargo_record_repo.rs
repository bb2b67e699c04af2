//! Repository for the `cargo_records` table.

use airmail_core::store::RecordFilter;
use airmail_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::cargo_record::{CargoRecordRow, CreateCargoRecord};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, rec_id, rec_numb, inb_flight_date, outb_flight_date, \
    orig_oe, dest_oe, inb_flight_no, outb_flight_no, mail_cat, mail_class, \
    total_kg, invoice, customer_name_number, assigned_customer, customer_code_id, \
    rate_id, assigned_rate, rate_currency, assigned_at, created_at, updated_at";

fn filter_clause(filter: RecordFilter) -> &'static str {
    match filter {
        RecordFilter::WithoutRate => "WHERE rate_id IS NULL",
        RecordFilter::WithoutCustomer => "WHERE assigned_customer IS NULL",
        RecordFilter::All => "",
    }
}

/// Provides reads and assignment updates for cargo records.
pub struct CargoRecordRepo;

impl CargoRecordRepo {
    /// Insert an imported manifest line, returning the created row.
    pub async fn create(
        pool: &PgPool,
        body: &CreateCargoRecord,
    ) -> Result<CargoRecordRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO cargo_records \
                (rec_id, rec_numb, inb_flight_date, outb_flight_date, orig_oe, dest_oe, \
                 inb_flight_no, outb_flight_no, mail_cat, mail_class, total_kg, invoice, \
                 customer_name_number) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, COALESCE($11, 0), $12, $13) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CargoRecordRow>(&query)
            .bind(&body.rec_id)
            .bind(&body.rec_numb)
            .bind(body.inb_flight_date)
            .bind(body.outb_flight_date)
            .bind(&body.orig_oe)
            .bind(&body.dest_oe)
            .bind(&body.inb_flight_no)
            .bind(&body.outb_flight_no)
            .bind(&body.mail_cat)
            .bind(&body.mail_class)
            .bind(body.total_kg)
            .bind(&body.invoice)
            .bind(&body.customer_name_number)
            .fetch_one(pool)
            .await
    }

    /// Find a single cargo record by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CargoRecordRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM cargo_records WHERE id = $1");
        sqlx::query_as::<_, CargoRecordRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// One page of records matching `filter`, ordered by id.
    pub async fn list_page(
        pool: &PgPool,
        filter: RecordFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CargoRecordRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM cargo_records {} ORDER BY id LIMIT $1 OFFSET $2",
            filter_clause(filter)
        );
        sqlx::query_as::<_, CargoRecordRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count records matching `filter`.
    pub async fn count(pool: &PgPool, filter: RecordFilter) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM cargo_records {}", filter_clause(filter));
        sqlx::query_scalar::<_, i64>(&query).fetch_one(pool).await
    }

    /// Set the rate columns on one record. Returns the number of rows updated.
    pub async fn assign_rate(
        pool: &PgPool,
        id: DbId,
        rate_id: DbId,
        assigned_rate: f64,
        rate_currency: &str,
        assigned_at: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE cargo_records \
             SET rate_id = $2, assigned_rate = $3, rate_currency = $4, \
                 assigned_at = $5, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(rate_id)
        .bind(assigned_rate)
        .bind(rate_currency)
        .bind(assigned_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Set the customer columns on one record. Returns the number of rows updated.
    pub async fn assign_customer(
        pool: &PgPool,
        id: DbId,
        assigned_customer: DbId,
        customer_code_id: Option<DbId>,
        assigned_at: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE cargo_records \
             SET assigned_customer = $2, customer_code_id = $3, \
                 assigned_at = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(assigned_customer)
        .bind(customer_code_id)
        .bind(assigned_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
