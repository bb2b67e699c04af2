//! Cargo record models. Maps to the `cargo_records` table.

use airmail_core::cargo::CargoRecord;
use airmail_core::types::{DbId, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `cargo_records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CargoRecordRow {
    pub id: DbId,
    pub rec_id: Option<String>,
    pub rec_numb: Option<String>,
    pub inb_flight_date: Option<NaiveDate>,
    pub outb_flight_date: Option<NaiveDate>,
    pub orig_oe: Option<String>,
    pub dest_oe: Option<String>,
    pub inb_flight_no: Option<String>,
    pub outb_flight_no: Option<String>,
    pub mail_cat: Option<String>,
    pub mail_class: Option<String>,
    pub total_kg: f64,
    pub invoice: Option<String>,
    pub customer_name_number: Option<String>,
    pub assigned_customer: Option<DbId>,
    pub customer_code_id: Option<DbId>,
    pub rate_id: Option<DbId>,
    pub assigned_rate: Option<f64>,
    pub rate_currency: Option<String>,
    pub assigned_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<CargoRecordRow> for CargoRecord {
    fn from(row: CargoRecordRow) -> Self {
        Self {
            id: row.id,
            rec_id: row.rec_id,
            rec_numb: row.rec_numb,
            inb_flight_date: row.inb_flight_date,
            outb_flight_date: row.outb_flight_date,
            orig_oe: row.orig_oe,
            dest_oe: row.dest_oe,
            inb_flight_no: row.inb_flight_no,
            outb_flight_no: row.outb_flight_no,
            mail_cat: row.mail_cat,
            mail_class: row.mail_class,
            total_kg: row.total_kg,
            invoice: row.invoice,
            customer_name_number: row.customer_name_number,
            assigned_customer: row.assigned_customer,
            customer_code_id: row.customer_code_id,
            rate_id: row.rate_id,
            assigned_rate: row.assigned_rate,
            rate_currency: row.rate_currency,
            assigned_at: row.assigned_at,
        }
    }
}

/// DTO for inserting an imported manifest line.
#[derive(Debug, Default, Deserialize)]
pub struct CreateCargoRecord {
    pub rec_id: Option<String>,
    pub rec_numb: Option<String>,
    pub inb_flight_date: Option<NaiveDate>,
    pub outb_flight_date: Option<NaiveDate>,
    pub orig_oe: Option<String>,
    pub dest_oe: Option<String>,
    pub inb_flight_no: Option<String>,
    pub outb_flight_no: Option<String>,
    pub mail_cat: Option<String>,
    pub mail_class: Option<String>,
    pub total_kg: Option<f64>,
    pub invoice: Option<String>,
    pub customer_name_number: Option<String>,
}
