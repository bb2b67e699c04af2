//! Cargo record model and the closed set of fields rules may inspect.
//!
//! Rule conditions name a field by string. The compiler resolves that name
//! to a [`CargoField`] once, so evaluation never does a by-name lookup.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Cargo record
// ---------------------------------------------------------------------------

/// A single imported manifest line, the unit classified by the engines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CargoRecord {
    pub id: DbId,
    /// Business record id carried over from the imported manifest.
    pub rec_id: Option<String>,
    pub rec_numb: Option<String>,
    pub inb_flight_date: Option<NaiveDate>,
    pub outb_flight_date: Option<NaiveDate>,
    /// Origin office of exchange code.
    pub orig_oe: Option<String>,
    /// Destination office of exchange code.
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
}

impl CargoRecord {
    /// Render a field as the text that conditions compare against.
    ///
    /// Nulls render as the empty string; numbers use their shortest
    /// decimal form (`10.0` renders as `"10"`).
    pub fn field_text(&self, field: CargoField) -> String {
        fn text(value: &Option<String>) -> String {
            value.clone().unwrap_or_default()
        }
        fn date(value: &Option<NaiveDate>) -> String {
            value
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        }

        match field {
            CargoField::RecId => text(&self.rec_id),
            CargoField::RecNumb => text(&self.rec_numb),
            CargoField::InbFlightDate => date(&self.inb_flight_date),
            CargoField::OutbFlightDate => date(&self.outb_flight_date),
            CargoField::OrigOe => text(&self.orig_oe),
            CargoField::DestOe => text(&self.dest_oe),
            CargoField::InbFlightNo => text(&self.inb_flight_no),
            CargoField::OutbFlightNo => text(&self.outb_flight_no),
            CargoField::MailCat => text(&self.mail_cat),
            CargoField::MailClass => text(&self.mail_class),
            CargoField::TotalKg => self.total_kg.to_string(),
            CargoField::Invoice => text(&self.invoice),
            CargoField::CustomerNameNumber => text(&self.customer_name_number),
            CargoField::AssignedCustomer => self
                .assigned_customer
                .map(|id| id.to_string())
                .unwrap_or_default(),
        }
    }

    /// Whether the record carries both identifiers an update needs.
    pub fn is_identifiable(&self) -> bool {
        self.id > 0
            && self
                .rec_id
                .as_deref()
                .is_some_and(|rec_id| !rec_id.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Field enumeration
// ---------------------------------------------------------------------------

/// Cargo record fields a rule condition can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CargoField {
    RecId,
    RecNumb,
    InbFlightDate,
    OutbFlightDate,
    OrigOe,
    DestOe,
    InbFlightNo,
    OutbFlightNo,
    MailCat,
    MailClass,
    TotalKg,
    Invoice,
    CustomerNameNumber,
    AssignedCustomer,
}

/// Every field, in declaration order.
pub const ALL_FIELDS: &[CargoField] = &[
    CargoField::RecId,
    CargoField::RecNumb,
    CargoField::InbFlightDate,
    CargoField::OutbFlightDate,
    CargoField::OrigOe,
    CargoField::DestOe,
    CargoField::InbFlightNo,
    CargoField::OutbFlightNo,
    CargoField::MailCat,
    CargoField::MailClass,
    CargoField::TotalKg,
    CargoField::Invoice,
    CargoField::CustomerNameNumber,
    CargoField::AssignedCustomer,
];

impl CargoField {
    /// Canonical column name.
    pub fn name(self) -> &'static str {
        match self {
            Self::RecId => "rec_id",
            Self::RecNumb => "rec_numb",
            Self::InbFlightDate => "inb_flight_date",
            Self::OutbFlightDate => "outb_flight_date",
            Self::OrigOe => "orig_oe",
            Self::DestOe => "dest_oe",
            Self::InbFlightNo => "inb_flight_no",
            Self::OutbFlightNo => "outb_flight_no",
            Self::MailCat => "mail_cat",
            Self::MailClass => "mail_class",
            Self::TotalKg => "total_kg",
            Self::Invoice => "invoice",
            Self::CustomerNameNumber => "customer_name_number",
            Self::AssignedCustomer => "assigned_customer",
        }
    }

    /// Resolve a field name as stored on a condition (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "weight_kg" | "weight" => Some(Self::TotalKg),
            other => ALL_FIELDS.iter().copied().find(|f| f.name() == other),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
