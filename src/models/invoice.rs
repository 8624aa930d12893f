use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stored invoice
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub invoice_date: String,
    pub client_id: i64,
    pub importer_id: i64,
    pub template_id: i64,
    pub team_id: i64,
    pub goods: String,
    pub good_number: String,
    pub hs_code: String,
    pub fbr_code: String,
    pub quantity_units: i32,
    pub value: BigDecimal,
    pub gst: BigDecimal,
    pub vat: BigDecimal,
    pub unit_price: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated insert/update payload; `team_id` always comes from the caller's token
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub invoice_date: String,
    pub client_id: i64,
    pub importer_id: i64,
    pub template_id: i64,
    pub team_id: i64,
    pub goods: String,
    pub good_number: String,
    pub hs_code: String,
    pub fbr_code: String,
    pub quantity_units: i32,
    pub value: BigDecimal,
    pub gst: BigDecimal,
    pub vat: BigDecimal,
    pub unit_price: BigDecimal,
}
