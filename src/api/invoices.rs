use super::handlers::message;
use super::validate::{finish, parse_body, require_non_empty, IdQuery, IdsQuery};
use super::AppState;
use crate::auth::Claims;
use crate::db::{self, invoices::InvoiceFilter, Page};
use crate::error::ApiError;
use crate::models::NewInvoice;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use bigdecimal::{BigDecimal, Zero};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InvoicePayload {
    pub invoice_number: String,
    pub invoice_date: String,
    pub client_id: i64,
    pub importer_id: i64,
    pub template_id: i64,
    pub goods: String,
    pub good_number: String,
    #[serde(rename = "hsCODE", alias = "hsCode")]
    pub hs_code: String,
    #[serde(rename = "FBRCode", alias = "fbrCode")]
    pub fbr_code: String,
    pub quantity_units: i32,
    pub value: BigDecimal,
    #[serde(rename = "GST", alias = "gst")]
    pub gst: BigDecimal,
    #[serde(rename = "VAT", alias = "vat")]
    pub vat: BigDecimal,
    pub unit_price: BigDecimal,
}

impl InvoicePayload {
    /// Checks mirror the table constraints so bad rows fail as 400s
    pub fn into_new_invoice(self, team_id: i64) -> Result<NewInvoice, ApiError> {
        let one = BigDecimal::from(1);
        let mut errors = Vec::new();
        require_non_empty(&mut errors, "invoiceNumber", &self.invoice_number);
        require_non_empty(&mut errors, "invoiceDate", &self.invoice_date);
        if self.quantity_units < 1 {
            errors.push("quantityUnits must be at least 1".to_string());
        }
        if self.value < one {
            errors.push("value must be at least 1".to_string());
        }
        if self.unit_price < one {
            errors.push("unitPrice must be at least 1".to_string());
        }
        if self.gst < BigDecimal::zero() {
            errors.push("GST must not be negative".to_string());
        }
        if self.vat < BigDecimal::zero() {
            errors.push("VAT must not be negative".to_string());
        }
        finish(errors)?;

        Ok(NewInvoice {
            invoice_number: self.invoice_number,
            invoice_date: self.invoice_date,
            client_id: self.client_id,
            importer_id: self.importer_id,
            template_id: self.template_id,
            team_id,
            goods: self.goods,
            good_number: self.good_number,
            hs_code: self.hs_code,
            fbr_code: self.fbr_code,
            quantity_units: self.quantity_units,
            value: self.value,
            gst: self.gst,
            vat: self.vat,
            unit_price: self.unit_price,
        })
    }
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let payload: Vec<InvoicePayload> = parse_body(&body)?;
    let invoices = payload
        .into_iter()
        .map(|p| p.into_new_invoice(claims.team))
        .collect::<Result<Vec<_>, _>>()?;
    let created = db::invoices::insert(&state.pool, &invoices).await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<InvoiceFilter>,
    Query(page): Query<Page>,
) -> Result<Response, ApiError> {
    let invoices = db::invoices::list(&state.pool, claims.team, &filter, &page).await?;
    Ok(Json(json!({ "invoices": invoices })).into_response())
}

pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(id): Query<IdQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let id = id.require()?;
    let payload: InvoicePayload = parse_body(&body)?;
    let invoice = payload.into_new_invoice(claims.team)?;
    if db::invoices::update(&state.pool, id, &invoice).await? == 0 {
        return Err(ApiError::NotFound("Invoice not found".to_string()));
    }
    Ok(Json(json!({ "invoiceNumber": invoice.invoice_number, "id": id })).into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(ids): Query<IdsQuery>,
) -> Result<Response, ApiError> {
    let ids = ids.parse()?;
    let removed = db::invoices::delete(&state.pool, claims.team, &ids).await?;
    tracing::info!("Deleted {} of {} requested invoices", removed, ids.len());
    Ok(message(StatusCode::OK, "Invoice(s) Deleted successfully"))
}
