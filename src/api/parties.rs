use super::handlers::message;
use super::validate::{finish, parse_body, require_non_empty, IdQuery, IdsQuery};
use super::AppState;
use crate::db::{self, parties::PartyFilter, Page};
use crate::error::ApiError;
use crate::models::{is_valid_cnic, NewParty, PartyKind};
use crate::parser::{read_parties, ClientRow, ImportOutcome, ImporterRow, PartyRow};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PartyPayload {
    pub name: String,
    #[serde(alias = "bussinessName")]
    pub business_name: String,
    pub cnic: String,
    pub ntn: String,
    pub address: String,
    pub phone: String,
    #[serde(rename = "type")]
    pub kind: PartyKind,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub strn: Option<String>,
}

impl PartyPayload {
    fn into_new_party(self) -> Result<NewParty, ApiError> {
        let mut errors = Vec::new();
        require_non_empty(&mut errors, "name", &self.name);
        require_non_empty(&mut errors, "businessName", &self.business_name);
        if !is_valid_cnic(&self.cnic) {
            errors.push("cnic must be in the form 12345-1234567-1".to_string());
        }
        finish(errors)?;
        Ok(NewParty {
            serial_number: self.serial_number,
            name: self.name,
            business_name: self.business_name,
            cnic: self.cnic,
            ntn: self.ntn,
            strn: self.strn,
            address: self.address,
            phone: Some(self.phone),
            kind: self.kind,
        })
    }
}

pub async fn create(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let payload: Vec<PartyPayload> = parse_body(&body)?;
    let parties = payload
        .into_iter()
        .map(PartyPayload::into_new_party)
        .collect::<Result<Vec<_>, _>>()?;
    let created = db::parties::insert(&state.pool, &parties).await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<PartyFilter>,
    Query(page): Query<Page>,
) -> Result<Response, ApiError> {
    let clients = db::parties::list(&state.pool, &filter, &page).await?;
    Ok(Json(json!({ "clients": clients })).into_response())
}

pub async fn update(
    State(state): State<AppState>,
    Query(id): Query<IdQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let id = id.require()?;
    let payload: PartyPayload = parse_body(&body)?;
    let name = payload.name.clone();
    let party = payload.into_new_party()?;
    if db::parties::update(&state.pool, id, &party).await? == 0 {
        return Err(ApiError::NotFound("Client not found".to_string()));
    }
    Ok(Json(json!({ "name": name, "id": id })).into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    Query(ids): Query<IdsQuery>,
) -> Result<Response, ApiError> {
    let ids = ids.parse()?;
    let removed = db::parties::delete(&state.pool, &ids).await?;
    tracing::info!("Deleted {} of {} requested parties", removed, ids.len());
    Ok(message(StatusCode::OK, "Client(s) Deleted successfully"))
}

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    #[serde(rename = "type")]
    pub kind: Option<PartyKind>,
}

async fn import_rows<T: PartyRow>(state: &AppState, body: &[u8]) -> Result<Response, ApiError> {
    let existing = db::parties::existing_keys(&state.pool, T::KIND).await?;
    let ImportOutcome {
        accepted,
        duplicates,
        rejected,
    } = read_parties::<T, _>(body, &existing)?;
    for dup in &duplicates {
        tracing::warn!(
            "Skipping {} on line {}: NTN {} / CNIC {} already registered",
            T::KIND,
            dup.line,
            dup.ntn,
            dup.cnic
        );
    }
    let parties: Vec<NewParty> = accepted.into_iter().map(PartyRow::into_new_party).collect();
    let created = db::parties::insert(&state.pool, &parties).await?;
    tracing::info!(
        "Imported {} {} rows, {} duplicates and {} invalid rows skipped",
        created.len(),
        T::KIND,
        duplicates.len(),
        rejected.len()
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "imported": created.len(),
            "clients": created,
            "duplicates": duplicates,
            "rejected": rejected,
        })),
    )
        .into_response())
}

/// CSV export from the client/importer screens
pub async fn import(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    if body.is_empty() {
        return Err(ApiError::invalid(["CSV body is empty"]));
    }
    match query.kind.unwrap_or(PartyKind::Client) {
        PartyKind::Client => import_rows::<ClientRow>(&state, &body).await,
        PartyKind::Importer => import_rows::<ImporterRow>(&state, &body).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(cnic: &str) -> PartyPayload {
        PartyPayload {
            name: "Jane".to_string(),
            business_name: "Acme".to_string(),
            cnic: cnic.to_string(),
            ntn: "1234567".to_string(),
            address: "Lahore".to_string(),
            phone: "0300".to_string(),
            kind: PartyKind::Client,
            serial_number: None,
            strn: None,
        }
    }

    #[test]
    fn cnic_must_be_well_formed() {
        assert!(payload("35202-1234567-1").into_new_party().is_ok());
        for bad in ["", "3520212345671", "35202-123456-1"] {
            assert!(matches!(
                payload(bad).into_new_party(),
                Err(ApiError::Validation(_))
            ));
        }
    }
}
