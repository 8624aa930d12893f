use super::handlers::message;
use super::validate::{finish, parse_body, require_non_empty, IdQuery, IdsQuery};
use super::AppState;
use crate::auth::{hash_password, Claims};
use crate::db::{self, users::UserFilter, Page};
use crate::error::ApiError;
use crate::models::{NewUser, ADMIN_ROLE};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserPayload {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub team_id: Option<i64>,
}

/// Echo of an updated user, never including the password
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdatedUser {
    id: i64,
    username: String,
    first_name: String,
    last_name: String,
    role: String,
    team_id: i64,
}

fn is_admin(claims: &Claims) -> bool {
    claims.role == ADMIN_ROLE
}

impl UserPayload {
    fn check(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        require_non_empty(&mut errors, "username", &self.username);
        require_non_empty(&mut errors, "role", &self.role);
        if let Some(password) = &self.password {
            require_non_empty(&mut errors, "password", password);
        }
        finish(errors)
    }

    /// Users always land in the caller's team
    fn team_for(&self, claims: &Claims) -> Result<i64, ApiError> {
        match self.team_id {
            Some(team) if team != claims.team => Err(ApiError::Forbidden),
            _ => Ok(claims.team),
        }
    }

    async fn into_new_user(self, team_id: i64) -> Result<NewUser, ApiError> {
        let hash = match self.password {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };
        Ok(NewUser {
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            team_id,
            hash,
        })
    }
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let payload: UserPayload = parse_body(&body)?;
    payload.check()?;
    if payload.password.is_none() {
        return Err(ApiError::invalid(["password is required"]));
    }
    if !is_admin(&claims) {
        return Err(ApiError::Forbidden);
    }
    let team_id = payload.team_for(&claims)?;
    let user = payload.into_new_user(team_id).await?;
    let created = db::users::insert(&state.pool, &user).await?;
    tracing::info!("User {} created in team {} by {}", created.username, team_id, claims.username);
    Ok(message(StatusCode::CREATED, "User created succesfully"))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(mut filter): Query<UserFilter>,
    Query(page): Query<Page>,
) -> Result<Response, ApiError> {
    if filter.team_id.map_or(false, |team| team != claims.team) {
        return Err(ApiError::Forbidden);
    }
    filter.team_id = Some(claims.team);
    let users = db::users::list(&state.pool, &filter, &page).await?;
    Ok(Json(json!({ "users": users })).into_response())
}

pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(id): Query<IdQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let id = id.require()?;
    if !is_admin(&claims) && claims.id != id {
        return Err(ApiError::Forbidden);
    }
    let payload: UserPayload = parse_body(&body)?;
    payload.check()?;
    if !is_admin(&claims) && payload.role != claims.role {
        return Err(ApiError::Forbidden);
    }
    let team_id = payload.team_for(&claims)?;
    match db::users::team_of(&state.pool, id).await? {
        None => return Err(ApiError::NotFound("User not found".to_string())),
        Some(team) if team != claims.team => {
            tracing::warn!("{} tried to update user {} of team {}", claims.username, id, team);
            return Err(ApiError::Forbidden);
        }
        Some(_) => {}
    }
    let user = payload.into_new_user(team_id).await?;
    // the write is scoped to the caller's team as well
    if db::users::update(&state.pool, id, &user).await? == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    Ok(Json(UpdatedUser {
        id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        role: user.role,
        team_id,
    })
    .into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(ids): Query<IdsQuery>,
) -> Result<Response, ApiError> {
    if !is_admin(&claims) {
        return Err(ApiError::Forbidden);
    }
    let ids = ids.parse()?;
    let removed = db::users::delete(&state.pool, claims.team, &ids).await?;
    tracing::info!("Deleted {} of {} requested users", removed, ids.len());
    Ok(message(StatusCode::OK, "User(s) Deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str) -> Claims {
        Claims {
            id: 1,
            username: "admin".to_string(),
            team: 7,
            role: role.to_string(),
            iat: 0,
            exp: 0,
        }
    }

    fn payload(team_id: Option<i64>) -> UserPayload {
        UserPayload {
            username: "sara".to_string(),
            first_name: "Sara".to_string(),
            last_name: "Khan".to_string(),
            role: "user".to_string(),
            password: Some("pw".to_string()),
            team_id,
        }
    }

    #[test]
    fn users_stay_in_the_callers_team() {
        assert_eq!(payload(None).team_for(&claims(ADMIN_ROLE)).unwrap(), 7);
        assert_eq!(payload(Some(7)).team_for(&claims(ADMIN_ROLE)).unwrap(), 7);
        assert!(matches!(
            payload(Some(8)).team_for(&claims(ADMIN_ROLE)),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn blank_password_is_invalid() {
        let mut p = payload(None);
        p.password = Some(" ".to_string());
        assert!(matches!(p.check(), Err(ApiError::Validation(_))));
        assert!(payload(None).check().is_ok());
    }

    #[test]
    fn payload_rejects_unknown_fields() {
        let err = parse_body::<UserPayload>(
            br#"{"username":"a","firstName":"b","lastName":"c","role":"user","hash":"x"}"#,
        );
        assert!(matches!(err, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn updates_carry_the_callers_team() {
        let mut p = payload(None);
        p.password = None;
        let team = p.team_for(&claims(ADMIN_ROLE)).unwrap();
        let user = p.into_new_user(team).await.unwrap();
        assert_eq!(user.team_id, 7);
        assert!(user.hash.is_none());
    }
}
