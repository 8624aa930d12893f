use super::{ListQuery, Page};
use crate::models::{NewUser, Team, User, UserCredentials, ADMIN_ROLE};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Everything but the hash
const USER_COLUMNS: &str = "id, username, first_name, last_name, role, team_id, created_at, updated_at";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub team_id: Option<i64>,
}

pub fn list_query(filter: &UserFilter, page: &Page) -> QueryBuilder<'static, Postgres> {
    ListQuery::select(USER_COLUMNS, "users")
        .like("username", filter.username.as_deref())
        .like("first_name", filter.first_name.as_deref())
        .like("last_name", filter.last_name.as_deref())
        .eq("role", filter.role.clone().filter(|r| !r.is_empty()))
        .eq("team_id", filter.team_id)
        .eq("id", filter.id)
        .paged(page)
}

pub async fn list(pool: &PgPool, filter: &UserFilter, page: &Page) -> Result<Vec<User>, sqlx::Error> {
    let mut query = list_query(filter, page);
    query.build_query_as::<User>().fetch_all(pool).await
}

/// `user.hash` must be set; the column is not nullable
pub async fn insert(pool: &PgPool, user: &NewUser) -> Result<User, sqlx::Error> {
    let sql = format!(
        "INSERT INTO users (username, first_name, last_name, role, team_id, hash) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.role)
        .bind(user.team_id)
        .bind(&user.hash)
        .fetch_one(pool)
        .await
}

const UPDATE_SQL: &str = r#"
    UPDATE users
    SET username = $1, first_name = $2, last_name = $3, role = $4,
        hash = COALESCE($5, hash), updated_at = now()
    WHERE id = $6 AND team_id = $7
"#;

/// Update profile fields of a user in `user.team_id`; a user of another team
/// is left untouched and 0 is returned. The hash is only replaced when one
/// is given. Users never change team here.
pub async fn update(pool: &PgPool, id: i64, user: &NewUser) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(UPDATE_SQL)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.role)
        .bind(&user.hash)
        .bind(id)
        .bind(user.team_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn team_of(pool: &PgPool, id: i64) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT team_id FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn delete(pool: &PgPool, team_id: i64, ids: &[i64]) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ANY($1) AND team_id = $2")
        .bind(ids)
        .bind(team_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn credentials(pool: &PgPool, username: &str) -> Result<Option<UserCredentials>, sqlx::Error> {
    sqlx::query_as::<_, UserCredentials>(
        "SELECT id, username, hash, role, team_id FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn set_password(pool: &PgPool, id: i64, hash: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET hash = $1, updated_at = now() WHERE id = $2")
        .bind(hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Create a team and its admin, but only while no user exists yet
pub async fn bootstrap_admin(
    pool: &PgPool,
    team_name: &str,
    username: &str,
    hash: &str,
) -> Result<Option<User>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let (existing,): (i64,) = sqlx::query_as("SELECT count(*) FROM users")
        .fetch_one(&mut *tx)
        .await?;
    if existing > 0 {
        return Ok(None);
    }

    let team = sqlx::query_as::<_, Team>("INSERT INTO teams (name) VALUES ($1) RETURNING id, name")
        .bind(team_name)
        .fetch_one(&mut *tx)
        .await?;
    let sql = format!(
        "INSERT INTO users (username, first_name, last_name, role, team_id, hash) \
         VALUES ($1, $2, '', $3, $4, $5) RETURNING {}",
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .bind(username)
        .bind(ADMIN_ROLE)
        .bind(team.id)
        .bind(hash)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;
    tracing::info!("Bootstrapped admin {} in team {} ({})", user.username, team.name, team.id);
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_never_selects_the_hash() {
        let filter = UserFilter {
            username: Some("ali%".to_string()),
            team_id: Some(2),
            ..Default::default()
        };
        let sql = list_query(&filter, &Page::default()).sql().to_string();
        assert!(!sql.contains("hash"));
        assert!(sql.ends_with("WHERE username LIKE $1 AND team_id = $2 ORDER BY id LIMIT $3 OFFSET $4"));
    }

    #[test]
    fn update_is_scoped_to_the_team_and_keeps_it() {
        let (set, scope) = UPDATE_SQL.split_once("WHERE").unwrap();
        assert!(!set.contains("team_id"));
        assert!(scope.contains("id = $6 AND team_id = $7"));
    }
}
