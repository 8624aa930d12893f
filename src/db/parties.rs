use super::{timed, ListQuery, Page, INSERT_CHUNK_ROWS};
use crate::models::{NewParty, Party, PartyKey, PartyKind};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Query-string filters for `GET /api/client`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyFilter {
    pub id: Option<i64>,
    pub cnic: Option<String>,
    pub ntn: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "bussinessName")]
    pub business_name: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<PartyKind>,
}

/// Everything but the CNIC, which can be filtered on but is not listed
const LIST_COLUMNS: &str =
    "id, serial_number, name, business_name, ntn, strn, address, phone, kind, created_at, updated_at";

pub fn list_query(filter: &PartyFilter, page: &Page) -> QueryBuilder<'static, Postgres> {
    ListQuery::select(LIST_COLUMNS, "parties")
        .like("cnic", filter.cnic.as_deref())
        .like("ntn", filter.ntn.as_deref())
        .like("name", filter.name.as_deref())
        .like("business_name", filter.business_name.as_deref())
        .like("phone", filter.phone.as_deref())
        .eq("kind", filter.kind.map(|k| k.as_str()))
        .eq("id", filter.id)
        .paged(page)
}

pub async fn list(pool: &PgPool, filter: &PartyFilter, page: &Page) -> Result<Vec<Party>, sqlx::Error> {
    let mut query = list_query(filter, page);
    query.build_query_as::<Party>().fetch_all(pool).await
}

fn insert_query(parties: &[NewParty]) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO parties (serial_number, name, business_name, cnic, ntn, strn, address, phone, kind) ",
    );
    query.push_values(parties, |mut b, p| {
        b.push_bind(p.serial_number.clone())
            .push_bind(p.name.clone())
            .push_bind(p.business_name.clone())
            .push_bind(p.cnic.clone())
            .push_bind(p.ntn.clone())
            .push_bind(p.strn.clone())
            .push_bind(p.address.clone())
            .push_bind(p.phone.clone())
            .push_bind(p.kind.as_str());
    });
    query.push(" RETURNING *");
    query
}

/// Bulk insert in chunks of `INSERT_CHUNK_ROWS`, all in one transaction,
/// returning the stored rows
pub async fn insert(pool: &PgPool, parties: &[NewParty]) -> Result<Vec<Party>, sqlx::Error> {
    if parties.is_empty() {
        return Ok(Vec::new());
    }
    tracing::debug!("Building party insert for {} rows", parties.len());

    let mut tx = pool.begin().await?;
    let mut stored = Vec::with_capacity(parties.len());
    for (i, chunk) in parties.chunks(INSERT_CHUNK_ROWS).enumerate() {
        let mut query = insert_query(chunk);
        let label = format!("INSERT {} parties (chunk {})", chunk.len(), i + 1);
        let rows = timed(&label, query.build_query_as::<Party>().fetch_all(&mut *tx)).await?;
        stored.extend(rows);
    }
    tx.commit().await?;
    Ok(stored)
}

/// Full replace of one row; returns the number of rows touched
pub async fn update(pool: &PgPool, id: i64, party: &NewParty) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE parties
        SET serial_number = $1, name = $2, business_name = $3, cnic = $4, ntn = $5,
            strn = $6, address = $7, phone = $8, kind = $9, updated_at = now()
        WHERE id = $10
        "#,
    )
    .bind(&party.serial_number)
    .bind(&party.name)
    .bind(&party.business_name)
    .bind(&party.cnic)
    .bind(&party.ntn)
    .bind(&party.strn)
    .bind(&party.address)
    .bind(&party.phone)
    .bind(party.kind.as_str())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete(pool: &PgPool, ids: &[i64]) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM parties WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// NTN/CNIC pairs already stored for `kind`, for import deduplication
pub async fn existing_keys(pool: &PgPool, kind: PartyKind) -> Result<Vec<PartyKey>, sqlx::Error> {
    sqlx::query_as::<_, PartyKey>("SELECT ntn, cnic FROM parties WHERE kind = $1")
        .bind(kind.as_str())
        .fetch_all(pool)
        .await
}
