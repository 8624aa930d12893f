use super::{ListQuery, Page};
use crate::models::TemplateRow;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFilter {
    pub id: Option<i64>,
    pub name: Option<String>,
}

pub fn list_query(filter: &TemplateFilter, page: &Page) -> QueryBuilder<'static, Postgres> {
    ListQuery::select("*", "templates")
        .like("name", filter.name.as_deref())
        .eq("id", filter.id)
        .paged(page)
}

pub async fn list(pool: &PgPool, filter: &TemplateFilter, page: &Page) -> Result<Vec<TemplateRow>, sqlx::Error> {
    let mut query = list_query(filter, page);
    query.build_query_as::<TemplateRow>().fetch_all(pool).await
}

pub async fn insert(pool: &PgPool, name: &str) -> Result<TemplateRow, sqlx::Error> {
    sqlx::query_as::<_, TemplateRow>("INSERT INTO templates (name) VALUES ($1) RETURNING *")
        .bind(name)
        .fetch_one(pool)
        .await
}

pub async fn update(pool: &PgPool, id: i64, name: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE templates SET name = $1, updated_at = now() WHERE id = $2")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete(pool: &PgPool, ids: &[i64]) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM templates WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
