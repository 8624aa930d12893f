use crate::models::ReportCounts;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Rows created inside `[start, end]`; invoices count only for the given team
pub async fn counts(
    pool: &PgPool,
    team_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<ReportCounts, sqlx::Error> {
    let (total_invoices,): (i64,) = sqlx::query_as(
        "SELECT count(*) FROM invoices WHERE team_id = $1 AND created_at BETWEEN $2 AND $3",
    )
    .bind(team_id)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    let (total_clients, total_importers): (i64, i64) = sqlx::query_as(
        r#"
        SELECT count(*) FILTER (WHERE kind = 'client'),
               count(*) FILTER (WHERE kind = 'importer')
        FROM parties
        WHERE created_at BETWEEN $1 AND $2
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    tracing::debug!(
        "Report {} .. {}: {} invoices, {} clients, {} importers",
        start,
        end,
        total_invoices,
        total_clients,
        total_importers
    );
    Ok(ReportCounts {
        total_invoices,
        total_clients,
        total_importers,
    })
}
