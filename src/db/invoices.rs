use super::{timed, ListQuery, Page, INSERT_CHUNK_ROWS};
use crate::models::{Invoice, NewInvoice};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Query-string filters for `GET /api/invoice`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFilter {
    pub id: Option<i64>,
    pub invoice_number: Option<String>,
    pub goods: Option<String>,
    pub good_number: Option<String>,
    #[serde(alias = "hsCODE")]
    pub hs_code: Option<String>,
    #[serde(alias = "FBRCode")]
    pub fbr_code: Option<String>,
    pub client_id: Option<i64>,
    pub importer_id: Option<i64>,
    pub template_id: Option<i64>,
}

/// Invoices are always scoped to the caller's team
pub fn list_query(team_id: i64, filter: &InvoiceFilter, page: &Page) -> QueryBuilder<'static, Postgres> {
    ListQuery::select("*", "invoices")
        .eq("team_id", Some(team_id))
        .like("invoice_number", filter.invoice_number.as_deref())
        .like("goods", filter.goods.as_deref())
        .like("good_number", filter.good_number.as_deref())
        .like("hs_code", filter.hs_code.as_deref())
        .like("fbr_code", filter.fbr_code.as_deref())
        .eq("client_id", filter.client_id)
        .eq("importer_id", filter.importer_id)
        .eq("template_id", filter.template_id)
        .eq("id", filter.id)
        .paged(page)
}

pub async fn list(
    pool: &PgPool,
    team_id: i64,
    filter: &InvoiceFilter,
    page: &Page,
) -> Result<Vec<Invoice>, sqlx::Error> {
    let mut query = list_query(team_id, filter, page);
    query.build_query_as::<Invoice>().fetch_all(pool).await
}

fn insert_query(invoices: &[NewInvoice]) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO invoices (
            invoice_number, invoice_date, client_id, importer_id, template_id, team_id,
            goods, good_number, hs_code, fbr_code, quantity_units,
            value, gst, vat, unit_price
        ) ",
    );
    query.push_values(invoices, |mut b, inv| {
        b.push_bind(inv.invoice_number.clone())
            .push_bind(inv.invoice_date.clone())
            .push_bind(inv.client_id)
            .push_bind(inv.importer_id)
            .push_bind(inv.template_id)
            .push_bind(inv.team_id)
            .push_bind(inv.goods.clone())
            .push_bind(inv.good_number.clone())
            .push_bind(inv.hs_code.clone())
            .push_bind(inv.fbr_code.clone())
            .push_bind(inv.quantity_units)
            .push_bind(inv.value.clone())
            .push_bind(inv.gst.clone())
            .push_bind(inv.vat.clone())
            .push_bind(inv.unit_price.clone());
    });
    query.push(" RETURNING *");
    query
}

/// Chunked bulk insert; either every row is stored or none is
pub async fn insert(pool: &PgPool, invoices: &[NewInvoice]) -> Result<Vec<Invoice>, sqlx::Error> {
    if invoices.is_empty() {
        return Ok(Vec::new());
    }
    tracing::debug!("Building invoice insert for {} rows", invoices.len());

    let mut tx = pool.begin().await?;
    let mut stored = Vec::with_capacity(invoices.len());
    for (i, chunk) in invoices.chunks(INSERT_CHUNK_ROWS).enumerate() {
        let mut query = insert_query(chunk);
        let label = format!("INSERT {} invoices (chunk {})", chunk.len(), i + 1);
        stored.extend(timed(&label, query.build_query_as::<Invoice>().fetch_all(&mut *tx)).await?);
    }
    tx.commit().await?;
    Ok(stored)
}

/// Replace one of the team's invoices; 0 when it does not exist for this team
pub async fn update(pool: &PgPool, id: i64, invoice: &NewInvoice) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE invoices
        SET invoice_number = $1, invoice_date = $2, client_id = $3, importer_id = $4,
            template_id = $5, goods = $6, good_number = $7, hs_code = $8, fbr_code = $9,
            quantity_units = $10, value = $11, gst = $12, vat = $13, unit_price = $14,
            updated_at = now()
        WHERE id = $15 AND team_id = $16
        "#,
    )
    .bind(&invoice.invoice_number)
    .bind(&invoice.invoice_date)
    .bind(invoice.client_id)
    .bind(invoice.importer_id)
    .bind(invoice.template_id)
    .bind(&invoice.goods)
    .bind(&invoice.good_number)
    .bind(&invoice.hs_code)
    .bind(&invoice.fbr_code)
    .bind(invoice.quantity_units)
    .bind(&invoice.value)
    .bind(&invoice.gst)
    .bind(&invoice.vat)
    .bind(&invoice.unit_price)
    .bind(id)
    .bind(invoice.team_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete(pool: &PgPool, team_id: i64, ids: &[i64]) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM invoices WHERE id = ANY($1) AND team_id = $2")
        .bind(ids)
        .bind(team_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    #[test]
    fn client_filter_with_second_page() {
        let filter = InvoiceFilter {
            client_id: Some(3),
            ..Default::default()
        };
        let page = Page { limit: 10, page_no: 1 };
        let query = list_query(9, &filter, &page);
        assert_eq!(
            query.sql(),
            "SELECT * FROM invoices WHERE team_id = $1 AND client_id = $2 ORDER BY id LIMIT $3 OFFSET $4"
        );
        assert_eq!((page.limit(), page.offset()), (10, 10));
    }

    #[test]
    fn code_filters_use_like() {
        let filter: InvoiceFilter =
            serde_json::from_str(r#"{"hsCODE": "52%", "FBRCode": "F%"}"#).unwrap();
        let query = list_query(1, &filter, &Page::default());
        assert_eq!(
            query.sql(),
            "SELECT * FROM invoices WHERE team_id = $1 AND hs_code LIKE $2 AND fbr_code LIKE $3 ORDER BY id LIMIT $4 OFFSET $5"
        );
    }

    #[test]
    fn a_full_chunk_stays_under_the_bind_limit() {
        const INSERT_COLUMNS: usize = 15;
        assert!(INSERT_CHUNK_ROWS * INSERT_COLUMNS <= crate::db::MAX_BIND_PARAMS);

        let invoice = NewInvoice {
            invoice_number: "INV-1".to_string(),
            invoice_date: "2024-03-01".to_string(),
            client_id: 1,
            importer_id: 2,
            template_id: 3,
            team_id: 4,
            goods: "Cotton".to_string(),
            good_number: "G-1".to_string(),
            hs_code: "5201".to_string(),
            fbr_code: "F1".to_string(),
            quantity_units: 10,
            value: BigDecimal::from(100),
            gst: BigDecimal::from(17),
            vat: BigDecimal::from(0),
            unit_price: BigDecimal::from(10),
        };
        let rows = vec![invoice; INSERT_CHUNK_ROWS];
        let sql = insert_query(&rows).sql().to_string();
        assert!(sql.contains(&format!("${}", INSERT_CHUNK_ROWS * INSERT_COLUMNS)));
        assert!(!sql.contains(&format!("${}", INSERT_CHUNK_ROWS * INSERT_COLUMNS + 1)));
    }
}
