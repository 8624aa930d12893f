use serde::Deserialize;
use sqlx::{Encode, Postgres, QueryBuilder, Type};

pub const DEFAULT_PAGE_LIMIT: i64 = 100;

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

/// `limit`/`pageNo` query parameters; offset is `limit * pageNo`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub page_no: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            page_no: 0,
        }
    }
}

impl Page {
    pub fn limit(&self) -> i64 {
        self.limit.max(0)
    }

    /// Saturates instead of overflowing on absurd page numbers
    pub fn offset(&self) -> i64 {
        self.limit().saturating_mul(self.page_no.max(0))
    }
}

/// `SELECT ... WHERE` builder for the list endpoints. Text filters use `LIKE`
/// with the value as given, id filters use equality; empty values are skipped.
pub struct ListQuery {
    builder: QueryBuilder<'static, Postgres>,
    conditions: usize,
}

impl ListQuery {
    pub fn select(columns: &str, table: &str) -> Self {
        Self {
            builder: QueryBuilder::new(format!("SELECT {} FROM {}", columns, table)),
            conditions: 0,
        }
    }

    fn condition(&mut self, column: &str, op: &str) -> &mut QueryBuilder<'static, Postgres> {
        let joiner = if self.conditions == 0 { " WHERE " } else { " AND " };
        self.conditions += 1;
        self.builder.push(joiner).push(column).push(op)
    }

    pub fn like(mut self, column: &str, value: Option<&str>) -> Self {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.condition(column, " LIKE ").push_bind(v.to_string());
        }
        self
    }

    pub fn eq<T>(mut self, column: &str, value: Option<T>) -> Self
    where
        T: 'static + Encode<'static, Postgres> + Type<Postgres> + Send,
    {
        if let Some(v) = value {
            self.condition(column, " = ").push_bind(v);
        }
        self
    }

    pub fn paged(mut self, page: &Page) -> QueryBuilder<'static, Postgres> {
        self.builder
            .push(" ORDER BY id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        self.builder
    }
}
