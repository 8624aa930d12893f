pub mod filter;
pub mod invoices;
pub mod parties;
pub mod pool;
pub mod reports;
pub mod templates;
pub mod users;

pub use filter::{ListQuery, Page};
pub use pool::create_pool;

use std::future::Future;
use std::time::{Duration, Instant};

/// Rows per bulk INSERT statement
pub(crate) const INSERT_CHUNK_ROWS: usize = 1000;

/// Postgres caps bind parameters per statement at this many
#[cfg(test)]
pub(crate) const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Upper bound for a single write statement
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Run a write under the timeout, logging how long it took
pub(crate) async fn timed<T, F>(label: &str, fut: F) -> Result<T, sqlx::Error>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let start = Instant::now();
    match tokio::time::timeout(WRITE_TIMEOUT, fut).await {
        Ok(Ok(value)) => {
            tracing::info!("{} finished in {:?}", label, start.elapsed());
            Ok(value)
        }
        Ok(Err(e)) => {
            tracing::error!("{} failed after {:?}: {:?}", label, start.elapsed(), e);
            Err(e)
        }
        Err(_) => {
            tracing::error!("{} timed out (>{}s)", label, WRITE_TIMEOUT.as_secs());
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}
