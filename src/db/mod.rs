//! Pool setup and the per-request connection helper.
//!
//! The pool is created lazily, so the server comes up even while the
//! database is down. Each request borrows one connection for its whole
//! lifetime; failing to get one is the "database unavailable" case every
//! handler degrades on.

use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Postgres;
use tracing::{info, warn};

use crate::utils::error::AppError;

pub mod events;
pub mod feedback;
pub mod registrations;
pub mod students;

pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub type DbConnection = PoolConnection<Postgres>;

pub fn create_pool(
    options: PgConnectOptions,
    max_connections: u32,
    acquire_timeout: Duration,
) -> PgPool {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .test_before_acquire(true)
        .connect_lazy_with(options)
}

pub async fn acquire(pool: &PgPool) -> Result<DbConnection, AppError> {
    pool.acquire().await.map_err(AppError::DatabaseUnavailable)
}

/// Applies pending migrations. A failure leaves the server running in
/// degraded mode rather than refusing to start.
pub async fn migrate(pool: &PgPool) -> bool {
    match sqlx::migrate!().run(pool).await {
        Ok(()) => {
            info!("Migrations run successfully");
            true
        }
        Err(e) => {
            warn!(error = %e, "Failed to run migrations, continuing without them");
            false
        }
    }
}

/// Wraps a search term for `ILIKE`, escaping the pattern metacharacters so a
/// literal `%` or `_` only matches itself.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("cse"), "%cse%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }

    #[tokio::test]
    async fn test_unreachable_database_is_reported_as_unavailable() {
        let options = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(1)
            .username("portal")
            .database("portal");
        let pool = create_pool(options, 1, Duration::from_millis(200));

        let err = acquire(&pool).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseUnavailable(_)));
    }
}
