//! Shared helpers for suites that need a live PostgreSQL server.
//!
//! Point `ACCOUNTS_TEST_DATABASE_URL` at a disposable database to run them.
//! Without it the tests print a skip marker and pass.

use accounts_backend::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use diesel_async::RunQueryDsl;
use tokio::sync::{Mutex, MutexGuard};

pub const DATABASE_URL_ENV: &str = "ACCOUNTS_TEST_DATABASE_URL";

// Suites share one database, so tests take turns.
static DATABASE_LOCK: Mutex<()> = Mutex::const_new(());

/// A migrated, emptied database held exclusively for one test.
pub struct TestDatabase {
    pub pool: DbPool,
    _guard: MutexGuard<'static, ()>,
}

/// Connect, migrate and truncate, or `None` when no database is configured.
pub async fn test_database() -> Option<TestDatabase> {
    let Ok(url) = std::env::var(DATABASE_URL_ENV) else {
        eprintln!("SKIP-TEST-DATABASE: {DATABASE_URL_ENV} is not set");
        return None;
    };
    let guard = DATABASE_LOCK.lock().await;
    run_pending_migrations(&url)
        .await
        .expect("migrations apply");
    let pool = DbPool::new(PoolConfig::new(url).with_max_size(4))
        .await
        .expect("pool builds");
    let mut conn = pool.get().await.expect("connection available");
    diesel::sql_query("TRUNCATE users, invitation_codes")
        .execute(&mut conn)
        .await
        .expect("tables truncate");
    drop(conn);
    Some(TestDatabase {
        pool,
        _guard: guard,
    })
}
