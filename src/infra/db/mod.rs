//! Postgres-backed repository implementations.
//!
//! Like and view sets live in `UUID[]` columns and are mutated with single
//! `UPDATE … RETURNING` statements, so concurrent toggles never lose members.

mod content;
mod market;
mod social;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

const TARGET: &str = "agora::infra::db";
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// One pool shared by every repository trait; cloning is cheap.
#[derive(Clone)]
pub struct PostgresRepositories {
    pool: PgPool,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `url`. Waiting for a free connection is capped so
    /// an exhausted pool surfaces as `RepoError::Timeout` instead of hanging.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(url)
            .await?;
        info!(target: TARGET, max_connections, "database pool opened");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        MIGRATOR.run(&self.pool).await?;
        info!(target: TARGET, "migrations up to date");
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map(|_| ())
    }
}
