use anyhow::Context;
use diesel::{Connection, PgConnection};
use diesel_async::{
    AsyncPgConnection,
    pooled_connection::{AsyncDieselConnectionManager, bb8::Pool},
};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::config::DatabaseConfig;

pub type DbPool = Pool<AsyncPgConnection>;

/// Migrations embedded into the binary which helps with streamlining image building process
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Builds the shared bb8 pool. Checkout waits at most `config.timeout`.
pub async fn create_pool(config: &DatabaseConfig) -> anyhow::Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.url);

    Pool::builder()
        .max_size(config.max_connections)
        .connection_timeout(config.timeout)
        .build(manager)
        .await
        .context("Failed to build the DB connection pool")
}

/// Applies pending migrations over a dedicated synchronous connection and
/// returns how many ran.
pub async fn run_migrations_blocking(
    migrations: EmbeddedMigrations,
    url: &str,
) -> anyhow::Result<usize> {
    let url = url.to_string();

    tokio::task::spawn_blocking(move || {
        let mut conn =
            PgConnection::establish(&url).context("Failed to connect to run migrations")?;
        let applied = conn
            .run_pending_migrations(migrations)
            .map_err(|err| anyhow::anyhow!(err))
            .context("Failed to run migrations")?;
        Ok(applied.len())
    })
    .await
    .context("Migration task panicked")?
}
