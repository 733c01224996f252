use crate::error::Result;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

static MIGRATIONS: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct Db {
    pub pool: SqlitePool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await?;
        info!("connected to db");

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Private in-memory database. The single connection is never reaped, since
    /// closing it would discard the data.
    pub async fn connect_in_memory() -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATIONS.run(&self.pool).await?;
        info!("schema up to date");
        Ok(())
    }

    /// Cheap connectivity probe used by the health endpoint.
    pub async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    /// Row counts per table, split by provenance.
    pub async fn counts(&self) -> Result<TableCounts> {
        let row: (i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            "SELECT
                (SELECT COUNT(*) FROM film),
                (SELECT COUNT(*) FROM film WHERE official = 1),
                (SELECT COUNT(*) FROM planet),
                (SELECT COUNT(*) FROM planet WHERE official = 1),
                (SELECT COUNT(*) FROM association),
                (SELECT COUNT(*) FROM association WHERE official = 1)",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(TableCounts {
            films: row.0,
            official_films: row.1,
            planets: row.2,
            official_planets: row.3,
            associations: row.4,
            official_associations: row.5,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TableCounts {
    pub films: i64,
    pub official_films: i64,
    pub planets: i64,
    pub official_planets: i64,
    pub associations: i64,
    pub official_associations: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_database_is_empty() {
        let db = Db::connect_in_memory().await.unwrap();
        assert!(db.ping().await);
        assert_eq!(db.counts().await.unwrap(), TableCounts::default());
    }
}
