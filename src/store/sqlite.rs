use std::str::FromStr as _;

use tracing::error;

use super::BlobStore;

/// Blobs kept in a single SQLite table, for working without a bucket.
#[derive(Clone)]
pub struct SqliteStore {
    pool: sqlx::SqlitePool,
}

impl SqliteStore {
    pub async fn open(url: &str) -> Result<Self, sqlx::Error> {
        let options = sqlx::sqlite::SqliteConnectOptions::from_str(url)
            .inspect_err(|error| error!(%error, %url, "Failed to open local storage db"))?
            .create_if_missing(true);
        let pool = sqlx::pool::PoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .inspect_err(|error| error!(%error, %url, "Failed to open local storage db"))?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS blob(
                id TEXT NOT NULL PRIMARY KEY,
                body BLOB NOT NULL
            );
        "#,
        )
        .execute(&pool)
        .await
        .inspect_err(|error| error!(%error, %url, "Failed to execute DDL to storage db"))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }
}

impl BlobStore for SqliteStore {
    type Error = sqlx::Error;

    async fn get(&self, blob: &str) -> Result<Option<bytes::Bytes>, Self::Error> {
        let body = sqlx::query_scalar::<_, Vec<u8>>("SELECT body FROM blob WHERE id = ?")
            .bind(blob)
            .fetch_optional(&self.pool)
            .await?;
        Ok(body.map(bytes::Bytes::from))
    }

    async fn put(&self, blob: &str, body: bytes::Bytes) -> Result<(), Self::Error> {
        sqlx::query(
            r#"
            INSERT INTO blob(id, body)
            VALUES (?, ?)
            ON CONFLICT(id)
            DO UPDATE SET
                body = EXCLUDED.body
        "#,
        )
        .bind(blob)
        .bind(body.as_ref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
