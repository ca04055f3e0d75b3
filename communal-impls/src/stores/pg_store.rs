use async_trait::async_trait;
use chrono::{DateTime, Utc};
use communal_core::{Document, DocumentPath, DocumentStore, StoreError, StoreResult, Transaction};
use log::{debug, info};
use serde_json::Value;
use sqlx::{
    postgres::PgPoolOptions, query, query_as, query_scalar, Error as SqlxError, PgPool, Postgres,
};

/// A postgres document store.
/// Documents live in a single table keyed by path, and transactions run as `SERIALIZABLE`,
/// so a transaction whose reads were invalidated by another commit fails instead of committing.
pub struct PgStore {
    pool: PgPool,
}

struct PgTransaction {
    transaction: sqlx::Transaction<'static, Postgres>,
    writes: Vec<(DocumentPath, Option<Document>)>,
}

impl PgStore {
    /// Connects to the database and ensures the documents table exists
    pub async fn new(url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| e.into_store_error())?;

        let store = Self { pool };
        store.migrate().await?;

        info!("Connected to postgres document store");
        Ok(store)
    }

    async fn migrate(&self) -> StoreResult<()> {
        query(
            "
            CREATE TABLE IF NOT EXISTS documents (
                path TEXT PRIMARY KEY,
                data JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| e.into_store_error())
        .map(|_| ())
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        let mut transaction = self.pool.begin().await.map_err(|e| e.into_store_error())?;

        query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *transaction)
            .await
            .map_err(|e| e.into_store_error())?;

        Ok(Box::new(PgTransaction {
            transaction,
            writes: Vec::new(),
        }))
    }

    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        let row: Option<(Value,)> = query_as("SELECT data FROM documents WHERE path = $1")
            .bind(path.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| e.into_store_error())?;

        row.map(|(data,)| Document::from_value(data)).transpose()
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn get(&mut self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        let row: Option<(Value,)> = query_as("SELECT data FROM documents WHERE path = $1")
            .bind(path.as_str())
            .fetch_optional(&mut *self.transaction)
            .await
            .map_err(|e| e.into_store_error())?;

        row.map(|(data,)| Document::from_value(data)).transpose()
    }

    fn set(&mut self, path: DocumentPath, document: Document) {
        self.writes.push((path, Some(document)));
    }

    fn delete(&mut self, path: DocumentPath) {
        self.writes.push((path, None));
    }

    async fn commit(self: Box<Self>) -> StoreResult<DateTime<Utc>> {
        let PgTransaction {
            mut transaction,
            writes,
        } = *self;

        // The transaction start time, shared by every write in it
        let committed_at: DateTime<Utc> = query_scalar("SELECT now()")
            .fetch_one(&mut *transaction)
            .await
            .map_err(|e| e.into_store_error())?;

        for (path, document) in writes {
            match document {
                Some(document) => {
                    let data = document.resolve_server_timestamps(committed_at).into_value();

                    query(
                        "
                        INSERT INTO documents (path, data, updated_at)
                        VALUES ($1, $2, $3)
                        ON CONFLICT (path) DO UPDATE
                            SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at",
                    )
                    .bind(path.as_str())
                    .bind(data)
                    .bind(committed_at)
                    .execute(&mut *transaction)
                    .await
                    .map_err(|e| e.into_store_error())?;
                }
                None => {
                    query("DELETE FROM documents WHERE path = $1")
                        .bind(path.as_str())
                        .execute(&mut *transaction)
                        .await
                        .map_err(|e| e.into_store_error())?;
                }
            }
        }

        transaction
            .commit()
            .await
            .map_err(|e| e.into_store_error())?;

        debug!("Committed postgres transaction at {committed_at}");
        Ok(committed_at)
    }
}

/// Helper trait to reduce boilerplate
trait IntoStoreError {
    fn into_store_error(self) -> StoreError;
}

impl IntoStoreError for SqlxError {
    fn into_store_error(self) -> StoreError {
        if is_conflict(&self) {
            return StoreError::Conflict;
        }

        match self {
            e @ (SqlxError::Io(_) | SqlxError::PoolTimedOut | SqlxError::PoolClosed) => {
                StoreError::Unavailable(e.to_string())
            }
            e => StoreError::Internal(Box::new(e)),
        }
    }
}

/// Serialization failures, deadlocks, and racing inserts all mean another transaction won
fn is_conflict(error: &SqlxError) -> bool {
    match error {
        SqlxError::Database(e) => matches!(e.code().as_deref(), Some("40001" | "40P01" | "23505")),
        _ => false,
    }
}
