//! # pb-db-sqlite
//!
//! SQLite implementation of `DocumentStore`.
//! Each record is one row holding its JSON body; filters and ordering are
//! evaluated with `json_extract`, so the schema never has to follow the
//! report shape.

use std::str::FromStr;

use async_trait::async_trait;
use pb_core::traits::{Direction, Document, DocumentStore, Fields, Query};
use pb_core::{AppError, Result, TransportKind};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    id         TEXT NOT NULL,
    body       TEXT NOT NULL,
    UNIQUE (collection, id)
)";

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Opens (creating if needed) the database at `url` and ensures the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_error)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(db_error)?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(db_error)?;
        debug!(%url, "document store ready");
        Ok(Self { pool })
    }

    /// A private database that lives as long as the store.
    /// Limited to one connection: every connection to `:memory:` is a new database.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?");
        for _ in &query.filters {
            sql.push_str(" AND json_extract(body, ?) = json_extract(?, '$')");
        }
        if let Some(order) = &query.order_by {
            // NULLs (missing field) come last in DESC
            let direction = match order.direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };
            sql.push_str(&format!(
                " ORDER BY json_extract(body, ?) {direction}, seq {direction}"
            ));
        } else {
            sql.push_str(" ORDER BY seq");
        }

        let mut statement = sqlx::query(&sql).bind(collection);
        for filter in &query.filters {
            statement = statement
                .bind(json_path(&filter.field))
                .bind(filter.value.to_string());
        }
        if let Some(order) = &query.order_by {
            statement = statement.bind(json_path(&order.field));
        }

        let rows = statement.fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(document_from_row).collect()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT id, body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.as_ref().map(document_from_row).transpose()
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
            .bind(collection)
            .bind(&id)
            .bind(Value::Object(fields).to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(id)
    }

    /// Read-merge-write inside one transaction so concurrent merges on the
    /// same record do not lose fields.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row = sqlx::query("SELECT id, body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        let mut current = match row {
            Some(row) => document_from_row(&row)?,
            None => {
                return Err(AppError::transport(
                    TransportKind::NotFound,
                    format!("no document {id} in {collection}"),
                ))
            }
        };

        merge(&mut current.fields, fields);

        sqlx::query("UPDATE documents SET body = ? WHERE collection = ? AND id = ?")
            .bind(Value::Object(current.fields).to_string())
            .bind(collection)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}

fn merge(target: &mut Fields, changes: Fields) {
    for (key, value) in changes {
        if value.is_null() {
            target.remove(&key);
        } else {
            target.insert(key, value);
        }
    }
}

fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    let id: String = row.try_get("id").map_err(db_error)?;
    let body: String = row.try_get("body").map_err(db_error)?;
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(fields)) => Ok(Document { id, fields }),
        Ok(_) => Err(AppError::Decode {
            id,
            reason: "record body is not an object".into(),
        }),
        Err(err) => Err(AppError::Decode {
            id,
            reason: err.to_string(),
        }),
    }
}

fn db_error(err: sqlx::Error) -> AppError {
    let kind = match &err {
        sqlx::Error::RowNotFound => TransportKind::NotFound,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            TransportKind::Unavailable
        }
        _ => TransportKind::Unknown,
    };
    AppError::transport(kind, err.to_string())
}
