//! Document store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use async_trait::async_trait;
use coffer_core::Persistable;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// A document as held by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredDoc {
    pub doc_type: String,
    pub id: String,
    pub rev: String,
    /// Full JSON body, including `id` and `rev`.
    pub body: serde_json::Value,
}

/// Store for structured metadata documents with optimistic revisioning.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Create a document.
    ///
    /// Uses the document's id when it already has one, otherwise assigns a
    /// fresh one. On success the document carries its first revision.
    /// Fails with [`MetadataError::Conflict`] if the id is taken.
    async fn create_doc(&self, doc: &mut dyn Persistable) -> MetadataResult<()>;

    /// Delete a document.
    ///
    /// When the document carries a revision it must match the stored one.
    /// Fails with [`MetadataError::NotFound`] if there is no such document.
    async fn delete_doc(&self, doc: &dyn Persistable) -> MetadataResult<()>;

    /// Fetch a document by type and id.
    async fn get_doc(&self, doc_type: &str, id: &str) -> MetadataResult<Option<StoredDoc>>;

    /// List every document of a type, ordered by id.
    async fn list_docs(&self, doc_type: &str) -> MetadataResult<Vec<StoredDoc>>;

    /// Check store connectivity and health.
    async fn health_check(&self) -> MetadataResult<()> {
        Ok(())
    }
}

/// Generate a fresh document id.
pub fn new_doc_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Revision assigned to a newly created document (`1-<32 hex>`).
pub fn first_rev() -> String {
    format!("1-{}", Uuid::new_v4().simple())
}

/// Id to use for a new document, plus its body with identity fields filled in.
pub(crate) fn prepare_create(
    doc: &mut dyn Persistable,
) -> MetadataResult<(String, String, serde_json::Value)> {
    let id = match doc.id() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => new_doc_id(),
    };
    doc.set_id(id.clone());
    let rev = first_rev();

    let mut body = doc.to_document()?;
    let object = body.as_object_mut().ok_or_else(|| {
        MetadataError::Serialization(format!("{} document is not a JSON object", doc.doc_type()))
    })?;
    object.insert("id".to_string(), serde_json::Value::String(id.clone()));
    object.insert("rev".to_string(), serde_json::Value::String(rev.clone()));
    Ok((id, rev, body))
}

pub(crate) fn require_id(doc: &dyn Persistable) -> MetadataResult<&str> {
    doc.id()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| MetadataError::NotFound(format!("{} document without id", doc.doc_type())))
}

/// SQLite-based document store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) a SQLite store at `path`.
    pub async fn new(path: impl AsRef<Path>, busy_timeout_secs: u64) -> MetadataResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(busy_timeout_secs));

        // A single connection serializes writers and avoids "database is locked".
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::debug!(path = %path.display(), "SQLite document store opened");
        Ok(store)
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> MetadataResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // The database lives as long as its only connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                doc_type TEXT NOT NULL,
                id TEXT NOT NULL,
                rev TEXT NOT NULL,
                body TEXT NOT NULL,
                PRIMARY KEY (doc_type, id)
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_doc(
        doc_type: &str,
        id: String,
        rev: String,
        body: String,
    ) -> MetadataResult<StoredDoc> {
        Ok(StoredDoc {
            doc_type: doc_type.to_string(),
            id,
            rev,
            body: serde_json::from_str(&body)?,
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    #[tracing::instrument(skip(self, doc), fields(backend = "sqlite", doc_type = doc.doc_type()))]
    async fn create_doc(&self, doc: &mut dyn Persistable) -> MetadataResult<()> {
        let (id, rev, body) = prepare_create(doc)?;

        let result =
            sqlx::query("INSERT INTO documents (doc_type, id, rev, body) VALUES (?, ?, ?, ?)")
                .bind(doc.doc_type())
                .bind(&id)
                .bind(&rev)
                .bind(body.to_string())
                .execute(&self.pool)
                .await;

        match result {
            Ok(_) => {
                doc.set_rev(rev);
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                MetadataError::Conflict(format!("{} {id} already exists", doc.doc_type())),
            ),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self, doc), fields(backend = "sqlite", doc_type = doc.doc_type()))]
    async fn delete_doc(&self, doc: &dyn Persistable) -> MetadataResult<()> {
        let id = require_id(doc)?;

        let stored_rev: Option<String> =
            sqlx::query_scalar("SELECT rev FROM documents WHERE doc_type = ? AND id = ?")
                .bind(doc.doc_type())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let stored_rev = stored_rev
            .ok_or_else(|| MetadataError::NotFound(format!("{} {id}", doc.doc_type())))?;
        if let Some(rev) = doc.rev()
            && rev != stored_rev
        {
            return Err(MetadataError::Conflict(format!(
                "{} {id} is at revision {stored_rev}, not {rev}",
                doc.doc_type()
            )));
        }

        let deleted =
            sqlx::query("DELETE FROM documents WHERE doc_type = ? AND id = ? AND rev = ?")
                .bind(doc.doc_type())
                .bind(id)
                .bind(&stored_rev)
                .execute(&self.pool)
                .await?
                .rows_affected();

        if deleted == 0 {
            return Err(MetadataError::Conflict(format!(
                "{} {id} changed during delete",
                doc.doc_type()
            )));
        }
        Ok(())
    }

    async fn get_doc(&self, doc_type: &str, id: &str) -> MetadataResult<Option<StoredDoc>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT rev, body FROM documents WHERE doc_type = ? AND id = ?")
                .bind(doc_type)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(rev, body)| Self::row_to_doc(doc_type, id.to_string(), rev, body))
            .transpose()
    }

    async fn list_docs(&self, doc_type: &str) -> MetadataResult<Vec<StoredDoc>> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT id, rev, body FROM documents WHERE doc_type = ? ORDER BY id")
                .bind(doc_type)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(id, rev, body)| Self::row_to_doc(doc_type, id, rev, body))
            .collect()
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| MetadataError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
