//! Sqlite-backed guest store.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;

use concierge_core::RequestContext;

use crate::storage::Guest;
use crate::traits::GuestStore;

const CREATE_GUESTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS guests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    deleted_at INTEGER
)";

const CREATE_LIVE_NAME_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_guests_live_name
    ON guests (name) WHERE deleted_at IS NULL";

/// Embedded relational store for guest visits.
///
/// One pool per process, shared by reference across request handlers.
/// Statement-level locking is delegated to sqlite itself.
pub struct SqliteGuestStore {
    pool: SqlitePool,
}

impl SqliteGuestStore {
    /// Opens the database file at `path`, creating it if missing.
    ///
    /// The schema is not touched here -- call
    /// [`initialize`](GuestStore::initialize) before the first query.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or opened.
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Opens a private in-memory database.
    ///
    /// The pool is pinned to a single connection: each sqlite in-memory
    /// connection is its own database, so a second connection would see
    /// empty tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl GuestStore for SqliteGuestStore {
    async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(CREATE_GUESTS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_LIVE_NAME_INDEX)
            .execute(&self.pool)
            .await?;
        debug!("guest schema ready");
        Ok(())
    }

    async fn record_visit(&self, ctx: &RequestContext, name: &str) -> anyhow::Result<Guest> {
        let now = Utc::now().timestamp_millis();

        let mut tx = self.pool.begin().await?;
        let superseded = sqlx::query(
            "UPDATE guests SET deleted_at = ?1, updated_at = ?1
             WHERE name = ?2 AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(name)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let id = sqlx::query("INSERT INTO guests (name, created_at, updated_at) VALUES (?1, ?2, ?2)")
            .bind(name)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
        tx.commit().await?;

        debug!(
            trace_id = %ctx.trace_id,
            span_id = %ctx.span_id,
            guest_id = id,
            superseded,
            "recorded guest visit"
        );

        Ok(Guest {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    async fn find_live(&self, ctx: &RequestContext, name: &str) -> anyhow::Result<Option<Guest>> {
        let guest = sqlx::query_as::<_, Guest>(
            "SELECT id, name, created_at, updated_at, deleted_at FROM guests
             WHERE name = ?1 AND deleted_at IS NULL
             ORDER BY id DESC LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        debug!(
            trace_id = %ctx.trace_id,
            span_id = %ctx.span_id,
            found = guest.is_some(),
            "looked up live guest"
        );
        Ok(guest)
    }

    async fn live_count(&self, ctx: &RequestContext, name: &str) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM guests WHERE name = ?1 AND deleted_at IS NULL",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        debug!(
            trace_id = %ctx.trace_id,
            span_id = %ctx.span_id,
            count,
            "counted live guests"
        );
        Ok(count)
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.pool.close().await;
        debug!("guest store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fresh_store() -> SqliteGuestStore {
        let store = SqliteGuestStore::in_memory().await.unwrap();
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let store = SqliteGuestStore::in_memory().await.unwrap();
        store.initialize().await.unwrap();
        store.initialize().await.unwrap();
    }

    #[tokio::test]
    async fn record_visit_creates_live_record() {
        let store = fresh_store().await;
        let ctx = RequestContext::new();

        let guest = store.record_visit(&ctx, "Ada").await.unwrap();
        assert_eq!(guest.name, "Ada");
        assert!(guest.is_live());
        assert_eq!(guest.created_at, guest.updated_at);

        let found = store.find_live(&ctx, "Ada").await.unwrap().unwrap();
        assert_eq!(found, guest);
    }

    #[tokio::test]
    async fn repeat_visit_supersedes_previous_record() {
        let store = fresh_store().await;
        let ctx = RequestContext::new();

        let first = store.record_visit(&ctx, "Ada").await.unwrap();
        let second = store.record_visit(&ctx, "Ada").await.unwrap();
        assert!(second.id > first.id);

        assert_eq!(store.live_count(&ctx, "Ada").await.unwrap(), 1);
        let live = store.find_live(&ctx, "Ada").await.unwrap().unwrap();
        assert_eq!(live.id, second.id);
    }

    #[tokio::test]
    async fn distinct_names_keep_independent_records() {
        let store = fresh_store().await;
        let ctx = RequestContext::new();

        store.record_visit(&ctx, "Ada").await.unwrap();
        store.record_visit(&ctx, "Grace").await.unwrap();

        assert_eq!(store.live_count(&ctx, "Ada").await.unwrap(), 1);
        assert_eq!(store.live_count(&ctx, "Grace").await.unwrap(), 1);
        assert_eq!(store.live_count(&ctx, "Linus").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn find_live_skips_superseded_records() {
        let store = fresh_store().await;
        let ctx = RequestContext::new();

        store.record_visit(&ctx, "Ada").await.unwrap();
        store.record_visit(&ctx, "Ada").await.unwrap();

        let live = store.find_live(&ctx, "Ada").await.unwrap().unwrap();
        assert!(live.is_live());
        assert!(store.find_live(&ctx, "Nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn visits_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guests.db");
        let ctx = RequestContext::new();

        {
            let store = SqliteGuestStore::open(&path).await.unwrap();
            store.initialize().await.unwrap();
            store.record_visit(&ctx, "Ada").await.unwrap();
            store.close().await.unwrap();
        }

        let store = SqliteGuestStore::open(&path).await.unwrap();
        store.initialize().await.unwrap();
        let live = store.find_live(&ctx, "Ada").await.unwrap().unwrap();
        assert_eq!(live.name, "Ada");
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_refuses_further_queries() {
        let store = fresh_store().await;
        let ctx = RequestContext::new();

        store.close().await.unwrap();
        assert!(store.record_visit(&ctx, "Ada").await.is_err());
    }
}
