use async_trait::async_trait;
use concierge_core::RequestContext;

use crate::storage::Guest;

/// Pluggable persistence backend for guest visits.
/// Implementations: `SQLite` (embedded, default), memory-backed (tests).
///
/// Every operation takes the caller's [`RequestContext`] so storage activity
/// can be logged under the trace of the request that caused it.
#[async_trait]
pub trait GuestStore: Send + Sync {
    /// One-time initialization (create tables, run idempotent migrations).
    async fn initialize(&self) -> anyhow::Result<()>;

    /// Records a visit for `name`: supersedes any live record with the same
    /// name, then inserts a fresh one. Returns the newly inserted record.
    ///
    /// The supersede-then-insert pair runs in a single transaction, so a
    /// visit is either fully recorded or not recorded at all. Visits for the
    /// same name arriving on different connections are not serialized
    /// against each other.
    async fn record_visit(&self, ctx: &RequestContext, name: &str) -> anyhow::Result<Guest>;

    /// Loads the live (non-superseded) record for `name`, if any.
    async fn find_live(&self, ctx: &RequestContext, name: &str) -> anyhow::Result<Option<Guest>>;

    /// Counts live records for `name`. At most 1 under sequential use.
    async fn live_count(&self, ctx: &RequestContext, name: &str) -> anyhow::Result<i64>;

    /// Close the backend; no queries may follow.
    async fn close(&self) -> anyhow::Result<()>;
}
