//! Persisted guest record.

use serde::{Deserialize, Serialize};

/// A recorded guest visit.
///
/// Visits are superseded rather than removed: a new visit for the same
/// name stamps `deleted_at` on the previous record and inserts a fresh
/// row. A record is *live* while `deleted_at` is unset, and sequential
/// visits leave at most one live record per name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Guest {
    /// Row identifier, assigned by the store.
    pub id: i64,
    /// Visitor name exactly as greeted.
    pub name: String,
    /// Milliseconds since the Unix epoch when the record was created.
    pub created_at: i64,
    /// Milliseconds since the Unix epoch of the last write to the record.
    pub updated_at: i64,
    /// Set when a later visit supersedes this record.
    pub deleted_at: Option<i64>,
}

impl Guest {
    /// Returns `true` while the record has not been superseded.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}
