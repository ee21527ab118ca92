//! Session store abstraction

use async_trait::async_trait;

use crate::auth::session::{SessionId, SessionRecord};
use crate::error::AppError;

/// Persisted mapping from session id to [`SessionRecord`], with expiry
///
/// Records expire a fixed time after their last `put`. Storing
/// [`SessionRecord::Anonymous`] removes the record.
///
/// All failures are reported as `AppError::SessionPersistence`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a live record; `None` when absent or expired
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, AppError>;

    /// Replace the record and restart its time-to-live
    ///
    /// Returns only once the write is acknowledged by the backend.
    async fn put(&self, id: &SessionId, record: &SessionRecord) -> Result<(), AppError>;

    /// Remove the record
    async fn destroy(&self, id: &SessionId) -> Result<(), AppError>;

    /// Atomically consume a pending CSRF state
    ///
    /// If the record is `AwaitingCallback { state }` it becomes `Anonymous`
    /// and `state` is returned. Any other record is left untouched and
    /// `None` is returned. Two concurrent callers can never both receive
    /// the same state.
    async fn take_state(&self, id: &SessionId) -> Result<Option<String>, AppError>;

    /// Drop expired records, returning how many were removed
    async fn purge_expired(&self) -> Result<u64, AppError>;
}
