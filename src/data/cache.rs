//! In-memory session store
//!
//! Volatile: sessions are lost on restart.
//! Uses Moka for concurrent caching with per-entry TTL.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use moka::ops::compute::Op;

use super::store::SessionStore;
use crate::auth::session::{SessionId, SessionRecord};
use crate::error::AppError;

/// Session store backed by a Moka cache
///
/// The cache's `time_to_live` restarts on every insert, which matches the
/// "expires after last write" contract of [`SessionStore`].
pub struct MemorySessionStore {
    /// Session ID -> record
    sessions: Cache<SessionId, SessionRecord>,
}

impl MemorySessionStore {
    /// Create new in-memory store
    ///
    /// # Arguments
    /// * `ttl` - Lifetime of a record after its last write
    pub fn new(ttl: Duration) -> Self {
        let sessions = Cache::builder().time_to_live(ttl).build();

        Self { sessions }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, AppError> {
        Ok(self.sessions.get(id).await)
    }

    async fn put(&self, id: &SessionId, record: &SessionRecord) -> Result<(), AppError> {
        match record {
            SessionRecord::Anonymous => self.sessions.invalidate(id).await,
            _ => self.sessions.insert(id.clone(), record.clone()).await,
        }
        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), AppError> {
        self.sessions.invalidate(id).await;
        Ok(())
    }

    async fn take_state(&self, id: &SessionId) -> Result<Option<String>, AppError> {
        let mut taken = None;

        // `and_compute_with` serializes concurrent computations on the same key.
        self.sessions
            .entry_by_ref(id)
            .and_compute_with(|entry| {
                let op = match entry.map(|entry| entry.into_value()) {
                    Some(SessionRecord::AwaitingCallback { state }) => {
                        taken = Some(state);
                        Op::Remove
                    }
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        Ok(taken)
    }

    /// Moka evicts expired entries on its own; this only flushes pending
    /// maintenance and always reports 0.
    async fn purge_expired(&self) -> Result<u64, AppError> {
        self.sessions.run_pending_tasks().await;
        Ok(0)
    }
}
