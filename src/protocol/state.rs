//! # Shared Session State
//!
//! Fields that outlive a single exchange: the incremental sync cursor and the
//! transient upload/relay endpoint handed out by config pushes.
//!
//! One `SessionState` exists per session. It is created empty, shared with every
//! module through the session context, and cleared on teardown. All writes go
//! through one async mutex.
//!
//! ## Cursor merge
//! Handlers complete out of order, so the cursor is not a plain overwrite. Each pull
//! is issued a generation under the lock (`begin_pull`). A response may only commit
//! if its generation is newer than the last committed one, so a slow, older pull
//! can never roll back a cursor that a newer pull already advanced. An absent
//! cursor never commits.

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Upload/relay endpoint handed out by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighwayEndpoint {
    pub host: String,
    pub ticket: Bytes,
}

/// Proof that a pull was started, carrying the cursor it was started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullTicket {
    generation: u64,
    cursor: Option<Bytes>,
}

impl PullTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cursor(&self) -> Option<&Bytes> {
        self.cursor.as_ref()
    }
}

#[derive(Debug, Default)]
struct Inner {
    sync_cursor: Option<Bytes>,
    /// generation of the pull that produced `sync_cursor`
    committed_generation: u64,
    /// last generation handed out by `begin_pull`
    issued_generation: u64,
    highway: Option<HighwayEndpoint>,
}

#[derive(Debug, Default)]
pub struct SessionState {
    inner: Mutex<Inner>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the transient endpoint. Last writer wins.
    pub async fn set_highway(&self, host: impl Into<String>, ticket: Bytes) {
        let endpoint = HighwayEndpoint {
            host: host.into(),
            ticket,
        };
        info!(host = %endpoint.host, "Highway server has changed");
        self.inner.lock().await.highway = Some(endpoint);
    }

    pub async fn highway(&self) -> Option<HighwayEndpoint> {
        self.inner.lock().await.highway.clone()
    }

    pub async fn sync_cursor(&self) -> Option<Bytes> {
        self.inner.lock().await.sync_cursor.clone()
    }

    /// Start a pull from the current cursor.
    pub async fn begin_pull(&self) -> PullTicket {
        let mut inner = self.inner.lock().await;
        inner.issued_generation += 1;
        PullTicket {
            generation: inner.issued_generation,
            cursor: inner.sync_cursor.clone(),
        }
    }

    /// Merge the cursor returned for `ticket`. Returns whether it was stored.
    pub async fn commit_pull(&self, ticket: &PullTicket, cursor: Option<Bytes>) -> bool {
        let Some(cursor) = cursor else {
            debug!(generation = ticket.generation, "Pull returned no cursor; keeping current");
            return false;
        };

        let mut inner = self.inner.lock().await;
        if ticket.generation <= inner.committed_generation {
            debug!(
                generation = ticket.generation,
                committed = inner.committed_generation,
                "Discarding cursor from stale pull"
            );
            return false;
        }

        inner.committed_generation = ticket.generation;
        inner.sync_cursor = Some(cursor);
        true
    }

    /// Reset everything. Called on session teardown.
    pub async fn clear(&self) {
        *self.inner.lock().await = Inner::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_starts_empty() {
        let state = SessionState::new();
        assert_eq!(state.sync_cursor().await, None);
        assert_eq!(state.highway().await, None);
    }

    #[tokio::test]
    async fn test_highway_last_writer_wins() {
        let state = SessionState::new();
        state.set_highway("1.1.1.1", Bytes::from_static(&[1])).await;
        state.set_highway("2.2.2.2", Bytes::from_static(&[2])).await;
        assert_eq!(
            state.highway().await,
            Some(HighwayEndpoint {
                host: "2.2.2.2".into(),
                ticket: Bytes::from_static(&[2]),
            })
        );
    }

    #[tokio::test]
    async fn test_absent_cursor_keeps_previous() {
        let state = SessionState::new();
        let first = state.begin_pull().await;
        assert!(state.commit_pull(&first, Some(Bytes::from_static(&[0xAA]))).await);

        let second = state.begin_pull().await;
        assert_eq!(second.cursor(), Some(&Bytes::from_static(&[0xAA])));
        assert!(!state.commit_pull(&second, None).await);
        assert_eq!(state.sync_cursor().await, Some(Bytes::from_static(&[0xAA])));
    }

    #[tokio::test]
    async fn test_stale_pull_cannot_regress_cursor() {
        let state = SessionState::new();
        let older = state.begin_pull().await;
        let newer = state.begin_pull().await;

        // newer completes first
        assert!(state.commit_pull(&newer, Some(Bytes::from_static(&[2]))).await);
        assert!(!state.commit_pull(&older, Some(Bytes::from_static(&[1]))).await);
        assert_eq!(state.sync_cursor().await, Some(Bytes::from_static(&[2])));
    }

    #[tokio::test]
    async fn test_in_order_completion_advances() {
        let state = SessionState::new();
        let older = state.begin_pull().await;
        let newer = state.begin_pull().await;

        assert!(state.commit_pull(&older, Some(Bytes::from_static(&[1]))).await);
        assert!(state.commit_pull(&newer, Some(Bytes::from_static(&[2]))).await);
        assert_eq!(state.sync_cursor().await, Some(Bytes::from_static(&[2])));
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let state = SessionState::new();
        state.set_highway("h", Bytes::new()).await;
        let ticket = state.begin_pull().await;
        state.commit_pull(&ticket, Some(Bytes::from_static(&[9]))).await;

        state.clear().await;
        assert_eq!(state.sync_cursor().await, None);
        assert_eq!(state.highway().await, None);
        assert_eq!(state.begin_pull().await.generation(), 1);
    }
}
