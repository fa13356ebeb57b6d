use crate::session::Session;
use async_trait::async_trait;
use biblebuddy_core::{BuddyError, BuddyResult, Message};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self) -> BuddyResult<SessionHandle>;
    async fn get(&self, id: Uuid) -> BuddyResult<Option<SessionHandle>>;
    /// Ends a session and cancels any turn still waiting on it.
    /// Returns `false` if the id was unknown.
    async fn end(&self, id: Uuid) -> BuddyResult<bool>;
    async fn list(&self) -> BuddyResult<Vec<Uuid>>;
    async fn count(&self) -> BuddyResult<usize>;
    /// Ends every session idle for at least `max_idle` with no turn running.
    async fn reap_idle(&self, max_idle: Duration) -> BuddyResult<usize>;
}

/// Held for the duration of one turn. Dropping it lets the next turn in.
pub struct TurnGuard {
    _permit: OwnedMutexGuard<()>,
}

struct Slot {
    id: Uuid,
    state: Mutex<Session>,
    turn: Arc<Mutex<()>>,
    cancel: CancellationToken,
    started: Instant,
    last_active_ms: AtomicU64,
}

/// Shared handle to a live session.
///
/// State access is short-lived through [`SessionHandle::lock`]; the long
/// wait on a remote run only holds the [`TurnGuard`], so the transcript
/// stays readable while a turn is outstanding.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Slot>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Slot {
                id: session.id,
                state: Mutex::new(session),
                turn: Arc::new(Mutex::new(())),
                cancel: CancellationToken::new(),
                started: Instant::now(),
                last_active_ms: AtomicU64::new(0),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.touch();
        self.inner.state.lock().await
    }

    /// Snapshot of the transcript.
    pub async fn history(&self) -> Vec<Message> {
        self.lock().await.history().to_vec()
    }

    /// Claims the session for one turn.
    ///
    /// Fails with [`BuddyError::TurnInProgress`] instead of queueing when
    /// another turn holds the session, and with [`BuddyError::Cancelled`]
    /// once the session has ended.
    pub fn try_begin_turn(&self) -> BuddyResult<TurnGuard> {
        if self.is_ended() {
            return Err(BuddyError::Cancelled);
        }
        let permit = self
            .inner
            .turn
            .clone()
            .try_lock_owned()
            .map_err(|_| BuddyError::TurnInProgress)?;
        self.touch();
        Ok(TurnGuard { _permit: permit })
    }

    pub fn is_busy(&self) -> bool {
        self.inner.turn.try_lock().is_err()
    }

    /// Token cancelled when the session ends.
    pub fn cancellation(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    pub fn is_ended(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    pub fn idle_for(&self) -> Duration {
        let last = self.inner.started
            + Duration::from_millis(self.inner.last_active_ms.load(Ordering::Relaxed));
        Instant::now().saturating_duration_since(last)
    }

    fn touch(&self) {
        let elapsed = Instant::now().saturating_duration_since(self.inner.started);
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.inner.last_active_ms.store(ms, Ordering::Relaxed);
    }

    fn end(&self) {
        self.inner.cancel.cancel();
    }
}

/// Process-local session store. Sessions do not survive a restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self) -> BuddyResult<SessionHandle> {
        let handle = SessionHandle::new(Session::new());
        let id = handle.id();
        self.sessions.write().await.insert(id, handle.clone());
        info!(session_id = %id, "Session started");
        Ok(handle)
    }

    async fn get(&self, id: Uuid) -> BuddyResult<Option<SessionHandle>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn end(&self, id: Uuid) -> BuddyResult<bool> {
        match self.sessions.write().await.remove(&id) {
            Some(handle) => {
                handle.end();
                info!(session_id = %id, "Session ended");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self) -> BuddyResult<Vec<Uuid>> {
        Ok(self.sessions.read().await.keys().copied().collect())
    }

    async fn count(&self) -> BuddyResult<usize> {
        Ok(self.sessions.read().await.len())
    }

    async fn reap_idle(&self, max_idle: Duration) -> BuddyResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| {
            let keep = handle.is_busy() || handle.idle_for() < max_idle;
            if !keep {
                handle.end();
            }
            keep
        });
        let reaped = before - sessions.len();
        if reaped > 0 {
            info!(reaped, remaining = sessions.len(), "Idle sessions reaped");
        }
        Ok(reaped)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_turn_is_rejected_while_first_is_held() {
        let handle = SessionHandle::new(Session::new());
        let guard = handle.try_begin_turn().unwrap();
        assert!(handle.is_busy());
        assert!(matches!(
            handle.try_begin_turn(),
            Err(BuddyError::TurnInProgress)
        ));

        drop(guard);
        assert!(!handle.is_busy());
        assert!(handle.try_begin_turn().is_ok());
    }

    #[tokio::test]
    async fn test_history_readable_during_turn() {
        let handle = SessionHandle::new(Session::new());
        let _guard = handle.try_begin_turn().unwrap();
        handle.lock().await.append(Message::user("hi")).unwrap();
        assert_eq!(handle.history().await.len(), 1);
    }

    #[tokio::test]
    async fn test_end_cancels_token() {
        let store = InMemorySessionStore::new();
        let handle = store.create().await.unwrap();
        let token = handle.cancellation();

        assert!(store.end(handle.id()).await.unwrap());
        assert!(token.is_cancelled());
        assert!(matches!(handle.try_begin_turn(), Err(BuddyError::Cancelled)));
        assert!(!store.end(handle.id()).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_idle_skips_busy_sessions() {
        let store = InMemorySessionStore::new();
        let idle = store.create().await.unwrap();
        let busy = store.create().await.unwrap();
        let _guard = busy.try_begin_turn().unwrap();

        tokio::time::advance(Duration::from_secs(120)).await;

        let reaped = store.reap_idle(Duration::from_secs(60)).await.unwrap();
        assert_eq!(reaped, 1);
        assert!(idle.is_ended());
        assert!(store.get(busy.id()).await.unwrap().is_some());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_count_tracks_live_sessions() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.count().await.unwrap(), 0);
        let first = store.create().await.unwrap();
        store.create().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        store.end(first.id()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
