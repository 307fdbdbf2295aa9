//! Session identity, status snapshots and the session store

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::ScanError;
use crate::models::{ScanConfig, ScanResult};

/// Identifier of one scan session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Seed derived from the id when the config does not fix one
    pub fn seed(&self) -> u64 {
        let bits = self.0.as_u128();
        (bits as u64) ^ ((bits >> 64) as u64)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(SessionId)
            .map_err(|_| ScanError::NotFound(s.to_string()))
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Pending => "pending",
            SessionState::InProgress => "in_progress",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
            SessionState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a session, published atomically on every change
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub state: SessionState,
    /// 0-100, never decreasing
    pub progress: u8,
    /// Description of the current phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub result: Option<Arc<ScanResult>>,
    pub updated_at: DateTime<Utc>,
}

impl SessionStatus {
    fn pending(session_id: SessionId) -> Self {
        Self {
            session_id,
            state: SessionState::Pending,
            progress: 0,
            phase_message: Some("Queued".to_string()),
            error: None,
            result: None,
            updated_at: Utc::now(),
        }
    }
}

/// Store-side state of one session.
///
/// The pipeline task is the only writer of the status channel; readers take
/// cheap snapshots from it.
pub struct SessionEntry {
    pub id: SessionId,
    pub config: Arc<ScanConfig>,
    created: Instant,
    finished: OnceLock<Instant>,
    cancel: AtomicBool,
    tx: watch::Sender<SessionStatus>,
}

impl SessionEntry {
    pub fn new(id: SessionId, config: ScanConfig) -> Self {
        let (tx, _rx) = watch::channel(SessionStatus::pending(id));
        Self {
            id,
            config: Arc::new(config),
            created: Instant::now(),
            finished: OnceLock::new(),
            cancel: AtomicBool::new(false),
            tx,
        }
    }

    pub fn snapshot(&self) -> SessionStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.tx.borrow().state
    }

    /// Raise the cancellation flag; false if the session already finished
    pub fn request_cancel(&self) -> bool {
        if self.state().is_terminal() {
            return false;
        }
        self.cancel.store(true, Ordering::SeqCst);
        true
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Enter a phase. Progress only moves forward.
    pub fn enter_phase(&self, progress: u8, message: &str) {
        self.tx.send_modify(|status| {
            status.state = SessionState::InProgress;
            status.progress = status.progress.max(progress.min(99));
            status.phase_message = Some(message.to_string());
            status.updated_at = Utc::now();
        });
    }

    pub fn complete(&self, result: ScanResult) {
        self.finish(SessionState::Completed, Some(Arc::new(result)), None, "Scan complete");
    }

    pub fn fail(&self, error: String) {
        self.finish(SessionState::Failed, None, Some(error), "Scan failed");
    }

    pub fn mark_cancelled(&self) {
        self.finish(SessionState::Cancelled, None, None, "Scan cancelled");
    }

    fn finish(
        &self,
        state: SessionState,
        result: Option<Arc<ScanResult>>,
        error: Option<String>,
        message: &str,
    ) {
        if self.state().is_terminal() {
            return;
        }
        self.tx.send_modify(|status| {
            status.state = state;
            if state == SessionState::Completed {
                status.progress = 100;
            }
            status.phase_message = Some(message.to_string());
            status.error = error;
            status.result = result;
            status.updated_at = Utc::now();
        });
        let _ = self.finished.set(Instant::now());
    }

    /// Time since the session reached a terminal state
    fn finished_for(&self, now: Instant) -> Option<Duration> {
        self.finished.get().map(|at| now.saturating_duration_since(*at))
    }
}

/// Bounds on how long finished sessions are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub ttl: Duration,
    pub max_sessions: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_sessions: 50,
        }
    }
}

/// Concurrent map of sessions keyed by id
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<SessionEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: Arc<SessionEntry>) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(entry.id, entry);
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<SessionEntry>> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All sessions, oldest first
    pub fn entries(&self) -> Vec<Arc<SessionEntry>> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<Arc<SessionEntry>> = sessions.values().cloned().collect();
        entries.sort_by_key(|e| e.created);
        entries
    }

    /// Drop finished sessions past the TTL, then the oldest finished ones
    /// beyond `max_sessions`. Running sessions are never evicted.
    pub fn evict(&self, policy: RetentionPolicy) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();

        sessions.retain(|_, entry| entry.finished_for(now).is_none_or(|age| age < policy.ttl));

        let mut finished: Vec<(Instant, SessionId)> = sessions
            .values()
            .filter_map(|e| e.finished.get().map(|at| (*at, e.id)))
            .collect();
        if finished.len() > policy.max_sessions {
            finished.sort();
            let excess = finished.len() - policy.max_sessions;
            for (_, id) in finished.into_iter().take(excess) {
                sessions.remove(&id);
            }
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!("Evicted {} finished sessions", evicted);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Arc<SessionEntry> {
        Arc::new(SessionEntry::new(
            SessionId::new(),
            ScanConfig::new("https://example.com"),
        ))
    }

    #[test]
    fn test_session_id_parse() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-an-id".parse::<SessionId>().is_err());
    }

    #[test]
    fn test_new_entry_is_pending() {
        let entry = entry();
        let status = entry.snapshot();
        assert_eq!(status.state, SessionState::Pending);
        assert_eq!(status.progress, 0);
        assert!(status.result.is_none());
    }

    #[test]
    fn test_terminal_state_is_final() {
        let entry = entry();
        entry.mark_cancelled();
        entry.fail("late failure".to_string());
        let status = entry.snapshot();
        assert_eq!(status.state, SessionState::Cancelled);
        assert!(status.error.is_none());
    }

    #[test]
    fn test_progress_never_decreases() {
        let entry = entry();
        entry.enter_phase(40, "Testing");
        entry.enter_phase(10, "Late update");
        assert_eq!(entry.snapshot().progress, 40);
        assert_eq!(entry.snapshot().phase_message.as_deref(), Some("Late update"));
    }

    #[test]
    fn test_progress_capped_until_complete() {
        let entry = entry();
        entry.enter_phase(120, "Compiling");
        assert_eq!(entry.snapshot().progress, 99);
    }

    #[test]
    fn test_cancel_rejected_when_terminal() {
        let entry = entry();
        assert!(entry.request_cancel());
        entry.mark_cancelled();
        assert!(!entry.request_cancel());
        assert_eq!(entry.state(), SessionState::Cancelled);
    }

    #[test]
    fn test_failed_carries_error() {
        let entry = entry();
        entry.fail("Target unreachable: example.com".to_string());
        let status = entry.snapshot();
        assert_eq!(status.state, SessionState::Failed);
        assert!(status.error.unwrap().contains("unreachable"));
    }

    #[test]
    fn test_subscriber_sees_updates() {
        let entry = entry();
        let rx = entry.subscribe();
        entry.enter_phase(5, "Recon");
        assert_eq!(rx.borrow().state, SessionState::InProgress);
    }

    #[test]
    fn test_evict_by_ttl_keeps_running() {
        let store = SessionStore::new();
        let running = entry();
        let done = entry();
        done.fail("boom".to_string());
        store.insert(running.clone());
        store.insert(done.clone());

        let evicted = store.evict(RetentionPolicy {
            ttl: Duration::ZERO,
            max_sessions: 10,
        });

        assert_eq!(evicted, 1);
        assert!(store.get(&running.id).is_some());
        assert!(store.get(&done.id).is_none());
    }

    #[test]
    fn test_evict_by_count_removes_oldest() {
        let store = SessionStore::new();
        let first = entry();
        first.mark_cancelled();
        std::thread::sleep(Duration::from_millis(2));
        let second = entry();
        second.mark_cancelled();
        store.insert(first.clone());
        store.insert(second.clone());

        store.evict(RetentionPolicy {
            ttl: Duration::from_secs(3600),
            max_sessions: 1,
        });

        assert!(store.get(&first.id).is_none());
        assert!(store.get(&second.id).is_some());
        assert_eq!(store.len(), 1);
    }
}
