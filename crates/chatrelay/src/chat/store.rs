//! In-memory store for session-backed conversations.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::conversation::Conversation;

/// Idle time after which a session is forgotten.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

struct SessionEntry {
    conversation: Arc<Mutex<Conversation>>,
    last_used: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            conversation: Arc::default(),
            last_used: Instant::now(),
        }
    }

    /// Idle for longer than `ttl` and not held by any request.
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        Arc::strong_count(&self.conversation) == 1 && now.duration_since(self.last_used) >= ttl
    }
}

/// Session-scoped conversations, keyed by session id.
///
/// Each session gets its own lock, so concurrent requests for one session
/// are serialized while different sessions proceed independently. Sessions
/// idle for longer than the TTL are evicted on the next store access.
#[derive(Clone)]
pub struct ConversationStore {
    sessions: Arc<DashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Mint a new session id.
    pub fn new_session_id() -> String {
        ulid::Ulid::new().to_string()
    }

    /// Get the conversation for `session_id`, creating an empty one if needed.
    /// Marks the session as used.
    pub fn session(&self, session_id: &str) -> Arc<Mutex<Conversation>> {
        self.evict_idle();
        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionEntry::new);
        entry.last_used = Instant::now();
        entry.conversation.clone()
    }

    /// Copy of the conversation for `session_id`, if the session exists.
    pub async fn snapshot(&self, session_id: &str) -> Option<Conversation> {
        self.evict_idle();
        let handle = self
            .sessions
            .get(session_id)
            .map(|e| e.conversation.clone())?;
        let conversation = handle.lock().await;
        Some(conversation.clone())
    }

    /// Forget a session. Returns whether it existed.
    pub fn remove(&self, session_id: &str) -> bool {
        self.evict_idle();
        self.sessions.remove(session_id).is_some()
    }

    /// Drop every session idle for longer than the TTL. Returns how many.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| !entry.is_expired(now, self.ttl));
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            debug!(evicted, "Evicted idle sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
