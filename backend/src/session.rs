use std::time::{Duration, Instant};

use dashmap::{mapref::one::RefMut, DashMap};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueState {
    AwaitingCity,
    AwaitingDistance,
    AwaitingSurface,
    Terminal,
}

/// Criteria collected so far for one user.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    pub state: DialogueState,
    pub city: Option<String>,
    pub distance_km: Option<f64>,
    touched_at: Instant,
}

impl ConversationSession {
    fn new() -> Self {
        Self {
            state: DialogueState::AwaitingCity,
            city: None,
            distance_km: None,
            touched_at: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.touched_at = Instant::now();
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.touched_at.elapsed() >= ttl
    }
}

pub enum Lookup<'a> {
    Active(RefMut<'a, i64, ConversationSession>),
    Expired,
    Missing,
}

/// Per-user sessions. Each entry is only reachable through its shard lock,
/// so two events for the same user never mutate a session concurrently.
pub struct SessionStore {
    sessions: DashMap<i64, ConversationSession>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a fresh session, discarding any previous one for `user_id`.
    pub fn begin(&self, user_id: i64) {
        self.purge_expired();
        if self
            .sessions
            .insert(user_id, ConversationSession::new())
            .is_some()
        {
            tracing::debug!("user {user_id} restarted an unfinished search");
        }
    }

    /// Exclusive access to a live session. Expired entries are dropped on
    /// the way.
    pub fn lookup(&self, user_id: i64) -> Lookup<'_> {
        let Some(session) = self.sessions.get_mut(&user_id) else {
            return Lookup::Missing;
        };
        if !session.is_expired(self.ttl) {
            return Lookup::Active(session);
        }
        drop(session);
        let ttl = self.ttl;
        if self
            .sessions
            .remove_if(&user_id, |_, session| session.is_expired(ttl))
            .is_some()
        {
            tracing::debug!("session of user {user_id} expired");
        }
        Lookup::Expired
    }

    pub fn remove(&self, user_id: i64) -> Option<ConversationSession> {
        self.sessions.remove(&user_id).map(|(_, session)| session)
    }

    /// Drop the session only if it is still `Terminal`; a session begun by
    /// a concurrent `/find` in the meantime survives.
    pub fn remove_finished(&self, user_id: i64) -> Option<ConversationSession> {
        self.sessions
            .remove_if(&user_id, |_, session| session.state == DialogueState::Terminal)
            .map(|(_, session)| session)
    }

    pub fn snapshot(&self, user_id: i64) -> Option<ConversationSession> {
        self.sessions.get(&user_id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn purge_expired(&self) {
        let ttl = self.ttl;
        self.sessions.retain(|_, session| !session.is_expired(ttl));
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}
