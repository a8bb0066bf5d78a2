//! Per-session conversation memory.
//!
//! Agents that share a session token see each other's recent exchanges. The
//! memory is process-local and bounded: at most `max_sessions` tokens are
//! tracked (least recently used evicted first) and each keeps only its last
//! `turns` exchanges.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::types::Turn;

const DEFAULT_MAX_SESSIONS: usize = 256;

pub struct SessionMemory {
    sessions: Mutex<LruCache<String, VecDeque<Turn>>>,
    turns: usize,
}

impl SessionMemory {
    /// Memory keeping the last `turns` exchanges per session.
    pub fn new(turns: usize) -> Self {
        Self::with_capacity(turns, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_capacity(turns: usize, max_sessions: usize) -> Self {
        let cap = NonZeroUsize::new(max_sessions).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Mutex::new(LruCache::new(cap)),
            turns,
        }
    }

    /// Append an exchange to a session, dropping the oldest beyond the limit.
    pub fn record(&self, session_id: &str, prompt: &str, response: &str) {
        if self.turns == 0 {
            return;
        }
        let mut sessions = self.sessions.lock();
        if !sessions.contains(session_id) {
            sessions.put(session_id.to_string(), VecDeque::with_capacity(self.turns));
        }
        if let Some(history) = sessions.get_mut(session_id) {
            history.push_back(Turn::new(prompt, response));
            while history.len() > self.turns {
                history.pop_front();
            }
        }
    }

    /// Recent exchanges of a session, oldest first.
    pub fn history(&self, session_id: &str) -> Vec<Turn> {
        self.sessions
            .lock()
            .get(session_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop everything remembered for a session.
    pub fn forget(&self, session_id: &str) {
        if self.sessions.lock().pop(session_id).is_some() {
            tracing::debug!(session_id, "session memory released");
        }
    }

    /// Number of sessions currently tracked.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SessionMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMemory")
            .field("sessions", &self.len())
            .field("turns", &self.turns)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded() {
        let memory = SessionMemory::new(2);
        memory.record("s1", "p1", "r1");
        memory.record("s1", "p2", "r2");
        memory.record("s1", "p3", "r3");

        let history = memory.history("s1");
        assert_eq!(history, vec![Turn::new("p2", "r2"), Turn::new("p3", "r3")]);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let memory = SessionMemory::new(3);
        memory.record("a", "pa", "ra");
        memory.record("b", "pb", "rb");

        assert_eq!(memory.history("a"), vec![Turn::new("pa", "ra")]);
        assert_eq!(memory.history("b"), vec![Turn::new("pb", "rb")]);
        assert!(memory.history("c").is_empty());
    }

    #[test]
    fn test_forget_releases_session() {
        let memory = SessionMemory::new(3);
        memory.record("run", "p", "r");
        assert_eq!(memory.len(), 1);

        memory.forget("run");
        assert!(memory.is_empty());
        assert!(memory.history("run").is_empty());
    }

    #[test]
    fn test_least_recent_session_evicted() {
        let memory = SessionMemory::with_capacity(1, 2);
        memory.record("old", "p", "r");
        memory.record("mid", "p", "r");
        memory.record("new", "p", "r");

        assert!(memory.history("old").is_empty());
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_zero_turns_records_nothing() {
        let memory = SessionMemory::new(0);
        memory.record("s", "p", "r");
        assert!(memory.is_empty());
    }
}
