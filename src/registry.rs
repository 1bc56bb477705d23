/// Connection Registry
///
/// Tracks live transport sessions and their association to user identities.
/// Supports:
/// - Multiple concurrent sessions per user (multiple devices/tabs)
/// - Anonymous sessions (registered but not yet associated)
/// - Fire-and-forget push to every live session of a user
/// - Guaranteed cleanup on transport close, explicit or abrupt
///
/// Mutations for a given user key are serialized by the sharded maps; there
/// is no lock spanning all sessions, so a slow consumer cannot stall
/// unrelated users. Lock order is always session shard before user shard,
/// and no user-map guard is ever held across a session-map access.
use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::websocket::ServerEvent;

/// Opaque, transport-assigned identifier for one live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("session {session} is already bound to user {bound_to}")]
    Conflict { session: SessionId, bound_to: Uuid },

    #[error("unknown session {0}")]
    UnknownSession(SessionId),
}

/// Type alias for the per-session message sender
pub type SessionSender = mpsc::UnboundedSender<ServerEvent>;

struct SessionEntry {
    user_id: Option<Uuid>,
    sender: SessionSender,
    connected_at: DateTime<Utc>,
}

/// Registry of live sessions, injected wherever fan-out or relay happens
#[derive(Default)]
pub struct ConnectionRegistry {
    sessions: DashMap<SessionId, SessionEntry>,
    users: DashMap<Uuid, HashSet<SessionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a transport session. The session starts anonymous and receives
    /// no fan-out traffic until `associate` binds it to a user.
    pub fn register(&self, session_id: SessionId, sender: SessionSender) {
        self.sessions.insert(
            session_id,
            SessionEntry {
                user_id: None,
                sender,
                connected_at: Utc::now(),
            },
        );
        tracing::debug!(session = %session_id, "session registered");
    }

    /// Bind a previously-anonymous session to a user identity.
    ///
    /// Idempotent for the same `(session, user)` pair. Fails with
    /// `Conflict` if the session is already bound to a different user and
    /// there was no intervening disconnect; the existing binding survives.
    pub fn associate(&self, session_id: SessionId, user_id: Uuid) -> Result<(), RegistryError> {
        let mut entry = self
            .sessions
            .get_mut(&session_id)
            .ok_or(RegistryError::UnknownSession(session_id))?;

        match entry.user_id {
            Some(bound) if bound == user_id => Ok(()),
            Some(bound) => Err(RegistryError::Conflict {
                session: session_id,
                bound_to: bound,
            }),
            None => {
                entry.user_id = Some(user_id);
                // The user-set insert happens while the session guard is
                // held, so a racing disconnect observes both updates or
                // neither and can never leave a dangling id in the set.
                self.users.entry(user_id).or_default().insert(session_id);
                tracing::debug!(session = %session_id, user = %user_id, "session associated");
                Ok(())
            }
        }
    }

    /// Remove the session from its user's set. No-op if the session was
    /// never associated or is already gone.
    pub fn disassociate(&self, session_id: SessionId) {
        if let Some(mut entry) = self.sessions.get_mut(&session_id) {
            if let Some(user_id) = entry.user_id.take() {
                self.remove_from_user(user_id, session_id);
                tracing::debug!(session = %session_id, user = %user_id, "session disassociated");
            }
        }
    }

    /// Detach a transport session entirely. Invoked from the session actor's
    /// stop hook, which runs even under abrupt transport termination, so
    /// session-to-user mappings never outlive their connection.
    pub fn unregister(&self, session_id: SessionId) {
        if let Some((_, entry)) = self.sessions.remove(&session_id) {
            if let Some(user_id) = entry.user_id {
                self.remove_from_user(user_id, session_id);
            }
            tracing::debug!(session = %session_id, "session unregistered");
        }
    }

    /// Current, possibly-empty set of live session ids for a user
    pub fn sessions_for(&self, user_id: Uuid) -> Vec<SessionId> {
        self.users
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Fire-and-forget send to one session. Returns false if the session is
    /// gone or its channel is closed; the caller never retries.
    pub fn push(&self, session_id: SessionId, event: ServerEvent) -> bool {
        match self.sessions.get(&session_id) {
            Some(entry) => entry.sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Push an event to every live session of a user. A failed send to one
    /// session does not abort delivery to the others. Returns the number of
    /// sessions that accepted the event.
    pub fn push_user(&self, user_id: Uuid, event: ServerEvent) -> usize {
        let session_ids = self.sessions_for(user_id);
        let mut delivered = 0;
        for session_id in session_ids {
            if self.push(session_id, event.clone()) {
                delivered += 1;
            } else {
                tracing::debug!(
                    session = %session_id,
                    user = %user_id,
                    "push to session failed; record will surface at reconciliation"
                );
            }
        }
        delivered
    }

    /// Earliest connect time among a user's live sessions, `None` when no
    /// session is live. Anonymous time counts: the clock starts at
    /// transport attach, not at association.
    pub fn connected_since(&self, user_id: Uuid) -> Option<DateTime<Utc>> {
        self.sessions_for(user_id)
            .into_iter()
            .filter_map(|session_id| {
                self.sessions
                    .get(&session_id)
                    .map(|entry| entry.connected_at)
            })
            .min()
    }

    /// Number of live sessions for a user
    pub fn connection_count(&self, user_id: Uuid) -> usize {
        self.users.get(&user_id).map(|set| set.len()).unwrap_or(0)
    }

    /// Total number of registered sessions, associated or not
    pub fn total_connections(&self) -> usize {
        self.sessions.len()
    }

    /// Number of users with at least one live session
    pub fn connected_users(&self) -> usize {
        self.users.len()
    }

    fn remove_from_user(&self, user_id: Uuid, session_id: SessionId) {
        let mut now_empty = false;
        if let Some(mut set) = self.users.get_mut(&user_id) {
            set.remove(&session_id);
            now_empty = set.is_empty();
        }
        // Guard dropped above; remove_if re-checks under the shard lock so a
        // concurrent associate for the same user is not clobbered.
        if now_empty {
            self.users.remove_if(&user_id, |_, set| set.is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (SessionSender, mpsc::UnboundedReceiver<ServerEvent>) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn test_anonymous_session_receives_no_fanout() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();
        let (tx, mut rx) = channel();
        registry.register(SessionId::new(), tx);

        assert_eq!(registry.push_user(user_id, ServerEvent::error("x", "y")), 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(registry.total_connections(), 1);
        assert_eq!(registry.connected_users(), 0);
    }

    #[tokio::test]
    async fn test_associate_and_push() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();
        let session_id = SessionId::new();
        let (tx, mut rx) = channel();

        registry.register(session_id, tx);
        registry.associate(session_id, user_id).unwrap();

        assert_eq!(registry.sessions_for(user_id), vec![session_id]);
        assert_eq!(registry.push_user(user_id, ServerEvent::error("c", "m")), 1);
        assert!(matches!(
            rx.recv().await,
            Some(ServerEvent::Error { .. })
        ));
    }

    #[tokio::test]
    async fn test_associate_idempotent_same_pair() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();
        let session_id = SessionId::new();
        let (tx, _rx) = channel();

        registry.register(session_id, tx);
        registry.associate(session_id, user_id).unwrap();
        registry.associate(session_id, user_id).unwrap();

        assert_eq!(registry.connection_count(user_id), 1);
    }

    #[tokio::test]
    async fn test_associate_conflict_preserves_binding() {
        let registry = ConnectionRegistry::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let session_id = SessionId::new();
        let (tx, _rx) = channel();

        registry.register(session_id, tx);
        registry.associate(session_id, first).unwrap();

        let err = registry.associate(session_id, second).unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { bound_to, .. } if bound_to == first));
        assert_eq!(registry.sessions_for(first), vec![session_id]);
        assert!(registry.sessions_for(second).is_empty());
    }

    #[tokio::test]
    async fn test_associate_unknown_session() {
        let registry = ConnectionRegistry::new();
        let err = registry
            .associate(SessionId::new(), Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownSession(_)));
    }

    #[tokio::test]
    async fn test_multiple_sessions_same_user() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();
        let mut receivers = Vec::new();

        for _ in 0..3 {
            let session_id = SessionId::new();
            let (tx, rx) = channel();
            registry.register(session_id, tx);
            registry.associate(session_id, user_id).unwrap();
            receivers.push(rx);
        }

        assert_eq!(registry.connection_count(user_id), 3);
        assert_eq!(registry.push_user(user_id, ServerEvent::error("c", "m")), 3);
        for mut rx in receivers {
            assert!(rx.recv().await.is_some());
        }
    }

    #[tokio::test]
    async fn test_unregister_removes_association() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();
        let session_id = SessionId::new();
        let (tx, _rx) = channel();

        registry.register(session_id, tx);
        registry.associate(session_id, user_id).unwrap();
        registry.unregister(session_id);

        assert!(registry.sessions_for(user_id).is_empty());
        assert_eq!(registry.total_connections(), 0);
        assert_eq!(registry.connected_users(), 0);
    }

    #[tokio::test]
    async fn test_unregister_anonymous_session_no_leak() {
        let registry = ConnectionRegistry::new();
        let session_id = SessionId::new();
        let (tx, _rx) = channel();

        registry.register(session_id, tx);
        registry.unregister(session_id);

        assert_eq!(registry.total_connections(), 0);
    }

    #[tokio::test]
    async fn test_disassociate_is_noop_when_never_associated() {
        let registry = ConnectionRegistry::new();
        let session_id = SessionId::new();
        let (tx, _rx) = channel();

        registry.register(session_id, tx);
        registry.disassociate(session_id);
        registry.disassociate(SessionId::new());

        assert_eq!(registry.total_connections(), 1);
    }

    #[tokio::test]
    async fn test_disconnecting_one_session_leaves_other() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();
        let s1 = SessionId::new();
        let s2 = SessionId::new();
        let (tx1, _rx1) = channel();
        let (tx2, mut rx2) = channel();

        registry.register(s1, tx1);
        registry.register(s2, tx2);
        registry.associate(s1, user_id).unwrap();
        registry.associate(s2, user_id).unwrap();

        registry.unregister(s1);

        assert_eq!(registry.sessions_for(user_id), vec![s2]);
        assert_eq!(registry.push_user(user_id, ServerEvent::error("c", "m")), 1);
        assert!(rx2.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_push_survives_closed_channel() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();
        let dead = SessionId::new();
        let live = SessionId::new();
        let (tx_dead, rx_dead) = channel();
        let (tx_live, mut rx_live) = channel();

        registry.register(dead, tx_dead);
        registry.register(live, tx_live);
        registry.associate(dead, user_id).unwrap();
        registry.associate(live, user_id).unwrap();
        drop(rx_dead);

        // The dead session must not abort delivery to the live one.
        assert_eq!(registry.push_user(user_id, ServerEvent::error("c", "m")), 1);
        assert!(rx_live.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_reassociation_after_disconnect() {
        let registry = ConnectionRegistry::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let session_id = SessionId::new();

        let (tx, _rx) = channel();
        registry.register(session_id, tx);
        registry.associate(session_id, first).unwrap();
        registry.unregister(session_id);

        // A fresh connection may bind the same transport id to another user.
        let (tx, _rx) = channel();
        registry.register(session_id, tx);
        registry.associate(session_id, second).unwrap();

        assert!(registry.sessions_for(first).is_empty());
        assert_eq!(registry.sessions_for(second), vec![session_id]);
    }

    #[tokio::test]
    async fn test_connected_since_tracks_earliest_live_session() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();
        assert!(registry.connected_since(user_id).is_none());

        let first = SessionId::new();
        let (tx, _rx_first) = channel();
        registry.register(first, tx);
        registry.associate(first, user_id).unwrap();
        let since = registry.connected_since(user_id).unwrap();

        // A later session does not move the earliest timestamp.
        let second = SessionId::new();
        let (tx, _rx_second) = channel();
        registry.register(second, tx);
        registry.associate(second, user_id).unwrap();
        assert_eq!(registry.connected_since(user_id), Some(since));

        // Dropping the older session advances it to the survivor.
        registry.unregister(first);
        assert!(registry.connected_since(user_id).unwrap() >= since);

        registry.unregister(second);
        assert!(registry.connected_since(user_id).is_none());
    }
}
