/// Signaling Relay
///
/// Low-latency, non-persisted point-to-point relay between live sessions,
/// used for call/handshake signaling. Entirely independent of the durable
/// notification path: nothing is stored, nothing is retried, and a missed
/// signal is re-initiated by the application layer.
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::metrics;
use crate::registry::{ConnectionRegistry, SessionId};
use crate::websocket::ServerEvent;

pub struct SignalingRelay {
    registry: Arc<ConnectionRegistry>,
}

impl SignalingRelay {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Forward the envelope to every live session of `to`. Zero live
    /// sessions is success with nothing delivered. Returns the number of
    /// sessions reached.
    pub fn relay(&self, from: SessionId, to: Uuid, data: serde_json::Value) -> usize {
        let delivered = self.registry.push_user(to, ServerEvent::signal(from, data));
        metrics::inc_signal_relayed();
        if delivered == 0 {
            debug!(%from, %to, "no live sessions for signal, dropping");
        } else {
            debug!(%from, %to, delivered, "relayed signal");
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_relay_reaches_every_session() {
        let registry = Arc::new(ConnectionRegistry::new());
        let relay = SignalingRelay::new(registry.clone());
        let sender_session = SessionId::new();
        let target = Uuid::new_v4();

        let mut receivers = Vec::new();
        for _ in 0..2 {
            let session_id = SessionId::new();
            let (tx, rx) = mpsc::unbounded_channel();
            registry.register(session_id, tx);
            registry.associate(session_id, target).unwrap();
            receivers.push(rx);
        }

        let delivered = relay.relay(sender_session, target, json!({"type": "offer"}));
        assert_eq!(delivered, 2);

        for mut rx in receivers {
            match rx.recv().await {
                Some(ServerEvent::Signal { from, data }) => {
                    assert_eq!(from, sender_session);
                    assert_eq!(data["type"], "offer");
                }
                other => panic!("expected signal, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_relay_to_absent_user_is_success() {
        let registry = Arc::new(ConnectionRegistry::new());
        let relay = SignalingRelay::new(registry);

        let delivered = relay.relay(SessionId::new(), Uuid::new_v4(), json!({"x": 1}));
        assert_eq!(delivered, 0);
    }
}
