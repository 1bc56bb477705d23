/// Fan-Out Dispatcher
///
/// The single write path for application events. Durability precedes
/// delivery: the record is persisted (and its identifier assigned) before
/// any client hears about it, so reconnect-time reconciliation is never
/// missing an item a client may have glimpsed live.
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::metrics;
use crate::models::{NewNotification, Notification};
use crate::registry::ConnectionRegistry;
use crate::services::OutOfBandDelivery;
use crate::store::NotificationStore;
use crate::websocket::ServerEvent;

/// Outcome of one dispatch call
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReceipt {
    pub notification: Notification,

    /// Live sessions found at dispatch time; zero means the out-of-band
    /// path was taken
    pub live_sessions: usize,

    /// Non-fatal out-of-band failure. The record is durable either way and
    /// will surface at the next reconnect; any retry policy lives with the
    /// caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_warning: Option<String>,
}

pub struct FanOutDispatcher {
    store: Arc<dyn NotificationStore>,
    registry: Arc<ConnectionRegistry>,
    delivery: Arc<dyn OutOfBandDelivery>,
}

impl FanOutDispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        registry: Arc<ConnectionRegistry>,
        delivery: Arc<dyn OutOfBandDelivery>,
    ) -> Self {
        Self {
            store,
            registry,
            delivery,
        }
    }

    /// Persist, then push to every live session of the recipient, or hand
    /// off to out-of-band delivery when none is live.
    ///
    /// Persistence failure aborts the call with nothing committed and no
    /// push attempted. Per-session push failures are swallowed. Two calls
    /// with logically distinct content create two records; dedup keys are
    /// the caller's concern.
    pub async fn dispatch(&self, req: NewNotification) -> Result<DispatchReceipt> {
        let notification = self.store.create(req).await?;

        let sessions = self.registry.sessions_for(notification.recipient_id);
        let live_sessions = sessions.len();
        let mut delivery_warning = None;

        if live_sessions == 0 {
            metrics::observe_dispatch("out_of_band");
            if let Err(err) = self.delivery.deliver(&notification).await {
                metrics::inc_delivery_failure();
                warn!(
                    notification_id = notification.id,
                    recipient = %notification.recipient_id,
                    error = %err,
                    "out-of-band delivery failed; record remains durable"
                );
                delivery_warning = Some(err.to_string());
            }
        } else {
            metrics::observe_dispatch("live");
            let delivered = self
                .registry
                .push_user(notification.recipient_id, ServerEvent::notification(&notification));
            debug!(
                notification_id = notification.id,
                recipient = %notification.recipient_id,
                sessions = live_sessions,
                delivered,
                "pushed notification to live sessions"
            );
        }

        Ok(DispatchReceipt {
            notification,
            live_sessions,
            delivery_warning,
        })
    }
}
