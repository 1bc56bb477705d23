/// Actor for a single WebSocket connection
///
/// Lifecycle:
/// - started: assign a SessionId, register an unbounded channel with the
///   ConnectionRegistry, begin heartbeats
/// - text frames: `join` associates the session, `signal` goes through the
///   SignalingRelay
/// - stopped: unregister, which also drops any user association. The stop
///   hook runs even under abrupt transport termination, so mappings never
///   outlive the connection.
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web_actors::ws;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::metrics;
use crate::registry::{ConnectionRegistry, RegistryError, SessionId};
use crate::services::SignalingRelay;
use crate::websocket::{ClientEvent, ServerEvent};

pub struct NotificationSession {
    session_id: SessionId,
    registry: Arc<ConnectionRegistry>,
    relay: Arc<SignalingRelay>,
    hb: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
}

impl NotificationSession {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        relay: Arc<SignalingRelay>,
        heartbeat_interval: Duration,
        client_timeout: Duration,
    ) -> Self {
        Self {
            session_id: SessionId::new(),
            registry,
            relay,
            hb: Instant::now(),
            heartbeat_interval,
            client_timeout,
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let timeout = self.client_timeout;
        ctx.run_interval(self.heartbeat_interval, move |act, ctx| {
            if Instant::now().duration_since(act.hb) > timeout {
                tracing::info!(session = %act.session_id, "client heartbeat timed out, closing");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn handle_client_event(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let event = match ClientEvent::from_json(text) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(session = %self.session_id, error = %err, "unparseable client event");
                self.send_event(ServerEvent::error("bad_event", err.to_string()), ctx);
                return;
            }
        };

        match event {
            ClientEvent::Join { user_id } => match self.registry.associate(self.session_id, user_id) {
                Ok(()) => {
                    tracing::info!(session = %self.session_id, user = %user_id, "session joined");
                    self.send_event(ServerEvent::joined(user_id, self.session_id), ctx);
                }
                Err(err @ RegistryError::Conflict { .. }) => {
                    tracing::warn!(session = %self.session_id, user = %user_id, "rejected re-association");
                    self.send_event(ServerEvent::error("conflict", err.to_string()), ctx);
                }
                Err(err) => {
                    self.send_event(ServerEvent::error("unknown_session", err.to_string()), ctx);
                }
            },
            ClientEvent::Signal { to, data } => {
                self.relay.relay(self.session_id, to, data);
            }
        }
    }

    fn send_event(&self, event: ServerEvent, ctx: &mut ws::WebsocketContext<Self>) {
        match event.to_json() {
            Ok(json) => ctx.text(json),
            Err(err) => tracing::warn!(session = %self.session_id, error = %err, "failed to serialize event"),
        }
    }
}

impl Actor for NotificationSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.register(self.session_id, tx);
        ctx.add_stream(UnboundedReceiverStream::new(rx));
        self.start_heartbeat(ctx);
        metrics::ws_connection_opened();
        tracing::debug!(session = %self.session_id, "websocket session started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.registry.unregister(self.session_id);
        metrics::ws_connection_closed();
        tracing::debug!(session = %self.session_id, "websocket session stopped");
    }
}

/// Events pushed by the registry (fan-out and relayed signals)
impl StreamHandler<ServerEvent> for NotificationSession {
    fn handle(&mut self, event: ServerEvent, ctx: &mut Self::Context) {
        self.send_event(event, ctx);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for NotificationSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.hb = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                self.handle_client_event(&text, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::debug!(session = %self.session_id, "ignoring binary frame");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(err) => {
                tracing::debug!(session = %self.session_id, error = %err, "websocket protocol error");
                ctx.stop();
            }
        }
    }
}
