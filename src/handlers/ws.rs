/// WebSocket upgrade and connection status handlers
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde_json::json;
use uuid::Uuid;

use crate::config::Config;
use crate::registry::ConnectionRegistry;
use crate::services::SignalingRelay;
use crate::websocket::NotificationSession;

/// GET /ws
///
/// Upgrades to a WebSocket session. The session starts anonymous; the client
/// sends a `join` event with its (upstream-verified) user identity to start
/// receiving fan-out traffic.
pub async fn notification_ws(
    req: HttpRequest,
    payload: web::Payload,
    registry: web::Data<Arc<ConnectionRegistry>>,
    relay: web::Data<Arc<SignalingRelay>>,
    config: web::Data<Config>,
) -> ActixResult<HttpResponse> {
    let session = NotificationSession::new(
        registry.get_ref().clone(),
        relay.get_ref().clone(),
        Duration::from_secs(config.websocket.heartbeat_secs),
        Duration::from_secs(config.websocket.client_timeout_secs),
    );
    ws::start(session, &req, payload)
}

/// GET /api/v1/ws/status/{user_id}
pub async fn ws_status(
    path: web::Path<Uuid>,
    registry: web::Data<Arc<ConnectionRegistry>>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();
    let connection_count = registry.connection_count(user_id);

    Ok(HttpResponse::Ok().json(json!({
        "user_id": user_id.to_string(),
        "connected": connection_count > 0,
        "connection_count": connection_count,
        "connected_since": registry.connected_since(user_id)
    })))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(notification_ws)).service(
        web::scope("/api/v1/ws").route("/status/{user_id}", web::get().to(ws_status)),
    );
}
