/// Notification pull and dispatch handlers
///
/// The pull endpoints back reconnect-time reconciliation: clients fetch the
/// backlog with their last seen marker and merge by identifier.
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use super::{ApiResponse, Identity};
use crate::error::AppError;
use crate::models::NewNotification;
use crate::services::FanOutDispatcher;
use crate::store::NotificationStore;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Identifier marker; only records with a greater id are returned
    #[serde(default)]
    pub since: i64,
}

/// GET /api/v1/notifications?since=<marker>
pub async fn list_notifications(
    store: web::Data<Arc<dyn NotificationStore>>,
    identity: Identity,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let records = store.list_for(identity.0, query.since).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(records)))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    store: web::Data<Arc<dyn NotificationStore>>,
    identity: Identity,
) -> Result<HttpResponse, AppError> {
    let count = store.unread_count(identity.0).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "unread": count }))))
}

/// PUT /api/v1/notifications/{id}/read
///
/// Idempotent: an unknown or already-read identifier also answers success.
pub async fn mark_read(
    store: web::Data<Arc<dyn NotificationStore>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    store.mark_read(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "read": true }))))
}

/// PUT /api/v1/notifications/mark-all-read
pub async fn mark_all_read(
    store: web::Data<Arc<dyn NotificationStore>>,
    identity: Identity,
) -> Result<HttpResponse, AppError> {
    let updated = store.mark_all_read(identity.0).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "updated": updated }))))
}

/// POST /api/v1/notifications/dispatch
///
/// Application event entry point. The response carries the stored record and
/// any non-fatal out-of-band delivery warning.
pub async fn dispatch_notification(
    dispatcher: web::Data<Arc<FanOutDispatcher>>,
    req: web::Json<NewNotification>,
) -> Result<HttpResponse, AppError> {
    let receipt = dispatcher.dispatch(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(receipt)))
}

/// Register routes. Literal segments go before the `{id}` capture.
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/notifications")
            .route("", web::get().to(list_notifications))
            .route("/unread-count", web::get().to(unread_count))
            .route("/mark-all-read", web::put().to(mark_all_read))
            .route("/dispatch", web::post().to(dispatch_notification))
            .route("/{id}/read", web::put().to(mark_read)),
    );
}
