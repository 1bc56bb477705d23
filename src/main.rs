use std::io;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware, web, App, HttpServer};
use notification_relay::services::{DisabledDelivery, HttpDeliveryGateway, OutOfBandDelivery};
use notification_relay::store::{MemoryNotificationStore, NotificationStore, PgNotificationStore};
use notification_relay::{
    db, handlers, metrics, Config, ConnectionRegistry, FanOutDispatcher, SignalingRelay,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting notification relay");

    let config = Config::from_env().map_err(|e| io::Error::other(e.to_string()))?;

    let store: Arc<dyn NotificationStore> = match &config.database.url {
        Some(url) => {
            let pool = db::init_pool(url, config.database.max_connections)
                .await
                .map_err(|e| {
                    tracing::error!("failed to connect to database: {}", e);
                    io::Error::other("database connection failed")
                })?;
            tracing::info!("connected to database, migrations applied");
            Arc::new(PgNotificationStore::new(pool))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set, using in-memory store; records will not survive restart"
            );
            Arc::new(MemoryNotificationStore::new())
        }
    };

    let delivery: Arc<dyn OutOfBandDelivery> = match &config.delivery.gateway_url {
        Some(url) => {
            let gateway = HttpDeliveryGateway::new(
                url.clone(),
                Duration::from_secs(config.delivery.timeout_secs),
            )
            .map_err(|e| io::Error::other(e.to_string()))?;
            tracing::info!("out-of-band delivery gateway: {}", url);
            Arc::new(gateway)
        }
        None => {
            tracing::warn!("DELIVERY_GATEWAY_URL not set, out-of-band delivery disabled");
            Arc::new(DisabledDelivery)
        }
    };

    let registry = Arc::new(ConnectionRegistry::new());
    let dispatcher = Arc::new(FanOutDispatcher::new(
        store.clone(),
        registry.clone(),
        delivery,
    ));
    let relay = Arc::new(SignalingRelay::new(registry.clone()));

    let addr = format!("0.0.0.0:{}", config.app.port);
    tracing::info!("listening on {}", addr);

    let config_data = web::Data::new(config);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(registry.clone()))
            .app_data(web::Data::new(dispatcher.clone()))
            .app_data(web::Data::new(relay.clone()))
            .app_data(config_data.clone())
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(|cfg| {
                handlers::notifications::register_routes(cfg);
                handlers::ws::register_routes(cfg);
            })
    })
    .bind(&addr)?
    .run()
    .await
}
