pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod reconcile;
pub mod registry;
pub mod services;
pub mod store;
pub mod websocket;

pub use config::Config;
pub use error::{AppError, Result};
pub use reconcile::NotificationInbox;
pub use registry::{ConnectionRegistry, RegistryError, SessionId};
pub use services::{DispatchReceipt, FanOutDispatcher, OutOfBandDelivery, SignalingRelay};
pub use store::NotificationStore;
pub use websocket::{ClientEvent, ServerEvent};
