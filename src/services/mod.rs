pub mod delivery;
pub mod dispatcher;
pub mod relay;

pub use delivery::{DeliveryError, DisabledDelivery, HttpDeliveryGateway, OutOfBandDelivery};
pub use dispatcher::{DispatchReceipt, FanOutDispatcher};
pub use relay::SignalingRelay;
