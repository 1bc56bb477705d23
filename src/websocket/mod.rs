/// WebSocket transport surface
///
/// Three event names travel on the wire:
/// 1. `join` (client -> server): establishes the session/user association
/// 2. `signal` (bidirectional): ephemeral point-to-point relay payloads
/// 3. `notification` (server -> client): full durable notification record
///
/// Sessions are actix actors; each one registers an unbounded channel with
/// the ConnectionRegistry and forwards whatever arrives on it to the socket.
pub mod messages;
pub mod session;

pub use messages::{ClientEvent, ServerEvent};
pub use session::NotificationSession;
