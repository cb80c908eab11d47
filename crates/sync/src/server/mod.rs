mod events;
mod host;
pub mod lag;
mod visibility;

pub use events::{CloseReason, ConnectionEvent, ConnectionId};
pub use host::Server;
