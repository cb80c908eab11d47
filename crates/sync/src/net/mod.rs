mod delay;
mod message;
mod tcp;
mod transport;

pub use delay::DelayedConnection;
pub use message::{
    ArchivedClientMessage, ArchivedServerMessage, ClientMessage, EntityUpdate, EventRecord,
    EventScope, PING_WINDOW_MS, ScopedEvent, ServerMessage, Tick, Value,
};
pub use tcp::{MAX_FRAME_SIZE, Outbound, TcpConnection, read_frame, write_frame, write_loop};
pub use transport::{Connection, MemoryConnection, MemoryPeer};
