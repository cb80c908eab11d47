pub mod arena;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod net;
pub mod protocol;
pub mod server;
pub mod simulation;
pub mod world;

pub use client::{Client, Idle, InputSource};
pub use config::{DEFAULT_PORT, DEFAULT_TICK_RATE, GameConfig};
pub use error::{CodecError, SyncError, TransportError};
pub use event::{Event, EventKind, EventTag, EventTarget};
pub use net::{
    ClientMessage, Connection, DelayedConnection, MemoryConnection, MemoryPeer, ServerMessage,
    TcpConnection, Tick, Value,
};
pub use protocol::{Protocol, ProtocolBuilder};
pub use server::{CloseReason, ConnectionEvent, ConnectionId, Server};
pub use simulation::{Level, OpenLevel, Role, Schedule, SimulationContext, TickClock, TickScheduler};
pub use world::{Entity, EntityId, EntityKind, EntityTag, Player, PlayerId, State};
