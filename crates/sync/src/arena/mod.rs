//! Small top-down tag game shared by the server and client binaries.

mod events;
mod level;
mod walker;

use std::sync::Arc;

use crate::protocol::Protocol;

pub use events::{Tag, Tagged};
pub use level::ArenaLevel;
pub use walker::Walker;

pub fn protocol() -> Arc<Protocol> {
    Protocol::builder()
        .entity(Walker::TAG, Walker)
        .event::<Tag>()
        .event::<Tagged>()
        .build()
}
