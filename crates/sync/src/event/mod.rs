mod types;

pub use types::{Event, EventKind, EventTag, EventTarget};
