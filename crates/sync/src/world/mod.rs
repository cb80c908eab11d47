mod entity;
mod history;
mod input;
mod kind;
mod player;
mod registry;
mod state;

pub use entity::Entity;
pub use history::{StateHistory, StateRecord};
pub use input::{InputBuffer, InputSample};
pub use kind::{BasicEntity, EntityKind, EntityTag};
pub use player::{MAX_NAME_LENGTH, Player, is_valid_name};
pub use registry::{EntityId, PlayerId, SlotId, SlotRegistry, Slotted};
pub use state::State;
