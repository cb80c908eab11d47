mod input;
pub mod prediction;
mod session;

pub use input::{Idle, InputSource};
pub use session::Client;
