pub mod message;
pub mod room;

pub use message::{Message, TodoState};
pub use room::{MemberRole, Room};
