pub mod messages;
pub mod permissions;
pub mod retirement;
pub mod room_mover;
pub mod rooms;
pub mod threads;
pub mod timeline;

pub use messages::MessageService;
pub use permissions::{AdministerTarget, PermissionOracle, RoomPermissionOracle};
pub use retirement::{RetirementOutcome, RetirementService};
pub use room_mover::RoomMover;
pub use rooms::RoomService;
pub use threads::ThreadService;
pub use timeline::{TimelineService, Window};
