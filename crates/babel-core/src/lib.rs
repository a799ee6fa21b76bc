pub mod errors;
pub mod events;
pub mod ids;
pub mod lang;

pub use errors::TranslateError;
pub use events::{ChatEvent, Profile};
pub use ids::{ConnectionId, RoomId};
