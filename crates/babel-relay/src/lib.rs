pub mod client;
pub mod fanout;
pub mod handlers;
pub mod registry;
pub mod rooms;
pub mod server;
pub mod wire;

pub use handlers::ChatState;
pub use server::{start, RelayConfig, RelayHandle};
