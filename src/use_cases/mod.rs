// Use cases layer: application workflows for the game server.

pub mod lobby;
pub mod session;
pub mod types;

pub use lobby::{LobbyHandle, LobbyRegistry, LobbySettings};
pub use types::LobbyEvent;
