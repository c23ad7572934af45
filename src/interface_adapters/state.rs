use crate::use_cases::LobbyRegistry;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    // All active lobbies, shared across connection handlers.
    pub lobbies: Arc<LobbyRegistry>,
    // Interval for liveness pings on client sockets.
    pub ping_interval: Duration,
}
