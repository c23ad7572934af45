// Use-case level inputs for a lobby's session task. This is the closed
// union every inbound wire message is translated into; one mpsc channel per
// lobby serializes them in arrival order.

use crate::domain::{CardColor, OutboundEvent, PlayerId, SettingsUpdate};
use tokio::sync::{mpsc, oneshot};

/// Events consumed by a lobby session, translated from client messages or
/// synthesized by the connection lifecycle.
#[derive(Debug)]
pub enum LobbyEvent {
    /// First join of a connection; replies with the minted identity and the
    /// link epoch the socket must present when it disconnects.
    Join {
        username: String,
        outbox: mpsc::Sender<OutboundEvent>,
        reply: oneshot::Sender<(PlayerId, u64)>,
    },
    /// Rebinds an existing identity to a fresh connection. Replies with the
    /// new link epoch, or `None` when the identity is unknown to this lobby.
    Reconnect {
        player_id: PlayerId,
        outbox: mpsc::Sender<OutboundEvent>,
        reply: oneshot::Sender<Option<u64>>,
    },
    CardPlaced {
        player_id: PlayerId,
        card_id: u64,
    },
    DrawRequest {
        player_id: PlayerId,
    },
    ColorWish {
        player_id: PlayerId,
        color: Option<CardColor>,
    },
    SettingsChanged {
        player_id: PlayerId,
        update: SettingsUpdate,
    },
    StartGame {
        player_id: PlayerId,
    },
    /// Socket closed. Carries the epoch handed out at bind time so a close
    /// from a connection that has already been replaced is ignored.
    Disconnected {
        player_id: PlayerId,
        epoch: u64,
    },
    /// Posted by the session's own grace timer; ignored unless the epoch
    /// still matches (a reconnect bumps the epoch and thereby cancels it).
    LeaveExpired {
        player_id: PlayerId,
        epoch: u64,
    },
}
