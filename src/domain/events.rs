// Outbound domain events. The engine queues these and the session actor
// routes them to connections; the protocol layer owns serialization.

use crate::domain::card::{Card, CardColor};
use crate::domain::player::PlayerId;
use crate::domain::settings::GameSettings;

/// Who an event is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    All,
    One(PlayerId),
}

/// Public roster row carried by playerlist updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSummary {
    pub username: String,
    pub player_id: PlayerId,
    pub hand_size: usize,
    pub is_active_turn: bool,
    pub is_spectating: bool,
}

#[derive(Debug, Clone)]
pub enum OutboundEvent {
    JoinedLobby { player_id: PlayerId },
    SettingsChanged(GameSettings),
    AdminUpdated { player_id: PlayerId },
    PlayerlistUpdated(Vec<PlayerSummary>),
    PlayerJoined { username: String, player_id: PlayerId },
    PlayerLeft { player_id: PlayerId },
    GameStarted,
    TurnChanged { player_id: PlayerId },
    CardPlaced(Card),
    ColorUpdated(CardColor),
    HandUpdated(Vec<Card>),
    DrawAmountUpdated(u32),
    DrawRequestAck,
    ColorWishPrompt,
    PlayerDone { player_id: PlayerId },
    GameOver,
}

/// An addressed event waiting for delivery.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub to: Recipient,
    pub event: OutboundEvent,
}
