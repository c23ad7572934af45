// Wire protocol DTOs and conversions for public game server messages.
// Domain types never cross the socket; everything is converted here.

use crate::domain::{Card, GameSettings, OutboundEvent, PlayerSummary, SettingsUpdate};
use serde::{Deserialize, Serialize};

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Handshake: first message of a fresh connection.
    Join(JoinPayload),
    // Handshake alternative: resume an existing identity.
    Reconnect(ReconnectPayload),
    // Gameplay messages sent after a successful handshake.
    CardPlaced { card: CardDto },
    DrawRequest,
    ColorWish { color: Option<String> },
    SettingsChanged { settings: SettingsDto },
    StartGame,
}

/// Payload for the join handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    pub username: String,
    pub lobby_code: String,
}

/// Payload for resuming an identity after a dropped connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectPayload {
    pub lobby_code: String,
    pub player_id: String,
}

/// Messages the server sends to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    JoinedLobby { player_id: String },
    SettingsChanged { settings: SettingsDto },
    AdminUpdated { player_id: String },
    PlayerlistUpdated { players: Vec<PlayerlistEntryDto> },
    PlayerJoined { username: String, player_id: String },
    PlayerLeft { player_id: String },
    GameStarted,
    TurnChanged { player_id: String },
    CardPlaced { card: CardDto },
    ColorUpdated { color: String },
    HandUpdated { cards: Vec<CardDto> },
    DrawAmountUpdated { amount: u32 },
    DrawRequestAck,
    ColorWishPrompt,
    PlayerDone { player_id: String },
    GameOver,
}

/// Flattened card for wire transmission. Kinds and colors use the short
/// codes of the Onu wire format ("p2", "sw", "r", "k", ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDto {
    pub id: u64,
    pub kind: String,
    pub color: String,
}

impl From<&Card> for CardDto {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id,
            kind: card.kind.code(),
            color: card.color.code().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingDto {
    pub value: String,
    pub defaults: Vec<String>,
}

/// Settings payload; defaults are informational on the way out and ignored
/// on the way in (the server owns the allowed values).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsDto {
    pub card_amount: SettingDto,
    pub game_mode: SettingDto,
}

impl From<&GameSettings> for SettingsDto {
    fn from(settings: &GameSettings) -> Self {
        Self {
            card_amount: SettingDto {
                value: settings.card_amount.value.clone(),
                defaults: settings
                    .card_amount
                    .defaults
                    .iter()
                    .map(|d| d.to_string())
                    .collect(),
            },
            game_mode: SettingDto {
                value: settings.game_mode.value.clone(),
                defaults: settings
                    .game_mode
                    .defaults
                    .iter()
                    .map(|d| d.to_string())
                    .collect(),
            },
        }
    }
}

impl From<&SettingsDto> for SettingsUpdate {
    fn from(dto: &SettingsDto) -> Self {
        Self {
            card_amount: Some(dto.card_amount.value.clone()),
            game_mode: Some(dto.game_mode.value.clone()),
        }
    }
}

/// Public roster row in playerlist updates.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerlistEntryDto {
    pub username: String,
    pub player_id: String,
    pub hand_size: usize,
    pub is_active_turn: bool,
    pub is_spectating: bool,
}

impl From<&PlayerSummary> for PlayerlistEntryDto {
    fn from(summary: &PlayerSummary) -> Self {
        Self {
            username: summary.username.clone(),
            player_id: summary.player_id.to_string(),
            hand_size: summary.hand_size,
            is_active_turn: summary.is_active_turn,
            is_spectating: summary.is_spectating,
        }
    }
}

impl From<OutboundEvent> for ServerMessage {
    fn from(event: OutboundEvent) -> Self {
        match event {
            OutboundEvent::JoinedLobby { player_id } => ServerMessage::JoinedLobby {
                player_id: player_id.to_string(),
            },
            OutboundEvent::SettingsChanged(settings) => ServerMessage::SettingsChanged {
                settings: SettingsDto::from(&settings),
            },
            OutboundEvent::AdminUpdated { player_id } => ServerMessage::AdminUpdated {
                player_id: player_id.to_string(),
            },
            OutboundEvent::PlayerlistUpdated(list) => ServerMessage::PlayerlistUpdated {
                players: list.iter().map(PlayerlistEntryDto::from).collect(),
            },
            OutboundEvent::PlayerJoined {
                username,
                player_id,
            } => ServerMessage::PlayerJoined {
                username,
                player_id: player_id.to_string(),
            },
            OutboundEvent::PlayerLeft { player_id } => ServerMessage::PlayerLeft {
                player_id: player_id.to_string(),
            },
            OutboundEvent::GameStarted => ServerMessage::GameStarted,
            OutboundEvent::TurnChanged { player_id } => ServerMessage::TurnChanged {
                player_id: player_id.to_string(),
            },
            OutboundEvent::CardPlaced(card) => ServerMessage::CardPlaced {
                card: CardDto::from(&card),
            },
            OutboundEvent::ColorUpdated(color) => ServerMessage::ColorUpdated {
                color: color.code().to_string(),
            },
            OutboundEvent::HandUpdated(cards) => ServerMessage::HandUpdated {
                cards: cards.iter().map(CardDto::from).collect(),
            },
            OutboundEvent::DrawAmountUpdated(amount) => {
                ServerMessage::DrawAmountUpdated { amount }
            }
            OutboundEvent::DrawRequestAck => ServerMessage::DrawRequestAck,
            OutboundEvent::ColorWishPrompt => ServerMessage::ColorWishPrompt,
            OutboundEvent::PlayerDone { player_id } => ServerMessage::PlayerDone {
                player_id: player_id.to_string(),
            },
            OutboundEvent::GameOver => ServerMessage::GameOver,
        }
    }
}
