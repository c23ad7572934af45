// Domain layer: card game rules, kept free of transport concerns.

pub mod card;
pub mod events;
pub mod game;
pub mod generator;
pub mod mode;
pub mod player;
pub mod preset;
pub mod settings;

pub use card::{Card, CardColor, CardKind};
pub use events::{Envelope, OutboundEvent, PlayerSummary, Recipient};
pub use game::Game;
pub use generator::CardGenerator;
pub use mode::GameMode;
pub use player::{Player, PlayerId};
pub use settings::{GameSettings, SettingsUpdate};
