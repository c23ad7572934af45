// Lobby settings. Defaults are server-authoritative; a change request may
// only pick one of the listed values.

use crate::domain::mode::GameMode;

pub const CARD_AMOUNT_DEFAULTS: &[&str] = &["5", "7", "10", "15", "20"];
pub const GAME_MODE_DEFAULTS: &[&str] = &["Classic", "Lite", "Special"];

#[derive(Debug, Clone)]
pub struct Setting {
    pub value: String,
    pub defaults: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub struct GameSettings {
    pub card_amount: Setting,
    pub game_mode: Setting,
}

/// Value picks from an inbound settings change; unknown fields are dropped
/// at the protocol boundary.
#[derive(Debug, Clone)]
pub struct SettingsUpdate {
    pub card_amount: Option<String>,
    pub game_mode: Option<String>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            card_amount: Setting {
                value: "7".to_string(),
                defaults: CARD_AMOUNT_DEFAULTS,
            },
            game_mode: Setting {
                value: GameMode::Classic.name().to_string(),
                defaults: GAME_MODE_DEFAULTS,
            },
        }
    }
}

impl GameSettings {
    /// Applies the requested values, ignoring anything outside the
    /// defaults. Returns whether any field changed.
    pub fn apply(&mut self, update: &SettingsUpdate) -> bool {
        let mut changed = false;
        if let Some(value) = &update.card_amount {
            if self.card_amount.defaults.contains(&value.as_str())
                && self.card_amount.value != *value
            {
                self.card_amount.value = value.clone();
                changed = true;
            }
        }
        if let Some(value) = &update.game_mode {
            if self.game_mode.defaults.contains(&value.as_str()) && self.game_mode.value != *value {
                self.game_mode.value = value.clone();
                changed = true;
            }
        }
        changed
    }

    pub fn card_amount(&self) -> usize {
        self.card_amount.value.parse().unwrap_or(7)
    }

    pub fn mode(&self) -> GameMode {
        GameMode::from_name(&self.game_mode.value).unwrap_or(GameMode::Classic)
    }
}
