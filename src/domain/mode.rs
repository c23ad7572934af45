// Game mode variants. Modes differ only in which presets their generator
// samples from; the effect resolver in `game.rs` is shared and effects a mode
// cannot produce simply never fire.

use crate::domain::preset::{
    ACTION_PRESET, CLASSIC_PRESET, CardPreset, EXTENDED_ACTION_PRESET, EXTENDED_CLASSIC_PRESET,
    RANDOM_COLOR_PRESET, RANDOM_CYCLE_PRESET, WISH_PRESET,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    /// The classic Onu rule set: four colors, full special-card set.
    Classic,
    /// Numbered cards only; every play falls through to the no-effect branch.
    Lite,
    /// Six colors plus redistribute, cycle and random-color cards.
    Special,
}

impl GameMode {
    pub fn from_name(name: &str) -> Option<GameMode> {
        match name {
            "Classic" => Some(GameMode::Classic),
            "Lite" => Some(GameMode::Lite),
            "Special" => Some(GameMode::Special),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GameMode::Classic => "Classic",
            GameMode::Lite => "Lite",
            GameMode::Special => "Special",
        }
    }

    /// The preset composition this mode's generator samples from.
    pub fn presets(self) -> &'static [CardPreset] {
        match self {
            GameMode::Classic => &[CLASSIC_PRESET, WISH_PRESET, ACTION_PRESET],
            GameMode::Lite => &[CLASSIC_PRESET],
            GameMode::Special => &[
                EXTENDED_CLASSIC_PRESET,
                WISH_PRESET,
                EXTENDED_ACTION_PRESET,
                RANDOM_CYCLE_PRESET,
                RANDOM_COLOR_PRESET,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::CardKind;

    #[test]
    fn mode_names_round_trip() {
        for mode in [GameMode::Classic, GameMode::Lite, GameMode::Special] {
            assert_eq!(GameMode::from_name(mode.name()), Some(mode));
        }
        assert_eq!(GameMode::from_name("classic"), None);
    }

    #[test]
    fn lite_produces_numbers_only() {
        for preset in GameMode::Lite.presets() {
            for kind in preset.kinds {
                assert!(matches!(kind, CardKind::Number(_)));
            }
        }
    }

    #[test]
    fn special_extends_classic() {
        let kinds: Vec<_> = GameMode::Special
            .presets()
            .iter()
            .flat_map(|p| p.kinds.iter().copied())
            .collect();
        assert!(kinds.contains(&CardKind::Redistribute));
        assert!(kinds.contains(&CardKind::Cycle));
        assert!(kinds.contains(&CardKind::RandomColor));
    }
}
