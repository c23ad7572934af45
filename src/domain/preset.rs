// Declarative card compositions. A preset is a flat (colors x kinds) grid;
// modes combine presets and the generator samples from their union.

use crate::domain::card::{CardColor, CardKind};

/// An immutable (colors x kinds) composition descriptor.
#[derive(Debug, Clone, Copy)]
pub struct CardPreset {
    pub colors: &'static [CardColor],
    pub kinds: &'static [CardKind],
}

const CLASSIC_COLORS: &[CardColor] = &[
    CardColor::Red,
    CardColor::Green,
    CardColor::Blue,
    CardColor::Yellow,
];

const EXTENDED_COLORS: &[CardColor] = &[
    CardColor::Red,
    CardColor::Green,
    CardColor::Blue,
    CardColor::Yellow,
    CardColor::Cyan,
    CardColor::Purple,
];

const NUMBER_KINDS: &[CardKind] = &[
    CardKind::Number(0),
    CardKind::Number(1),
    CardKind::Number(2),
    CardKind::Number(3),
    CardKind::Number(4),
    CardKind::Number(5),
    CardKind::Number(6),
    CardKind::Number(7),
    CardKind::Number(8),
    CardKind::Number(9),
];

const ACTION_KINDS: &[CardKind] = &[CardKind::Draw2, CardKind::Skip, CardKind::Reverse];

/// Numbered cards in the four classic colors.
pub const CLASSIC_PRESET: CardPreset = CardPreset {
    colors: CLASSIC_COLORS,
    kinds: NUMBER_KINDS,
};

/// Draw-2, skip and reverse in the four classic colors.
pub const ACTION_PRESET: CardPreset = CardPreset {
    colors: CLASSIC_COLORS,
    kinds: ACTION_KINDS,
};

/// Color wishes; black until the wish resolves.
pub const WISH_PRESET: CardPreset = CardPreset {
    colors: &[CardColor::Black],
    kinds: &[CardKind::Wish, CardKind::Draw4],
};

/// Numbered cards in the six extended colors.
pub const EXTENDED_CLASSIC_PRESET: CardPreset = CardPreset {
    colors: EXTENDED_COLORS,
    kinds: NUMBER_KINDS,
};

/// Action cards in the six extended colors.
pub const EXTENDED_ACTION_PRESET: CardPreset = CardPreset {
    colors: EXTENDED_COLORS,
    kinds: ACTION_KINDS,
};

/// Hand redistribution and hand cycling, colored like regular cards.
pub const RANDOM_CYCLE_PRESET: CardPreset = CardPreset {
    colors: EXTENDED_COLORS,
    kinds: &[CardKind::Redistribute, CardKind::Cycle],
};

/// Placeable on anything; takes a random color when placed.
pub const RANDOM_COLOR_PRESET: CardPreset = CardPreset {
    colors: &[CardColor::Black],
    kinds: &[CardKind::RandomColor],
};
