// Card primitives: kinds, colors, wire codes and the placement match rule.

/// The face of a card, independent of its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardKind {
    /// Plain numbered card, 0..=9.
    Number(u8),
    /// Forces the next player to draw two (stackable).
    Draw2,
    /// Forces a draw of four and lets the actor wish a color (stackable).
    Draw4,
    /// Wishes a color without a draw penalty.
    Wish,
    /// Skips the next player.
    Skip,
    /// Reverses the roster order.
    Reverse,
    /// Pools all active hands, shuffles and re-deals them evenly.
    Redistribute,
    /// Rotates hand ownership by one position.
    Cycle,
    /// Resolves to a random color when placed.
    RandomColor,
}

impl CardKind {
    /// Short wire code used by the client protocol.
    pub fn code(self) -> String {
        match self {
            CardKind::Number(n) => n.to_string(),
            CardKind::Draw2 => "p2".to_string(),
            CardKind::Draw4 => "p4".to_string(),
            CardKind::Wish => "w".to_string(),
            CardKind::Skip => "sk".to_string(),
            CardKind::Reverse => "sw".to_string(),
            CardKind::Redistribute => "rd".to_string(),
            CardKind::Cycle => "cy".to_string(),
            CardKind::RandomColor => "rc".to_string(),
        }
    }

    pub fn from_code(code: &str) -> Option<CardKind> {
        match code {
            "p2" => Some(CardKind::Draw2),
            "p4" => Some(CardKind::Draw4),
            "w" => Some(CardKind::Wish),
            "sk" => Some(CardKind::Skip),
            "sw" => Some(CardKind::Reverse),
            "rd" => Some(CardKind::Redistribute),
            "cy" => Some(CardKind::Cycle),
            "rc" => Some(CardKind::RandomColor),
            n => n.parse::<u8>().ok().filter(|n| *n <= 9).map(CardKind::Number),
        }
    }

    /// Wild-class kinds may be placed on any top card and accept any card on top.
    pub fn is_wild(self) -> bool {
        matches!(self, CardKind::Draw4 | CardKind::Wish | CardKind::RandomColor)
    }

    /// Kinds that may answer an accumulated draw stack.
    pub fn is_draw(self) -> bool {
        matches!(self, CardKind::Draw2 | CardKind::Draw4)
    }
}

/// Card colors. `Black` is the unresolved color of wild-class cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardColor {
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Purple,
    Black,
}

impl CardColor {
    pub fn code(self) -> &'static str {
        match self {
            CardColor::Red => "r",
            CardColor::Green => "g",
            CardColor::Blue => "b",
            CardColor::Yellow => "y",
            CardColor::Cyan => "c",
            CardColor::Purple => "p",
            CardColor::Black => "k",
        }
    }

    pub fn from_code(code: &str) -> Option<CardColor> {
        match code {
            "r" => Some(CardColor::Red),
            "g" => Some(CardColor::Green),
            "b" => Some(CardColor::Blue),
            "y" => Some(CardColor::Yellow),
            "c" => Some(CardColor::Cyan),
            "p" => Some(CardColor::Purple),
            "k" => Some(CardColor::Black),
            _ => None,
        }
    }
}

/// A single generated card. The `id` is assigned at generation time and is
/// the authoritative key when matching a played card to a hand entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: u64,
    pub kind: CardKind,
    pub color: CardColor,
}

impl Card {
    /// Placement rule: equal color, equal kind, or either card is wild-class.
    pub fn matches(&self, other: &Card) -> bool {
        self.color == other.color
            || self.kind == other.kind
            || self.kind.is_wild()
            || other.kind.is_wild()
    }
}
