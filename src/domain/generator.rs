// Replenishing random card source. This is not a depleting deck: every draw
// samples the mode's preset composition independently, with replacement.

use crate::domain::card::{Card, CardColor};
use crate::domain::mode::GameMode;
use rand::Rng;

#[derive(Debug)]
pub struct CardGenerator {
    mode: GameMode,
    next_id: u64,
}

impl CardGenerator {
    pub fn new(mode: GameMode) -> Self {
        Self { mode, next_id: 1 }
    }

    /// Draws `n` cards uniformly from the flattened (color, kind) pairs of
    /// the mode's presets. A color that appears in several presets
    /// contributes more pairs and is proportionally more likely for any
    /// given kind; this unnormalized skew is intentional and keeps numbered
    /// cards more common than specials.
    pub fn generate(&mut self, n: usize) -> Vec<Card> {
        let pairs: Vec<_> = self
            .mode
            .presets()
            .iter()
            .flat_map(|preset| {
                preset
                    .colors
                    .iter()
                    .flat_map(|color| preset.kinds.iter().map(move |kind| (*color, *kind)))
            })
            .collect();

        let mut rng = rand::thread_rng();
        (0..n)
            .map(|_| {
                let (color, kind) = pairs[rng.gen_range(0..pairs.len())];
                let id = self.next_id;
                self.next_id += 1;
                Card { id, kind, color }
            })
            .collect()
    }

    /// Deduplicated union of colors across the mode's presets, excluding
    /// black so a random-color effect always resolves to a playable color.
    pub fn all_colors(&self) -> Vec<CardColor> {
        let mut colors = Vec::new();
        for preset in self.mode.presets() {
            for color in preset.colors {
                if *color != CardColor::Black && !colors.contains(color) {
                    colors.push(*color);
                }
            }
        }
        colors
    }
}
