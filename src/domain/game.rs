// The per-lobby turn/state engine. Every operation is a synchronous
// mutation; outbound events are queued and drained by the session actor, so
// the rules never touch sockets or channels.

use crate::domain::card::{Card, CardColor, CardKind};
use crate::domain::events::{Envelope, OutboundEvent, PlayerSummary, Recipient};
use crate::domain::generator::CardGenerator;
use crate::domain::player::{Player, PlayerId};
use crate::domain::settings::{GameSettings, SettingsUpdate};
use rand::seq::SliceRandom;
use rand::Rng;

/// Derives the next active slot. Spectating members are transparent: a skip
/// step is consumed only by landing on a non-spectating member. Returns
/// `None` when no non-spectating member remains.
pub(crate) fn next_active_index(players: &[Player], from: usize, steps: usize) -> Option<usize> {
    if players.is_empty() || players.iter().all(|p| p.spectating) {
        return None;
    }
    let len = players.len();
    let mut idx = from.min(len - 1);
    for _ in 0..steps {
        idx = (idx + 1) % len;
        while players[idx].spectating {
            idx = (idx + 1) % len;
        }
    }
    Some(idx)
}

/// First non-spectating slot scanning forward from `from`, inclusive.
fn first_active_from(players: &[Player], from: usize) -> Option<usize> {
    let len = players.len();
    if len == 0 {
        return None;
    }
    (0..len)
        .map(|offset| (from + offset) % len)
        .find(|&idx| !players[idx].spectating)
}

pub struct Game {
    pub lobby_code: String,
    players: Vec<Player>,
    active: usize,
    top_card: Option<Card>,
    /// Accumulated forced-draw count; 1 is the baseline single draw.
    draw_amount: u32,
    started: bool,
    /// Non-spectating headcount at the last start, for the game-over rule.
    started_with: usize,
    admin: Option<PlayerId>,
    settings: GameSettings,
    /// Player holding an unresolved color wish.
    wishing: Option<PlayerId>,
    generator: Option<CardGenerator>,
    events: Vec<Envelope>,
}

impl Game {
    pub fn new(lobby_code: String) -> Self {
        Self {
            lobby_code,
            players: Vec::new(),
            active: 0,
            top_card: None,
            draw_amount: 1,
            started: false,
            started_with: 0,
            admin: None,
            settings: GameSettings::default(),
            wishing: None,
            generator: None,
            events: Vec::new(),
        }
    }

    /// Drains the queued outbound events.
    pub fn take_events(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn has_player(&self, id: &PlayerId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn started(&self) -> bool {
        self.started
    }

    fn emit(&mut self, to: Recipient, event: OutboundEvent) {
        self.events.push(Envelope { to, event });
    }

    fn emit_all(&mut self, event: OutboundEvent) {
        self.emit(Recipient::All, event);
    }

    fn emit_one(&mut self, id: PlayerId, event: OutboundEvent) {
        self.emit(Recipient::One(id), event);
    }

    fn index_of(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == id)
    }

    fn is_players_turn(&self, id: &PlayerId) -> bool {
        self.started && self.index_of(id) == Some(self.active)
    }

    fn summaries(&self) -> Vec<PlayerSummary> {
        self.players
            .iter()
            .enumerate()
            .map(|(idx, p)| PlayerSummary {
                username: p.username.clone(),
                player_id: p.id.clone(),
                hand_size: p.hand.len(),
                is_active_turn: self.started && idx == self.active,
                is_spectating: p.spectating,
            })
            .collect()
    }

    fn broadcast_playerlist(&mut self) {
        let list = self.summaries();
        self.emit_all(OutboundEvent::PlayerlistUpdated(list));
    }

    /// Adds a participant. Joins during a running round enter as spectators
    /// and are dealt in at the next start. The first member becomes admin.
    pub fn join(&mut self, username: String) -> PlayerId {
        let player = Player::new(username.clone(), self.started);
        let id = player.id.clone();
        self.players.push(player);

        self.emit_one(id.clone(), OutboundEvent::JoinedLobby { player_id: id.clone() });
        self.emit_all(OutboundEvent::PlayerJoined {
            username,
            player_id: id.clone(),
        });
        if self.admin.is_none() {
            self.admin = Some(id.clone());
            self.emit_all(OutboundEvent::AdminUpdated { player_id: id.clone() });
        }
        let settings = self.settings.clone();
        self.emit_one(id.clone(), OutboundEvent::SettingsChanged(settings));
        if self.started {
            self.resync_view(&id);
        }
        self.broadcast_playerlist();
        id
    }

    /// Replays the full visible state to one connection so a reconnecting
    /// (or late-joining) client can reconcile.
    pub fn resync(&mut self, id: &PlayerId) {
        if self.index_of(id).is_none() {
            return;
        }
        let settings = self.settings.clone();
        self.emit_one(id.clone(), OutboundEvent::SettingsChanged(settings));
        if let Some(admin) = self.admin.clone() {
            self.emit_one(id.clone(), OutboundEvent::AdminUpdated { player_id: admin });
        }
        self.resync_view(id);
        self.broadcast_playerlist();
    }

    fn resync_view(&mut self, id: &PlayerId) {
        let Some(idx) = self.index_of(id) else { return };
        let list = self.summaries();
        self.emit_one(id.clone(), OutboundEvent::PlayerlistUpdated(list));
        if !self.started {
            return;
        }
        if let Some(top) = self.top_card.clone() {
            self.emit_one(id.clone(), OutboundEvent::CardPlaced(top));
        }
        let amount = self.draw_amount;
        self.emit_one(id.clone(), OutboundEvent::DrawAmountUpdated(amount));
        let turn = self.players[self.active].id.clone();
        self.emit_one(id.clone(), OutboundEvent::TurnChanged { player_id: turn });
        let hand = self.players[idx].hand.clone();
        self.emit_one(id.clone(), OutboundEvent::HandUpdated(hand));
        if self.wishing.as_ref() == Some(id) {
            self.emit_one(id.clone(), OutboundEvent::ColorWishPrompt);
        }
    }

    /// Removes a participant. A pending wish by the leaver is forfeited and
    /// the turn is rotated off them before removal.
    pub fn leave(&mut self, id: &PlayerId) {
        let Some(idx) = self.index_of(id) else { return };
        if self.wishing.as_ref() == Some(id) {
            self.wishing = None;
        }

        let was_active = self.started && idx == self.active;
        let player = self.players.remove(idx);
        self.emit_all(OutboundEvent::PlayerLeft {
            player_id: player.id,
        });

        if self.admin.as_ref() == Some(id) {
            self.admin = self.players.first().map(|p| p.id.clone());
            if let Some(admin) = self.admin.clone() {
                self.emit_all(OutboundEvent::AdminUpdated { player_id: admin });
            }
        }

        if self.players.is_empty() {
            // Nobody left to notify; the registry destroys the lobby.
            self.reset_round_state();
            return;
        }

        if self.started {
            if idx < self.active {
                self.active -= 1;
            } else if was_active {
                // The slot now holds the roster successor; land on the next
                // non-spectating member from there.
                let from = if self.active >= self.players.len() { 0 } else { self.active };
                match first_active_from(&self.players, from) {
                    Some(next) => {
                        self.active = next;
                        let turn = self.players[next].id.clone();
                        self.emit_all(OutboundEvent::TurnChanged { player_id: turn });
                    }
                    None => {
                        self.game_over();
                        return;
                    }
                }
            }
            // Stale index guard after the roster shrink.
            if self.active >= self.players.len() {
                self.active = first_active_from(&self.players, 0).unwrap_or(0);
            }
        }
        self.broadcast_playerlist();
    }

    /// Admin-only settings change, accepted only before a round starts.
    pub fn update_settings(&mut self, id: &PlayerId, update: &SettingsUpdate) {
        if self.started || self.admin.as_ref() != Some(id) {
            return;
        }
        if self.settings.apply(update) {
            let settings = self.settings.clone();
            self.emit_all(OutboundEvent::SettingsChanged(settings));
        }
    }

    /// Starts a round: admin-only, valid only while waiting. Deals every
    /// member back in, places the initial top card and hands the turn to
    /// slot 0.
    pub fn start(&mut self, id: &PlayerId) {
        if self.started || self.admin.as_ref() != Some(id) || self.players.is_empty() {
            return;
        }
        let mut generator = CardGenerator::new(self.settings.mode());
        let amount = self.settings.card_amount();
        for player in &mut self.players {
            player.spectating = false;
            player.hand = generator.generate(amount);
        }
        let Some(top) = generator.generate(1).into_iter().next() else {
            return;
        };
        self.top_card = Some(top.clone());
        self.generator = Some(generator);
        self.started = true;
        self.started_with = self.players.len();
        self.draw_amount = 1;
        self.wishing = None;
        self.active = 0;

        self.emit_all(OutboundEvent::GameStarted);
        let hands: Vec<(PlayerId, Vec<Card>)> = self
            .players
            .iter()
            .map(|p| (p.id.clone(), p.hand.clone()))
            .collect();
        for (player_id, hand) in hands {
            self.emit_one(player_id, OutboundEvent::HandUpdated(hand));
        }
        self.emit_all(OutboundEvent::CardPlaced(top));
        self.emit_all(OutboundEvent::DrawAmountUpdated(1));
        let turn = self.players[0].id.clone();
        self.emit_all(OutboundEvent::TurnChanged { player_id: turn });
        self.broadcast_playerlist();
    }

    /// Card-play legality and effect dispatch. The card id is the
    /// authoritative key; illegal attempts are silent no-ops.
    pub fn place_card(&mut self, id: &PlayerId, card_id: u64) {
        if !self.is_players_turn(id) {
            return;
        }
        if self.wishing.is_some() {
            return;
        }
        let idx = self.active;
        let Some(pos) = self.players[idx].hand.iter().position(|c| c.id == card_id) else {
            return;
        };
        let card = self.players[idx].hand[pos].clone();
        let Some(top) = &self.top_card else { return };
        if !top.matches(&card) {
            return;
        }
        if self.draw_amount > 1 && !card.kind.is_draw() {
            return;
        }

        self.players[idx].hand.remove(pos);
        self.top_card = Some(card.clone());
        self.emit_all(OutboundEvent::CardPlaced(card.clone()));
        let hand = self.players[idx].hand.clone();
        self.emit_one(id.clone(), OutboundEvent::HandUpdated(hand));

        self.resolve_effect(idx, &card);
        if self.started {
            self.broadcast_playerlist();
        }
    }

    fn resolve_effect(&mut self, actor: usize, card: &Card) {
        match card.kind {
            CardKind::Draw4 => {
                self.add_draw_amount(4);
                self.enter_wishing(actor);
            }
            CardKind::Wish => {
                self.enter_wishing(actor);
            }
            CardKind::Draw2 => {
                self.add_draw_amount(2);
                self.finish_turn(actor, 1);
            }
            CardKind::Skip => {
                self.finish_turn(actor, 2);
            }
            CardKind::Reverse => {
                // Reversing the roster changes which physical slot the
                // current player occupies; recompute before advancing.
                self.players.reverse();
                self.active = self.players.len() - 1 - self.active;
                self.finish_turn(self.active, 1);
            }
            CardKind::Redistribute => {
                self.redistribute_hands();
                self.finish_turn(actor, 1);
            }
            CardKind::Cycle => {
                self.cycle_hands();
                self.finish_turn(actor, 1);
            }
            CardKind::RandomColor => {
                self.resolve_random_color();
                self.finish_turn(actor, 1);
            }
            CardKind::Number(_) => {
                self.finish_turn(actor, 1);
            }
        }
    }

    fn enter_wishing(&mut self, actor: usize) {
        let id = self.players[actor].id.clone();
        self.wishing = Some(id.clone());
        // The turn is held until the wish resolves.
        self.emit_one(id, OutboundEvent::ColorWishPrompt);
    }

    fn add_draw_amount(&mut self, n: u32) {
        self.draw_amount = if self.draw_amount <= 1 {
            n
        } else {
            self.draw_amount + n
        };
        let amount = self.draw_amount;
        self.emit_all(OutboundEvent::DrawAmountUpdated(amount));
    }

    fn redistribute_hands(&mut self) {
        let mut pool: Vec<Card> = Vec::new();
        for player in &mut self.players {
            if !player.spectating {
                pool.append(&mut player.hand);
            }
        }
        pool.shuffle(&mut rand::thread_rng());

        let targets: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.spectating)
            .map(|(idx, _)| idx)
            .collect();
        for (turn, card) in pool.into_iter().enumerate() {
            let idx = targets[turn % targets.len()];
            self.players[idx].hand.push(card);
        }
        self.push_active_hands();
    }

    fn cycle_hands(&mut self) {
        // Ownership rotates by one position: the last active player's hand
        // feeds the first. Spectators hold no cards and are skipped.
        let targets: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.spectating)
            .map(|(idx, _)| idx)
            .collect();
        if targets.len() < 2 {
            return;
        }
        let last = targets[targets.len() - 1];
        let mut carried = std::mem::take(&mut self.players[last].hand);
        for &idx in &targets {
            carried = std::mem::replace(&mut self.players[idx].hand, carried);
        }
        self.push_active_hands();
    }

    fn resolve_random_color(&mut self) {
        let Some(generator) = &self.generator else { return };
        let colors = generator.all_colors();
        let color = colors[rand::thread_rng().gen_range(0..colors.len())];
        if let Some(top) = &mut self.top_card {
            top.color = color;
        }
        self.emit_all(OutboundEvent::ColorUpdated(color));
    }

    fn push_active_hands(&mut self) {
        let hands: Vec<(PlayerId, Vec<Card>)> = self
            .players
            .iter()
            .filter(|p| !p.spectating)
            .map(|p| (p.id.clone(), p.hand.clone()))
            .collect();
        for (player_id, hand) in hands {
            self.emit_one(player_id, OutboundEvent::HandUpdated(hand));
        }
    }

    /// Elimination check, then the turn advance that ends an effect.
    fn finish_turn(&mut self, actor: usize, steps: usize) {
        if self.players[actor].hand.is_empty() {
            self.player_done(actor);
            if !self.started {
                return;
            }
        }
        self.advance(steps);
    }

    fn advance(&mut self, steps: usize) {
        match next_active_index(&self.players, self.active, steps) {
            Some(next) => {
                self.active = next;
                let turn = self.players[next].id.clone();
                self.emit_all(OutboundEvent::TurnChanged { player_id: turn });
            }
            None => self.game_over(),
        }
    }

    fn player_done(&mut self, idx: usize) {
        self.players[idx].spectating = true;
        let id = self.players[idx].id.clone();
        self.emit_all(OutboundEvent::PlayerDone { player_id: id });

        let remaining = self.players.iter().filter(|p| !p.spectating).count();
        if remaining == 0 || (self.started_with > 1 && remaining <= 1) {
            self.game_over();
        }
    }

    /// Draw request: takes the accumulated amount (baseline 1), resets the
    /// stack and passes the turn.
    pub fn draw_cards(&mut self, id: &PlayerId) {
        if !self.is_players_turn(id) || self.wishing.is_some() {
            return;
        }
        let amount = self.draw_amount.max(1) as usize;
        let Some(generator) = &mut self.generator else { return };
        let cards = generator.generate(amount);
        let idx = self.active;
        self.players[idx].hand.extend(cards);
        self.draw_amount = 1;

        self.emit_one(id.clone(), OutboundEvent::DrawRequestAck);
        self.emit_all(OutboundEvent::DrawAmountUpdated(1));
        let hand = self.players[idx].hand.clone();
        self.emit_one(id.clone(), OutboundEvent::HandUpdated(hand));
        self.advance(1);
        self.broadcast_playerlist();
    }

    /// Resolves a pending color wish. An absent color forfeits the wish and
    /// still advances the turn (the disconnect default); a color outside
    /// the mode's set is dropped and the wish stays pending.
    pub fn color_wished(&mut self, id: &PlayerId, color: Option<CardColor>) {
        if self.wishing.as_ref() != Some(id) || !self.is_players_turn(id) {
            return;
        }
        if let Some(color) = color {
            let valid = self
                .generator
                .as_ref()
                .is_some_and(|g| g.all_colors().contains(&color));
            if !valid {
                return;
            }
        }
        self.wishing = None;

        let actor = self.active;
        if self.players[actor].hand.is_empty() {
            self.player_done(actor);
            if !self.started {
                return;
            }
        }
        if let Some(color) = color {
            if let Some(top) = &mut self.top_card {
                top.color = color;
            }
            self.emit_all(OutboundEvent::ColorUpdated(color));
        }
        self.advance(1);
        self.broadcast_playerlist();
    }

    fn game_over(&mut self) {
        self.emit_all(OutboundEvent::GameOver);
        self.reset_round_state();
        let cleared: Vec<PlayerId> = self.players.iter().map(|p| p.id.clone()).collect();
        for player_id in cleared {
            self.emit_one(player_id, OutboundEvent::HandUpdated(Vec::new()));
        }
        self.broadcast_playerlist();
    }

    /// Mode cleanup: back to the waiting state, ready for a restart.
    fn reset_round_state(&mut self) {
        for player in &mut self.players {
            player.hand.clear();
        }
        self.started = false;
        self.wishing = None;
        self.draw_amount = 1;
        self.active = 0;
        self.top_card = None;
        self.generator = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::{Card, CardColor, CardKind};

    fn card(id: u64, kind: CardKind, color: CardColor) -> Card {
        Card { id, kind, color }
    }

    /// Dealt ids start at 1 and would alias the small literal ids the tests
    /// push into hands; move the dealt cards out of that range.
    fn offset_dealt_ids(game: &mut Game) {
        for player in &mut game.players {
            for card in &mut player.hand {
                card.id += 100_000;
            }
        }
    }

    /// Joins `n` players and starts a Classic round, then pins the top card
    /// and draw state so tests are deterministic.
    fn started_game(n: usize) -> (Game, Vec<PlayerId>) {
        let mut game = Game::new("TEST".to_string());
        let ids: Vec<PlayerId> = (0..n).map(|i| game.join(format!("player{i}"))).collect();
        game.start(&ids[0]);
        assert!(game.started());
        offset_dealt_ids(&mut game);
        game.top_card = Some(card(9000, CardKind::Number(5), CardColor::Red));
        game.draw_amount = 1;
        game.take_events();
        (game, ids)
    }

    fn hand_len(game: &Game, id: &PlayerId) -> usize {
        let idx = game.index_of(id).unwrap();
        game.players[idx].hand.len()
    }

    fn events_to_all(game: &mut Game) -> Vec<OutboundEvent> {
        game.take_events()
            .into_iter()
            .filter(|e| e.to == Recipient::All)
            .map(|e| e.event)
            .collect()
    }

    #[test]
    fn start_deals_hands_and_opens_turn() {
        let mut game = Game::new("TEST".to_string());
        let a = game.join("alice".to_string());
        let _b = game.join("bob".to_string());
        let c = game.join("carol".to_string());
        game.start(&c);
        assert!(!game.started(), "only the admin may start");
        game.start(&a);
        assert!(game.started());
        assert_eq!(game.active, 0);
        assert!(game.top_card.is_some());
        for player in &game.players {
            assert_eq!(player.hand.len(), 7);
            assert!(!player.spectating);
        }
        // A second start while running is ignored.
        let hands: Vec<usize> = game.players.iter().map(|p| p.hand.len()).collect();
        game.start(&a);
        let after: Vec<usize> = game.players.iter().map(|p| p.hand.len()).collect();
        assert_eq!(hands, after);
    }

    #[test]
    fn matching_color_updates_top_and_passes_turn() {
        let (mut game, ids) = started_game(3);
        let played = card(1, CardKind::Number(8), CardColor::Red);
        game.players[0].hand.push(played.clone());
        let before = hand_len(&game, &ids[0]);

        game.place_card(&ids[0], 1);
        assert_eq!(game.top_card.as_ref().unwrap().id, 1);
        assert_eq!(game.active, 1);
        assert_eq!(hand_len(&game, &ids[0]), before - 1);

        let events = events_to_all(&mut game);
        assert!(events
            .iter()
            .any(|e| matches!(e, OutboundEvent::CardPlaced(c) if c.id == 1)));
        assert!(events
            .iter()
            .any(|e| matches!(e, OutboundEvent::TurnChanged { player_id } if *player_id == ids[1])));
    }

    #[test]
    fn mismatched_card_is_rejected_without_mutation() {
        let (mut game, ids) = started_game(3);
        game.players[0].hand.push(card(1, CardKind::Number(8), CardColor::Blue));
        let before = hand_len(&game, &ids[0]);

        game.place_card(&ids[0], 1);
        assert_eq!(game.top_card.as_ref().unwrap().id, 9000);
        assert_eq!(game.active, 0);
        assert_eq!(hand_len(&game, &ids[0]), before);
    }

    #[test]
    fn out_of_turn_play_is_rejected() {
        let (mut game, ids) = started_game(3);
        game.players[1].hand.push(card(1, CardKind::Number(5), CardColor::Red));

        game.place_card(&ids[1], 1);
        assert_eq!(game.top_card.as_ref().unwrap().id, 9000);
        assert_eq!(game.active, 0);
    }

    #[test]
    fn replayed_placement_for_a_spent_card_is_a_no_op() {
        let (mut game, ids) = started_game(2);
        game.players[0].hand.push(card(1, CardKind::Number(5), CardColor::Blue));
        game.players[1].hand.push(card(2, CardKind::Number(5), CardColor::Green));
        game.place_card(&ids[0], 1);
        game.place_card(&ids[1], 2);
        assert_eq!(game.active, 0);

        // The card left player 0's hand already; re-delivery changes nothing.
        game.place_card(&ids[0], 1);
        assert_eq!(game.top_card.as_ref().unwrap().id, 2);
        assert_eq!(game.active, 0);
    }

    #[test]
    fn draw_two_stacks_and_forces_a_draw() {
        let (mut game, ids) = started_game(3);
        game.players[0].hand.push(card(1, CardKind::Draw2, CardColor::Red));
        game.players[1].hand.push(card(2, CardKind::Number(3), CardColor::Red));

        game.place_card(&ids[0], 1);
        assert_eq!(game.draw_amount, 2);
        assert_eq!(game.active, 1);

        // Player 2 holds no draw card; an unrelated play is rejected.
        let before = hand_len(&game, &ids[1]);
        game.place_card(&ids[1], 2);
        assert_eq!(game.active, 1);
        assert_eq!(hand_len(&game, &ids[1]), before);

        // Drawing takes the stacked amount and resets to baseline.
        game.draw_cards(&ids[1]);
        assert_eq!(hand_len(&game, &ids[1]), before + 2);
        assert_eq!(game.draw_amount, 1);
        assert_eq!(game.active, 2);
    }

    #[test]
    fn draw_cards_counter_stack_accumulates() {
        let (mut game, ids) = started_game(2);
        game.players[0].hand.push(card(1, CardKind::Draw2, CardColor::Red));
        game.players[1].hand.push(card(2, CardKind::Draw2, CardColor::Blue));

        game.place_card(&ids[0], 1);
        assert_eq!(game.draw_amount, 2);
        game.place_card(&ids[1], 2);
        assert_eq!(game.draw_amount, 4);
    }

    #[test]
    fn baseline_draw_takes_one_card() {
        let (mut game, ids) = started_game(2);
        let before = hand_len(&game, &ids[0]);
        game.draw_cards(&ids[0]);
        assert_eq!(hand_len(&game, &ids[0]), before + 1);
        assert_eq!(game.draw_amount, 1);
        assert_eq!(game.active, 1);
    }

    #[test]
    fn wild_holds_turn_until_wish_resolves() {
        let (mut game, ids) = started_game(3);
        game.players[0].hand.push(card(1, CardKind::Wish, CardColor::Black));

        game.place_card(&ids[0], 1);
        assert_eq!(game.active, 0, "turn must not advance while wishing");
        assert_eq!(game.wishing, Some(ids[0].clone()));

        // Other plays are blocked while the wish is outstanding.
        game.players[1].hand.push(card(2, CardKind::Number(5), CardColor::Red));
        game.place_card(&ids[1], 2);
        assert_eq!(game.top_card.as_ref().unwrap().id, 1);

        game.color_wished(&ids[0], Some(CardColor::Green));
        assert_eq!(game.wishing, None);
        assert_eq!(game.top_card.as_ref().unwrap().color, CardColor::Green);
        assert_eq!(game.active, 1);
    }

    #[test]
    fn wish_from_the_wrong_player_is_ignored() {
        let (mut game, ids) = started_game(3);
        game.players[0].hand.push(card(1, CardKind::Wish, CardColor::Black));
        game.place_card(&ids[0], 1);

        game.color_wished(&ids[1], Some(CardColor::Green));
        assert_eq!(game.wishing, Some(ids[0].clone()));
        assert_eq!(game.active, 0);
    }

    #[test]
    fn forfeited_wish_still_advances() {
        let (mut game, ids) = started_game(3);
        game.players[0].hand.push(card(1, CardKind::Wish, CardColor::Black));
        game.place_card(&ids[0], 1);

        game.color_wished(&ids[0], None);
        assert_eq!(game.wishing, None);
        assert_eq!(game.active, 1);
        // Top card color is untouched on a forfeit.
        assert_eq!(game.top_card.as_ref().unwrap().color, CardColor::Black);
    }

    #[test]
    fn invalid_wish_color_keeps_the_wish_pending() {
        let (mut game, ids) = started_game(2);
        game.players[0].hand.push(card(1, CardKind::Wish, CardColor::Black));
        game.place_card(&ids[0], 1);

        // Classic has no cyan, and black is never wishable.
        game.color_wished(&ids[0], Some(CardColor::Cyan));
        assert_eq!(game.wishing, Some(ids[0].clone()));
        game.color_wished(&ids[0], Some(CardColor::Black));
        assert_eq!(game.wishing, Some(ids[0].clone()));
    }

    #[test]
    fn draw_four_stacks_and_enters_wishing() {
        let (mut game, ids) = started_game(3);
        game.players[0].hand.push(card(1, CardKind::Draw4, CardColor::Black));

        game.place_card(&ids[0], 1);
        assert_eq!(game.draw_amount, 4);
        assert_eq!(game.wishing, Some(ids[0].clone()));
        assert_eq!(game.active, 0);

        game.color_wished(&ids[0], Some(CardColor::Blue));
        assert_eq!(game.active, 1);
        assert_eq!(game.draw_amount, 4, "stack survives the wish for the next player");
    }

    #[test]
    fn skip_advances_two() {
        let (mut game, ids) = started_game(3);
        game.players[0].hand.push(card(1, CardKind::Skip, CardColor::Red));
        game.place_card(&ids[0], 1);
        assert_eq!(game.active, 2);
        let _ = ids;
    }

    #[test]
    fn reverse_recomputes_the_active_index() {
        let (mut game, ids) = started_game(4);
        // Hand the turn to slot 1 first.
        game.players[0].hand.push(card(1, CardKind::Number(1), CardColor::Red));
        game.place_card(&ids[0], 1);
        assert_eq!(game.active, 1);

        game.players[1].hand.push(card(2, CardKind::Reverse, CardColor::Red));
        game.place_card(&ids[1], 2);

        // With N=4 and i=1 the reversal puts the actor at slot N-1-i = 2;
        // the follow-up advance lands on slot 3, the former slot 0.
        assert_eq!(game.active, 3);
        assert_eq!(game.players[3].id, ids[0]);
        assert_eq!(game.players[2].id, ids[1]);
    }

    #[test]
    fn redistribute_conserves_cards_and_balances_hands() {
        let (mut game, ids) = started_game(3);
        game.players[0].hand = vec![
            card(1, CardKind::Redistribute, CardColor::Red),
            card(10, CardKind::Number(1), CardColor::Red),
        ];
        game.players[1].hand = (20..27)
            .map(|i| card(i, CardKind::Number(2), CardColor::Blue))
            .collect();
        game.players[2].hand = (30..33)
            .map(|i| card(i, CardKind::Number(3), CardColor::Green))
            .collect();
        let total: usize = game.players.iter().map(|p| p.hand.len()).sum();

        game.place_card(&ids[0], 1);

        let after: usize = game.players.iter().map(|p| p.hand.len()).sum();
        assert_eq!(after, total - 1, "the played card left the pool");
        let sizes: Vec<usize> = game.players.iter().map(|p| p.hand.len()).collect();
        let max = sizes.iter().max().unwrap();
        let min = sizes.iter().min().unwrap();
        assert!(max - min <= 1, "hand sizes {sizes:?} differ by more than 1");
        assert_eq!(game.active, 1);
    }

    #[test]
    fn cycle_rotates_hand_ownership() {
        let (mut game, ids) = started_game(3);
        game.players[0].hand = vec![
            card(1, CardKind::Cycle, CardColor::Red),
            card(10, CardKind::Number(1), CardColor::Red),
        ];
        game.players[1].hand = vec![card(20, CardKind::Number(2), CardColor::Blue)];
        game.players[2].hand = vec![card(30, CardKind::Number(3), CardColor::Green)];

        game.place_card(&ids[0], 1);

        // Last hand feeds the first; everyone else takes their predecessor's.
        assert_eq!(game.players[0].hand[0].id, 30);
        assert_eq!(game.players[1].hand[0].id, 10);
        assert_eq!(game.players[2].hand[0].id, 20);
        assert_eq!(game.active, 1);
    }

    #[test]
    fn random_color_resolves_to_a_mode_color() {
        let mut game = Game::new("TEST".to_string());
        let a = game.join("alice".to_string());
        let b = game.join("bob".to_string());
        game.update_settings(
            &a,
            &SettingsUpdate {
                card_amount: None,
                game_mode: Some("Special".to_string()),
            },
        );
        game.start(&a);
        offset_dealt_ids(&mut game);
        game.top_card = Some(card(9000, CardKind::Number(5), CardColor::Red));
        game.take_events();

        game.players[0].hand.push(card(1, CardKind::RandomColor, CardColor::Black));
        game.place_card(&a, 1);

        let color = game.top_card.as_ref().unwrap().color;
        assert_ne!(color, CardColor::Black);
        assert_eq!(game.active, 1);
        let events = events_to_all(&mut game);
        assert!(events
            .iter()
            .any(|e| matches!(e, OutboundEvent::ColorUpdated(c) if *c == color)));
        let _ = b;
    }

    #[test]
    fn empty_hand_eliminates_and_spectator_is_skipped() {
        let (mut game, ids) = started_game(3);
        game.players[0].hand = vec![card(1, CardKind::Number(5), CardColor::Blue)];

        game.place_card(&ids[0], 1);

        assert!(game.players[0].spectating);
        assert!(game.started(), "two active players remain");
        assert_eq!(game.active, 1);

        let events = events_to_all(&mut game);
        assert!(events
            .iter()
            .any(|e| matches!(e, OutboundEvent::PlayerDone { player_id } if *player_id == ids[0])));

        // The spectator slot is transparent on the way back around.
        game.players[1].hand.push(card(3, CardKind::Number(7), CardColor::Blue));
        game.players[2].hand.push(card(2, CardKind::Number(7), CardColor::Green));
        game.place_card(&ids[1], 3);
        assert_eq!(game.active, 2);
        game.place_card(&ids[2], 2);
        assert_eq!(game.active, 1, "turn wraps past the spectator");
    }

    #[test]
    fn second_elimination_ends_the_game() {
        let (mut game, ids) = started_game(3);
        game.players[0].hand = vec![card(1, CardKind::Number(5), CardColor::Blue)];
        game.place_card(&ids[0], 1);

        game.players[1].hand = vec![card(2, CardKind::Number(5), CardColor::Green)];
        game.place_card(&ids[1], 2);

        assert!(!game.started());
        let events = events_to_all(&mut game);
        assert!(events.iter().any(|e| matches!(e, OutboundEvent::GameOver)));
        // Hands are cleared by the cleanup hook.
        assert!(game.players.iter().all(|p| p.hand.is_empty()));
    }

    #[test]
    fn skip_elimination_checks_before_advancing() {
        let (mut game, ids) = started_game(2);
        game.players[0].hand = vec![card(1, CardKind::Skip, CardColor::Red)];
        game.place_card(&ids[0], 1);
        // Last card was a skip in a two-player game: actor is done, game over.
        assert!(game.players[0].spectating);
        assert!(!game.started());
    }

    #[test]
    fn wish_elimination_resolves_on_color_choice() {
        let (mut game, ids) = started_game(3);
        game.players[0].hand = vec![card(1, CardKind::Wish, CardColor::Black)];
        game.place_card(&ids[0], 1);
        assert!(!game.players[0].spectating, "elimination waits for the wish");

        game.color_wished(&ids[0], Some(CardColor::Red));
        assert!(game.players[0].spectating);
        assert!(game.started(), "two players keep playing");
        assert_eq!(game.active, 1);
    }

    #[test]
    fn leave_rotates_turn_and_reassigns_admin() {
        let (mut game, ids) = started_game(3);
        assert_eq!(game.admin, Some(ids[0].clone()));

        game.leave(&ids[0]);
        assert_eq!(game.players.len(), 2);
        assert_eq!(game.admin, Some(ids[1].clone()));
        // The removed slot's successor takes the turn.
        assert_eq!(game.players[game.active].id, ids[1]);

        let events = events_to_all(&mut game);
        assert!(events
            .iter()
            .any(|e| matches!(e, OutboundEvent::PlayerLeft { player_id } if *player_id == ids[0])));
        assert!(events
            .iter()
            .any(|e| matches!(e, OutboundEvent::AdminUpdated { player_id } if *player_id == ids[1])));
    }

    #[test]
    fn leave_of_inactive_player_keeps_the_turn() {
        let (mut game, ids) = started_game(3);
        game.leave(&ids[2]);
        assert_eq!(game.players[game.active].id, ids[0]);
        assert!(game.started());
    }

    #[test]
    fn leaving_wishing_player_forfeits_the_wish() {
        let (mut game, ids) = started_game(3);
        game.players[0].hand.push(card(1, CardKind::Wish, CardColor::Black));
        game.place_card(&ids[0], 1);
        assert_eq!(game.wishing, Some(ids[0].clone()));

        game.leave(&ids[0]);
        assert_eq!(game.wishing, None);
        assert_eq!(game.players[game.active].id, ids[1]);
    }

    #[test]
    fn roster_empties_back_to_waiting() {
        let (mut game, ids) = started_game(2);
        game.leave(&ids[0]);
        game.leave(&ids[1]);
        assert!(game.is_empty());
        assert!(!game.started());
        assert_eq!(game.admin, None);
    }

    #[test]
    fn late_join_spectates_until_restart() {
        let (mut game, ids) = started_game(2);
        let late = game.join("dave".to_string());
        let idx = game.index_of(&late).unwrap();
        assert!(game.players[idx].spectating);

        // The running pair is unaffected.
        assert_eq!(game.players[game.active].id, ids[0]);

        // A restart deals the late joiner in.
        game.players[0].hand = vec![card(1, CardKind::Number(5), CardColor::Blue)];
        game.place_card(&ids[0], 1);
        assert!(!game.started());
        game.start(&ids[0]);
        let idx = game.index_of(&late).unwrap();
        assert!(!game.players[idx].spectating);
        assert_eq!(game.players[idx].hand.len(), 7);
    }

    #[test]
    fn settings_are_admin_only_and_locked_while_playing() {
        let mut game = Game::new("TEST".to_string());
        let a = game.join("alice".to_string());
        let b = game.join("bob".to_string());

        game.update_settings(
            &b,
            &SettingsUpdate {
                card_amount: Some("10".to_string()),
                game_mode: None,
            },
        );
        assert_eq!(game.settings.card_amount(), 7);

        game.update_settings(
            &a,
            &SettingsUpdate {
                card_amount: Some("10".to_string()),
                game_mode: None,
            },
        );
        assert_eq!(game.settings.card_amount(), 10);

        game.start(&a);
        game.update_settings(
            &a,
            &SettingsUpdate {
                card_amount: Some("5".to_string()),
                game_mode: None,
            },
        );
        assert_eq!(game.settings.card_amount(), 10);
    }

    #[test]
    fn next_active_index_treats_spectators_as_transparent() {
        let mut players: Vec<Player> = (0..4)
            .map(|i| Player::new(format!("p{i}"), false))
            .collect();
        players[1].spectating = true;

        assert_eq!(next_active_index(&players, 0, 1), Some(2));
        assert_eq!(next_active_index(&players, 0, 2), Some(3));
        assert_eq!(next_active_index(&players, 3, 1), Some(0));
        assert_eq!(next_active_index(&players, 2, 2), Some(0));

        for p in &mut players {
            p.spectating = true;
        }
        assert_eq!(next_active_index(&players, 0, 1), None);
    }

    #[test]
    fn active_index_always_addresses_a_non_spectator() {
        // Walk a few full rounds and check the invariant at every step.
        let (mut game, ids) = started_game(4);
        game.players[1].hand = vec![card(1, CardKind::Number(5), CardColor::Blue)];
        game.players[0].hand.push(card(2, CardKind::Number(5), CardColor::Green));
        game.place_card(&ids[0], 2);
        game.place_card(&ids[1], 1); // eliminates player 1

        for _ in 0..8 {
            assert!(game.started());
            assert!(!game.players[game.active].spectating);
            let turn = game.players[game.active].id.clone();
            game.draw_cards(&turn);
        }
    }
}
