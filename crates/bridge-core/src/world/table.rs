use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::engine_state as es;
use super::{
    Area, BOSS_REROLL_COST, BlindBoard, BlindObject, BlindState, CardObject, CardSet, Economy,
    HandLevel, PlayedHand, Progress, Rank, RoundStatus, Simulation, TagObject,
};

const FINAL_ANTE: i64 = 8;

/// In-memory table that implements [`Simulation`] over plain data.
///
/// Mechanics are crude: enough for the bridge to observe phase changes after each
/// dispatched action, and loadable from a JSON scenario for offline runs against a live decision
/// service. It does not score hands beyond base chip values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TableSim {
    pub engine_state: u32,
    pub events_pending: bool,
    pub frame_complete: bool,
    pub economy: Economy,
    pub progress: Progress,
    pub round: RoundStatus,
    pub hand_size: usize,
    pub hand: Vec<CardObject>,
    pub deck: Vec<CardObject>,
    pub discard_pile: Vec<CardObject>,
    pub jokers: Vec<CardObject>,
    pub consumables: Vec<CardObject>,
    pub shop_cards: Vec<CardObject>,
    pub shop_boosters: Vec<CardObject>,
    pub shop_vouchers: Vec<CardObject>,
    pub pack_choices: Vec<CardObject>,
    pub pack_picks_left: u32,
    pub hand_levels: Vec<HandLevel>,
    pub tags: Vec<TagObject>,
    pub vouchers: Vec<String>,
    pub blinds: BlindBoard,
    pub played_hands: Vec<PlayedHand>,
    pub best_hand: i64,
    /// Consumable keys that act on highlighted hand cards, with the most cards they accept.
    pub targeted: BTreeMap<String, usize>,
    #[serde(skip)]
    pub captures: Vec<PathBuf>,
    /// Mutation entry points in call order.
    #[serde(skip)]
    pub journal: Vec<String>,
}

impl Default for TableSim {
    fn default() -> Self {
        Self {
            engine_state: es::MENU,
            events_pending: false,
            frame_complete: true,
            economy: Economy {
                dollars: 4,
                bankrupt_at: 0,
                max_jokers: 5,
                max_consumables: 2,
            },
            progress: Progress {
                ante: 1,
                round: 0,
                ..Progress::default()
            },
            round: RoundStatus {
                hands_left: 4,
                discards_left: 3,
                reroll_cost: 5,
                ..RoundStatus::default()
            },
            hand_size: 8,
            hand: Vec::new(),
            deck: Vec::new(),
            discard_pile: Vec::new(),
            jokers: Vec::new(),
            consumables: Vec::new(),
            shop_cards: Vec::new(),
            shop_boosters: Vec::new(),
            shop_vouchers: Vec::new(),
            pack_choices: Vec::new(),
            pack_picks_left: 0,
            hand_levels: Vec::new(),
            tags: Vec::new(),
            vouchers: Vec::new(),
            blinds: BlindBoard::default(),
            played_hands: Vec::new(),
            best_hand: 0,
            targeted: BTreeMap::new(),
            captures: Vec::new(),
            journal: Vec::new(),
        }
    }
}

fn base_chips(card: &CardObject) -> i64 {
    match card.base.map(|b| b.rank) {
        Some(Rank::Two) => 2,
        Some(Rank::Three) => 3,
        Some(Rank::Four) => 4,
        Some(Rank::Five) => 5,
        Some(Rank::Six) => 6,
        Some(Rank::Seven) => 7,
        Some(Rank::Eight) => 8,
        Some(Rank::Nine) => 9,
        Some(Rank::Ten | Rank::Jack | Rank::Queen | Rank::King) => 10,
        Some(Rank::Ace) => 11,
        None => 0,
    }
}

fn pack_state_for(key: &str) -> u32 {
    if key.contains("arcana") {
        es::TAROT_PACK
    } else if key.contains("celestial") {
        es::PLANET_PACK
    } else if key.contains("spectral") {
        es::SPECTRAL_PACK
    } else if key.contains("buffoon") {
        es::BUFFOON_PACK
    } else {
        es::STANDARD_PACK
    }
}

impl TableSim {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario at {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse scenario at {}", path.display()))
    }

    fn area_ref(&self, area: Area) -> &Vec<CardObject> {
        match area {
            Area::Hand => &self.hand,
            Area::Deck => &self.deck,
            Area::Jokers => &self.jokers,
            Area::Consumables => &self.consumables,
            Area::ShopCards => &self.shop_cards,
            Area::ShopBoosters => &self.shop_boosters,
            Area::ShopVouchers => &self.shop_vouchers,
            Area::PackChoices => &self.pack_choices,
        }
    }

    fn area_mut(&mut self, area: Area) -> &mut Vec<CardObject> {
        match area {
            Area::Hand => &mut self.hand,
            Area::Deck => &mut self.deck,
            Area::Jokers => &mut self.jokers,
            Area::Consumables => &mut self.consumables,
            Area::ShopCards => &mut self.shop_cards,
            Area::ShopBoosters => &mut self.shop_boosters,
            Area::ShopVouchers => &mut self.shop_vouchers,
            Area::PackChoices => &mut self.pack_choices,
        }
    }

    fn take(&mut self, area: Area, index: usize) -> Option<CardObject> {
        let cards = self.area_mut(area);
        (index < cards.len()).then(|| cards.remove(index))
    }

    fn pay(&mut self, card: &CardObject) {
        self.economy.dollars -= card.cost.unwrap_or(0);
    }

    fn place_acquired(&mut self, mut card: CardObject) {
        card.highlighted = false;
        match card.set {
            CardSet::Joker => self.jokers.push(card),
            set if set.is_consumable() => self.consumables.push(card),
            set if set.is_playing_card() => self.deck.push(card),
            _ => {}
        }
    }

    fn highlighted_in_hand(&self) -> usize {
        self.hand.iter().filter(|c| c.highlighted).count()
    }

    fn blind_on_deck(&mut self) -> Option<&mut BlindObject> {
        let BlindBoard { small, big, boss } = &mut self.blinds;
        [small, big, boss]
            .into_iter()
            .find(|b| matches!(b.state, BlindState::Select | BlindState::Current))
    }

    fn promote_next_blind(&mut self) {
        let BlindBoard { small, big, boss } = &mut self.blinds;
        if let Some(next) = [small, big, boss]
            .into_iter()
            .find(|b| b.state == BlindState::Upcoming)
        {
            next.state = BlindState::Select;
        }
    }

    fn draw_to_hand(&mut self) {
        while self.hand.len() < self.hand_size && !self.deck.is_empty() {
            let card = self.deck.remove(0);
            self.hand.push(card);
        }
    }

    fn close_pack(&mut self) {
        self.pack_choices.clear();
        self.pack_picks_left = 0;
        self.clear_highlights(Area::Hand);
        self.engine_state = es::SHOP;
    }

    /// Advances transitional phases the way the engine does once their animations finish.
    pub fn settle(&mut self) {
        if self.events_pending {
            return;
        }
        match self.engine_state {
            es::HAND_PLAYED => {
                let target = self.blind_on_deck().map(|b| b.chips_needed);
                if target.is_some_and(|needed| self.round.chips >= needed) {
                    self.engine_state = es::ROUND_EVAL;
                } else if self.round.hands_left == 0 {
                    self.engine_state = es::GAME_OVER;
                } else {
                    self.engine_state = es::DRAW_TO_HAND;
                }
            }
            es::DRAW_TO_HAND => {
                self.draw_to_hand();
                self.engine_state = es::SELECTING_HAND;
            }
            es::NEW_ROUND => self.engine_state = es::ROUND_EVAL,
            _ => {}
        }
    }
}

impl Simulation for TableSim {
    fn engine_state(&self) -> u32 {
        self.engine_state
    }

    fn events_pending(&self) -> bool {
        self.events_pending
    }

    fn frame_complete(&self) -> bool {
        self.frame_complete
    }

    fn economy(&self) -> Economy {
        self.economy.clone()
    }

    fn progress(&self) -> Progress {
        self.progress.clone()
    }

    fn round_status(&self) -> RoundStatus {
        self.round.clone()
    }

    fn cards(&self, area: Area) -> &[CardObject] {
        self.area_ref(area)
    }

    fn hand_levels(&self) -> &[HandLevel] {
        &self.hand_levels
    }

    fn tags(&self) -> &[TagObject] {
        &self.tags
    }

    fn owned_vouchers(&self) -> &[String] {
        &self.vouchers
    }

    fn blinds(&self) -> &BlindBoard {
        &self.blinds
    }

    fn played_hands(&self) -> &[PlayedHand] {
        &self.played_hands
    }

    fn best_hand(&self) -> i64 {
        self.best_hand
    }

    fn can_use(&self, area: Area, index: usize) -> bool {
        let Some(card) = self.area_ref(area).get(index) else {
            return false;
        };
        if !card.set.is_consumable() {
            return false;
        }
        match self.targeted.get(&card.key) {
            Some(max) => (1..=*max).contains(&self.highlighted_in_hand()),
            None => true,
        }
    }

    fn highlight(&mut self, area: Area, index: usize) {
        if let Some(card) = self.area_mut(area).get_mut(index) {
            card.highlighted = true;
        }
    }

    fn clear_highlights(&mut self, area: Area) {
        for card in self.area_mut(area).iter_mut() {
            card.highlighted = false;
        }
    }

    fn play_highlighted(&mut self) {
        let (played, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.hand).into_iter().partition(|c| c.highlighted);
        self.hand = kept;
        let chips: i64 = played.iter().map(base_chips).sum();
        self.round.chips += chips;
        self.best_hand = self.best_hand.max(chips);
        self.round.hands_left = self.round.hands_left.saturating_sub(1);
        self.progress.hands_played += 1;
        self.journal.push(format!("play {}", played.len()));
        self.discard_pile.extend(played.into_iter().map(|mut c| {
            c.highlighted = false;
            c
        }));
        self.engine_state = es::HAND_PLAYED;
    }

    fn discard_highlighted(&mut self) {
        let (discarded, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.hand).into_iter().partition(|c| c.highlighted);
        self.hand = kept;
        self.round.discards_left = self.round.discards_left.saturating_sub(1);
        self.journal.push(format!("discard {}", discarded.len()));
        self.discard_pile.extend(discarded.into_iter().map(|mut c| {
            c.highlighted = false;
            c
        }));
        self.engine_state = es::DRAW_TO_HAND;
    }

    fn buy(&mut self, area: Area, index: usize) {
        let Some(card) = self.take(area, index) else {
            return;
        };
        self.pay(&card);
        self.journal.push(format!("buy {} {}", area, card.key));
        match area {
            Area::ShopBoosters => {
                self.engine_state = pack_state_for(&card.key);
                self.pack_picks_left = 1;
            }
            Area::ShopVouchers => self.vouchers.push(card.key),
            _ => self.place_acquired(card),
        }
    }

    fn buy_and_use(&mut self, index: usize) {
        if let Some(card) = self.take(Area::ShopCards, index) {
            self.pay(&card);
            self.journal.push(format!("buy_and_use {}", card.key));
        }
    }

    fn use_consumable(&mut self, index: usize) {
        if let Some(card) = self.take(Area::Consumables, index) {
            self.journal.push(format!("use {}", card.key));
        }
        self.clear_highlights(Area::Hand);
    }

    fn select_pack_choice(&mut self, index: usize) {
        let Some(card) = self.take(Area::PackChoices, index) else {
            return;
        };
        self.journal.push(format!("select {}", card.key));
        if !card.set.is_consumable() {
            self.place_acquired(card);
        }
        self.clear_highlights(Area::Hand);
        self.pack_picks_left = self.pack_picks_left.saturating_sub(1);
        if self.pack_picks_left == 0 {
            self.close_pack();
        }
    }

    fn sell(&mut self, area: Area, index: usize) {
        if let Some(card) = self.take(area, index) {
            self.economy.dollars += card.sell_value.unwrap_or(0);
            self.journal.push(format!("sell {} {}", area, card.key));
        }
    }

    fn reorder(&mut self, area: Area, order: &[usize]) {
        let mut slots: Vec<Option<CardObject>> =
            std::mem::take(self.area_mut(area)).into_iter().map(Some).collect();
        let mut reordered: Vec<CardObject> = order
            .iter()
            .filter_map(|&i| slots.get_mut(i).and_then(Option::take))
            .collect();
        // Never lose cards on a malformed order.
        reordered.extend(slots.into_iter().flatten());
        *self.area_mut(area) = reordered;
        self.journal.push(format!("reorder {area}"));
    }

    fn reroll_shop(&mut self) {
        self.economy.dollars -= self.round.reroll_cost;
        self.round.reroll_cost += 1;
        if !self.shop_cards.is_empty() {
            self.shop_cards.rotate_left(1);
        }
        self.journal.push("reroll_shop".to_string());
    }

    fn reroll_boss(&mut self) {
        self.economy.dollars -= BOSS_REROLL_COST;
        self.round.boss_rerolled_this_ante = true;
        self.journal.push("reroll_boss".to_string());
    }

    fn skip_booster(&mut self) {
        self.journal.push("skip_booster".to_string());
        self.close_pack();
    }

    fn select_blind(&mut self) {
        if let Some(blind) = self.blind_on_deck() {
            blind.state = BlindState::Current;
        }
        self.round.chips = 0;
        self.journal.push("select_blind".to_string());
        self.draw_to_hand();
        self.engine_state = es::SELECTING_HAND;
    }

    fn skip_blind(&mut self) {
        if let Some(blind) = self.blind_on_deck() {
            blind.state = BlindState::Skipped;
        }
        self.promote_next_blind();
        self.journal.push("skip_blind".to_string());
    }

    fn end_shop(&mut self) {
        self.journal.push("end_shop".to_string());
        self.engine_state = es::BLIND_SELECT;
    }

    fn cash_out(&mut self) {
        let boss_beaten = self.blinds.boss.state == BlindState::Current;
        if let Some(blind) = self.blind_on_deck() {
            blind.state = BlindState::Defeated;
            let reward = blind.reward;
            self.economy.dollars += reward;
        }
        self.promote_next_blind();
        if boss_beaten && self.progress.ante >= FINAL_ANTE {
            self.progress.won = true;
        }
        self.progress.round += 1;
        self.round.chips = 0;
        let hand = std::mem::take(&mut self.hand);
        self.deck.extend(hand);
        self.deck.append(&mut self.discard_pile);
        self.journal.push("cash_out".to_string());
        self.engine_state = es::SHOP;
    }

    fn capture_frame(&mut self, path: &Path) {
        self.captures.push(path.to_path_buf());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Suit;

    fn table_with_hand(n: u64) -> TableSim {
        let ranks = [Rank::Two, Rank::Five, Rank::Nine, Rank::King, Rank::Ace];
        TableSim {
            engine_state: es::SELECTING_HAND,
            hand: (0..n)
                .map(|i| CardObject::playing(i + 1, ranks[i as usize % ranks.len()], Suit::Hearts))
                .collect(),
            ..TableSim::default()
        }
    }

    #[test]
    fn play_moves_highlighted_cards_and_leaves_selecting_hand() {
        let mut sim = table_with_hand(5);
        sim.highlight(Area::Hand, 0);
        sim.highlight(Area::Hand, 3);
        sim.play_highlighted();

        assert_eq!(sim.engine_state, es::HAND_PLAYED);
        assert_eq!(sim.hand.len(), 3);
        assert_eq!(sim.round.chips, 12);
        assert_eq!(sim.round.hands_left, 3);
        assert_eq!(sim.journal, vec!["play 2".to_string()]);
    }

    #[test]
    fn reorder_keeps_every_card_even_for_short_orders() {
        let mut sim = table_with_hand(3);
        sim.reorder(Area::Hand, &[2]);
        let ids: Vec<u64> = sim.hand.iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn buying_a_joker_pays_and_places_it() {
        let mut sim = TableSim {
            engine_state: es::SHOP,
            ..TableSim::default()
        };
        let mut joker = CardObject::new(9, CardSet::Joker, "j_joker", "Joker");
        joker.cost = Some(3);
        sim.shop_cards.push(joker);

        sim.buy(Area::ShopCards, 0);
        assert_eq!(sim.economy.dollars, 1);
        assert_eq!(sim.jokers.len(), 1);
        assert!(sim.shop_cards.is_empty());
    }

    #[test]
    fn targeted_consumables_need_highlighted_cards() {
        let mut sim = table_with_hand(2);
        sim.consumables
            .push(CardObject::new(7, CardSet::Tarot, "c_magician", "The Magician"));
        sim.targeted.insert("c_magician".to_string(), 2);

        assert!(!sim.can_use(Area::Consumables, 0));
        sim.highlight(Area::Hand, 1);
        assert!(sim.can_use(Area::Consumables, 0));
    }

    #[test]
    fn settle_draws_back_to_selecting_hand() {
        let mut sim = table_with_hand(2);
        sim.deck.push(CardObject::playing(50, Rank::Ten, Suit::Spades));
        sim.highlight(Area::Hand, 0);
        sim.discard_highlighted();
        assert_eq!(sim.engine_state, es::DRAW_TO_HAND);

        sim.settle();
        assert_eq!(sim.engine_state, es::SELECTING_HAND);
        assert_eq!(sim.hand.len(), 2);
    }
}
