//! Engine object model as seen by the bridge.
//!
//! The bridge never owns game objects. It reads and mutates them only through [`Simulation`],
//! which the engine host implements (or [`table::TableSim`] for tests and offline replays).

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub mod card;
pub mod description;
pub mod engine_state;
pub mod table;

pub use card::{CardId, CardObject, CardSet, Facing, PlayingCardBase, Rank, Suit};
pub use description::{DescNode, DescriptionGraph, NodeId};

/// Flat price of a boss reroll.
pub const BOSS_REROLL_COST: i64 = 10;

/// Engine card containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    Hand,
    Deck,
    Jokers,
    Consumables,
    ShopCards,
    ShopBoosters,
    ShopVouchers,
    PackChoices,
}

impl Area {
    pub fn label(self) -> &'static str {
        match self {
            Area::Hand => "hand",
            Area::Deck => "deck",
            Area::Jokers => "joker",
            Area::Consumables => "consumable",
            Area::ShopCards => "shop",
            Area::ShopBoosters => "booster",
            Area::ShopVouchers => "voucher",
            Area::PackChoices => "pack",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Economy {
    pub dollars: i64,
    /// Money may go down to this floor (negative with debt-granting effects).
    #[serde(default)]
    pub bankrupt_at: i64,
    pub max_jokers: usize,
    pub max_consumables: usize,
}

impl Economy {
    pub fn spendable(&self) -> i64 {
        self.dollars - self.bankrupt_at
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Progress {
    pub ante: i64,
    pub round: i64,
    /// Total hands played this run.
    #[serde(default)]
    pub hands_played: i64,
    #[serde(default)]
    pub seed: String,
    #[serde(default)]
    pub won: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct RoundStatus {
    pub hands_left: u32,
    pub discards_left: u32,
    /// Chips scored so far against the current blind.
    #[serde(default)]
    pub chips: i64,
    /// Card an active boss effect forces into every selection.
    #[serde(default)]
    pub forced_card: Option<CardId>,
    #[serde(default)]
    pub boss_disabled: bool,
    #[serde(default)]
    pub reroll_cost: i64,
    #[serde(default)]
    pub boss_rerolled_this_ante: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HandLevel {
    pub name: String,
    pub level: i64,
    pub chips: i64,
    pub mult: i64,
    #[serde(default)]
    pub times_played: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TagObject {
    pub name: String,
    #[serde(default)]
    pub description: DescriptionGraph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum BlindState {
    Select,
    #[default]
    Upcoming,
    Current,
    Skipped,
    Defeated,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct BlindObject {
    #[serde(default)]
    pub state: BlindState,
    pub chips_needed: i64,
    pub reward: i64,
    #[serde(default)]
    pub skip_tag: Option<TagObject>,
    /// Localized template lines; `#1#` stands for the most played hand.
    #[serde(default)]
    pub boss_text: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct BlindBoard {
    pub small: BlindObject,
    pub big: BlindObject,
    pub boss: BlindObject,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlayedHand {
    pub hand_name: String,
    pub chips_earned: i64,
    pub ante: i64,
    pub blind: String,
}

/// Accessor contract between the bridge and the running game.
///
/// Indices are zero-based positions into the named [`Area`]. Mutation entry points assume the
/// caller already validated the index; they mirror the engine's own button callbacks.
pub trait Simulation {
    /// Raw engine phase id (`G.STATE`).
    fn engine_state(&self) -> u32;
    /// True while blocking animations or queued events are still running.
    fn events_pending(&self) -> bool;
    /// True once the engine finished its per-frame work for the current phase.
    fn frame_complete(&self) -> bool;

    fn economy(&self) -> Economy;
    fn progress(&self) -> Progress;
    fn round_status(&self) -> RoundStatus;
    fn cards(&self, area: Area) -> &[CardObject];
    /// Poker hand levels in engine order.
    fn hand_levels(&self) -> &[HandLevel];
    fn tags(&self) -> &[TagObject];
    fn owned_vouchers(&self) -> &[String];
    fn blinds(&self) -> &BlindBoard;
    fn played_hands(&self) -> &[PlayedHand];
    fn best_hand(&self) -> i64;

    /// The engine's own usability predicate for a consumable, given current highlights.
    fn can_use(&self, area: Area, index: usize) -> bool;

    fn highlight(&mut self, area: Area, index: usize);
    fn clear_highlights(&mut self, area: Area);
    fn play_highlighted(&mut self);
    fn discard_highlighted(&mut self);
    fn buy(&mut self, area: Area, index: usize);
    fn buy_and_use(&mut self, index: usize);
    fn use_consumable(&mut self, index: usize);
    fn select_pack_choice(&mut self, index: usize);
    fn sell(&mut self, area: Area, index: usize);
    /// Replaces the whole order of `area`; `order[i]` is the old index of the card placed at `i`.
    fn reorder(&mut self, area: Area, order: &[usize]);
    fn reroll_shop(&mut self);
    fn reroll_boss(&mut self);
    fn skip_booster(&mut self);
    fn select_blind(&mut self);
    fn skip_blind(&mut self);
    fn end_shop(&mut self);
    fn cash_out(&mut self);

    /// Queues a screenshot of the current frame. The file is written at end of frame.
    fn capture_frame(&mut self, path: &Path);
}
