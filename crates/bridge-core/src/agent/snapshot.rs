use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::world::engine_state as es;
use crate::world::{BlindState, CardSet, Facing, PlayedHand};

/// Phases the decision service understands. Anything else is not published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    SelectingHand,
    Shop,
    PlayTarotCard,
    HandResolved,
    DrawToHand,
    NewRound,
    BlindSelect,
    RoundEval,
    TarotPack,
    SpectralPack,
    StandardPack,
    BuffoonPack,
    PlanetPack,
    GameOver,
    Menu,
}

impl Phase {
    pub fn from_engine_state(id: u32) -> Option<Phase> {
        let phase = match id {
            es::SELECTING_HAND => Phase::SelectingHand,
            es::HAND_PLAYED => Phase::HandResolved,
            es::DRAW_TO_HAND => Phase::DrawToHand,
            es::GAME_OVER => Phase::GameOver,
            es::SHOP => Phase::Shop,
            es::PLAY_TAROT => Phase::PlayTarotCard,
            es::BLIND_SELECT => Phase::BlindSelect,
            es::ROUND_EVAL => Phase::RoundEval,
            es::TAROT_PACK => Phase::TarotPack,
            es::PLANET_PACK => Phase::PlanetPack,
            es::MENU => Phase::Menu,
            es::SPECTRAL_PACK => Phase::SpectralPack,
            es::STANDARD_PACK => Phase::StandardPack,
            es::BUFFOON_PACK => Phase::BuffoonPack,
            es::NEW_ROUND => Phase::NewRound,
            _ => return None,
        };
        Some(phase)
    }

    /// Wire tag written into `state`.
    pub fn tag(self) -> &'static str {
        match self {
            Phase::SelectingHand => "SELECTING_HAND",
            Phase::Shop => "SHOP",
            Phase::PlayTarotCard => "PLAY_TAROT",
            Phase::HandResolved => "HAND_PLAYED",
            Phase::DrawToHand => "DRAW_TO_HAND",
            Phase::NewRound => "NEW_ROUND",
            Phase::BlindSelect => "BLIND_SELECT",
            Phase::RoundEval => "ROUND_EVAL",
            Phase::TarotPack => "TAROT_PACK",
            Phase::SpectralPack => "SPECTRAL_PACK",
            Phase::StandardPack => "STANDARD_PACK",
            Phase::BuffoonPack => "BUFFOON_PACK",
            Phase::PlanetPack => "PLANET_PACK",
            Phase::GameOver => "GAME_OVER",
            Phase::Menu => "MENU",
        }
    }

    pub fn is_pack(self) -> bool {
        matches!(
            self,
            Phase::TarotPack
                | Phase::SpectralPack
                | Phase::StandardPack
                | Phase::BuffoonPack
                | Phase::PlanetPack
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// The last rejected decision, echoed back so the decision service can correct itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FailedAction {
    pub action: String,
    #[serde(default)]
    pub positions: Vec<i64>,
    pub reason: String,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CardDoc {
    #[serde(rename = "type")]
    pub kind: CardSet,
    pub name: String,
    pub main_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhancement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sells_for: Option<i64>,
    /// Eternal cards cannot be sold or destroyed.
    #[serde(default, skip_serializing_if = "is_false")]
    pub eternal: bool,
    pub facing: Facing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_compatible: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HandLevelDoc {
    pub level: i64,
    pub chips: i64,
    pub mult: i64,
    pub times_played: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TagDoc {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlindDoc {
    pub state: BlindState,
    pub chips_needed: i64,
    pub reward: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boss_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlindInfo {
    #[serde(rename = "Small")]
    pub small: BlindDoc,
    #[serde(rename = "Big")]
    pub big: BlindDoc,
    #[serde(rename = "Boss")]
    pub boss: BlindDoc,
}

/// Fields every document carries, whatever the phase.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CommonSection {
    pub dollars: i64,
    pub bankrupt_at: i64,
    pub max_jokers: usize,
    #[serde(rename = "max_consumeables")]
    pub max_consumables: usize,
    pub ante: i64,
    pub round_number: i64,
    pub hands_played: i64,
    pub seed: String,
    pub jokers: Vec<CardDoc>,
    #[serde(rename = "consumeables")]
    pub consumables: Vec<CardDoc>,
    pub deck: Vec<CardDoc>,
    pub hand_levels: BTreeMap<String, HandLevelDoc>,
    pub tags: Vec<TagDoc>,
    pub owned_vouchers: Vec<String>,
    pub can_reroll_boss: bool,
    pub played_hands: Vec<PlayedHand>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SelectingHandSection {
    pub hand: Vec<CardDoc>,
    pub hands_left: u32,
    pub discards_left: u32,
    pub blind_info: BlindInfo,
    pub chips: i64,
    /// 1-based position in `hand`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_card_index: Option<usize>,
    pub boss_blind_disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ShopSection {
    pub shop_cards: Vec<CardDoc>,
    pub shop_boosters: Vec<CardDoc>,
    pub shop_vouchers: Vec<CardDoc>,
    pub reroll_cost: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BlindSelectSection {
    pub blind_info: BlindInfo,
}

/// Packs whose choices may target hand cards also show the hand.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TargetingPackSection {
    pub pack_choices: Vec<CardDoc>,
    pub hand: Vec<CardDoc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PackSection {
    pub pack_choices: Vec<CardDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GameOverSection {
    pub best_hand: i64,
    pub final_ante: i64,
    pub final_round: i64,
}

/// Phase-conditional part of a document. The `state` tag alone decides which fields exist.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "state")]
pub enum PhaseSection {
    #[serde(rename = "SELECTING_HAND")]
    SelectingHand(SelectingHandSection),
    #[serde(rename = "SHOP")]
    Shop(ShopSection),
    #[serde(rename = "PLAY_TAROT")]
    PlayTarotCard,
    #[serde(rename = "HAND_PLAYED")]
    HandResolved,
    #[serde(rename = "DRAW_TO_HAND")]
    DrawToHand,
    #[serde(rename = "NEW_ROUND")]
    NewRound,
    #[serde(rename = "BLIND_SELECT")]
    BlindSelect(BlindSelectSection),
    #[serde(rename = "ROUND_EVAL")]
    RoundEval,
    #[serde(rename = "TAROT_PACK")]
    TarotPack(TargetingPackSection),
    #[serde(rename = "SPECTRAL_PACK")]
    SpectralPack(TargetingPackSection),
    #[serde(rename = "STANDARD_PACK")]
    StandardPack(PackSection),
    #[serde(rename = "BUFFOON_PACK")]
    BuffoonPack(PackSection),
    #[serde(rename = "PLANET_PACK")]
    PlanetPack(PackSection),
    #[serde(rename = "GAME_OVER")]
    GameOver(GameOverSection),
    #[serde(rename = "MENU")]
    Menu,
}

impl PhaseSection {
    pub fn phase(&self) -> Phase {
        match self {
            PhaseSection::SelectingHand(_) => Phase::SelectingHand,
            PhaseSection::Shop(_) => Phase::Shop,
            PhaseSection::PlayTarotCard => Phase::PlayTarotCard,
            PhaseSection::HandResolved => Phase::HandResolved,
            PhaseSection::DrawToHand => Phase::DrawToHand,
            PhaseSection::NewRound => Phase::NewRound,
            PhaseSection::BlindSelect(_) => Phase::BlindSelect,
            PhaseSection::RoundEval => Phase::RoundEval,
            PhaseSection::TarotPack(_) => Phase::TarotPack,
            PhaseSection::SpectralPack(_) => Phase::SpectralPack,
            PhaseSection::StandardPack(_) => Phase::StandardPack,
            PhaseSection::BuffoonPack(_) => Phase::BuffoonPack,
            PhaseSection::PlanetPack(_) => Phase::PlanetPack,
            PhaseSection::GameOver(_) => Phase::GameOver,
            PhaseSection::Menu => Phase::Menu,
        }
    }
}

/// One published view of the game.
///
/// Rebuilt from scratch on every publish cycle. Two documents are the same snapshot iff they
/// compare equal, which is what publish deduplication relies on.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SnapshotDocument {
    #[serde(flatten)]
    pub common: CommonSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_action: Option<FailedAction>,
    #[serde(flatten)]
    pub phase: PhaseSection,
}

impl SnapshotDocument {
    pub fn phase(&self) -> Phase {
        self.phase.phase()
    }
}
