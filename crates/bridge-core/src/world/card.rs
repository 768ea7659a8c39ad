use serde::{Deserialize, Serialize};

use super::description::DescriptionGraph;

/// Engine sort id. Stable for the lifetime of a card object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct CardId(pub u64);

/// The engine's `ability.set` for a card. Serialized names are what the decision service keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum CardSet {
    Default,
    Enhanced,
    #[serde(rename = "joker")]
    Joker,
    Tarot,
    Planet,
    Spectral,
    Voucher,
    Booster,
}

impl CardSet {
    pub fn is_consumable(self) -> bool {
        matches!(self, CardSet::Tarot | CardSet::Planet | CardSet::Spectral)
    }

    pub fn is_playing_card(self) -> bool {
        matches!(self, CardSet::Default | CardSet::Enhanced)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    #[default]
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Rank {
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub fn name(self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "Jack",
            Rank::Queen => "Queen",
            Rank::King => "King",
            Rank::Ace => "Ace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Suit {
    Spades,
    Hearts,
    Clubs,
    Diamonds,
}

impl Suit {
    pub fn name(self) -> &'static str {
        match self {
            Suit::Spades => "Spades",
            Suit::Hearts => "Hearts",
            Suit::Clubs => "Clubs",
            Suit::Diamonds => "Diamonds",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlayingCardBase {
    pub rank: Rank,
    pub suit: Suit,
}

/// A card-like engine object as read from any card area (hand, jokers, shop, pack, ...).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CardObject {
    pub id: CardId,
    pub set: CardSet,
    /// Center key, e.g. `j_blueprint`, `m_stone`, `c_base`.
    pub key: String,
    /// Generic label from the center definition.
    pub label: String,
    #[serde(default)]
    pub base: Option<PlayingCardBase>,
    #[serde(default)]
    pub main_text: DescriptionGraph,
    #[serde(default)]
    pub info_text: DescriptionGraph,
    #[serde(default)]
    pub edition: Option<String>,
    #[serde(default)]
    pub enhancement: Option<String>,
    #[serde(default)]
    pub seal: Option<String>,
    #[serde(default)]
    pub cost: Option<i64>,
    #[serde(default)]
    pub sell_value: Option<i64>,
    #[serde(default)]
    pub eternal: bool,
    #[serde(default)]
    pub facing: Facing,
    #[serde(default)]
    pub rarity: Option<u8>,
    /// Engine's compatibility status text. Only set for copy-style jokers.
    #[serde(default)]
    pub copy_compatible: Option<String>,
    #[serde(default)]
    pub highlighted: bool,
}

impl CardObject {
    pub fn new(id: u64, set: CardSet, key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: CardId(id),
            set,
            key: key.into(),
            label: label.into(),
            base: None,
            main_text: DescriptionGraph::default(),
            info_text: DescriptionGraph::default(),
            edition: None,
            enhancement: None,
            seal: None,
            cost: None,
            sell_value: None,
            eternal: false,
            facing: Facing::Front,
            rarity: None,
            copy_compatible: None,
            highlighted: false,
        }
    }

    pub fn playing(id: u64, rank: Rank, suit: Suit) -> Self {
        let mut card = Self::new(id, CardSet::Default, "c_base", "Base Card");
        card.base = Some(PlayingCardBase { rank, suit });
        card
    }

    /// Negative editions add their own slot, so they never count against capacity.
    pub fn is_negative(&self) -> bool {
        self.edition
            .as_deref()
            .map(|e| e.eq_ignore_ascii_case("negative"))
            .unwrap_or(false)
    }
}
