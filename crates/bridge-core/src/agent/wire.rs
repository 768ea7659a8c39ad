use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A decision fetched from the decision service. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Decision {
    pub action: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub positions: Vec<i64>,
}

impl Decision {
    pub fn new(action: impl Into<String>, positions: impl Into<Vec<i64>>) -> Self {
        Self {
            action: action.into(),
            positions: positions.into(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<i64>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `GET /action`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PollResponse {
    Pending,
    Ready(Decision),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Play,
    Discard,
    BuyCard,
    BuyBooster,
    BuyVoucher,
    BuyAndUseConsumable,
    Select,
    UseConsumable,
    SellJoker,
    SellConsumable,
    RerollShop,
    RerollBoss,
    SkipBooster,
    SkipRound,
    RoundSelect,
    PlayRound,
    RearrangeHand,
    RearrangeJokers,
    Invalid,
}

impl ActionKind {
    pub const ALL: [ActionKind; 19] = [
        ActionKind::Play,
        ActionKind::Discard,
        ActionKind::BuyCard,
        ActionKind::BuyBooster,
        ActionKind::BuyVoucher,
        ActionKind::BuyAndUseConsumable,
        ActionKind::Select,
        ActionKind::UseConsumable,
        ActionKind::SellJoker,
        ActionKind::SellConsumable,
        ActionKind::RerollShop,
        ActionKind::RerollBoss,
        ActionKind::SkipBooster,
        ActionKind::SkipRound,
        ActionKind::RoundSelect,
        ActionKind::PlayRound,
        ActionKind::RearrangeHand,
        ActionKind::RearrangeJokers,
        ActionKind::Invalid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Play => "play",
            ActionKind::Discard => "discard",
            ActionKind::BuyCard => "buy_card",
            ActionKind::BuyBooster => "buy_booster",
            ActionKind::BuyVoucher => "buy_voucher",
            ActionKind::BuyAndUseConsumable => "buy_and_use_consumable",
            ActionKind::Select => "select",
            ActionKind::UseConsumable => "use_consumable",
            ActionKind::SellJoker => "sell_joker",
            ActionKind::SellConsumable => "sell_consumable",
            ActionKind::RerollShop => "reroll_shop",
            ActionKind::RerollBoss => "reroll_boss",
            ActionKind::SkipBooster => "skip_booster",
            ActionKind::SkipRound => "skip_round",
            ActionKind::RoundSelect => "round_select",
            ActionKind::PlayRound => "play_round",
            ActionKind::RearrangeHand => "rearrange_hand",
            ActionKind::RearrangeJokers => "rearrange_jokers",
            ActionKind::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action tag: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for ActionKind {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}
