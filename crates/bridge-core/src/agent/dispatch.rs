use std::collections::HashSet;

use thiserror::Error;

use crate::agent::encoder::{can_reroll_boss, card_name};
use crate::agent::snapshot::{FailedAction, Phase};
use crate::agent::wire::{ActionKind, Decision};
use crate::world::{Area, BOSS_REROLL_COST, BlindState, CardObject, CardSet, Simulation};

/// Most cards a hand may play or discard at once.
pub const MAX_SELECTED: usize = 5;

/// Why a decision was rejected. The `Display` text is the `reason` the decision service sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("Action {action} is not available during {phase}")]
    NotAvailable { action: ActionKind, phase: String },
    #[error("Action {action} needs a position")]
    MissingPosition { action: ActionKind },
    #[error("No card at {area} position {position}")]
    NoCard { area: Area, position: i64 },
    #[error("Must select between 1 and 5 cards, got {count}")]
    CardCount { count: usize },
    #[error("Position {0} is listed more than once")]
    DuplicatePosition(i64),
    #[error("No hands left")]
    NoHandsLeft,
    #[error("No discards left")]
    NoDiscardsLeft,
    #[error("Selection must include the forced card at hand position {position}")]
    ForcedCardMissing { position: usize },
    #[error("Cannot afford: costs ${cost}, only ${available} available")]
    CannotAfford { cost: i64, available: i64 },
    #[error("No free joker slot")]
    NoJokerSlot,
    #[error("No free consumable slot")]
    NoConsumableSlot,
    #[error("{name} cannot be used right now")]
    NotUsable { name: String },
    #[error("{name} is not a consumable")]
    NotConsumable { name: String },
    #[error("{name} is eternal and cannot be sold")]
    Eternal { name: String },
    #[error("The boss blind cannot be skipped")]
    BossSkip,
    #[error("Boss blind cannot be rerolled")]
    BossRerollUnavailable,
    #[error("Rearrange must list every position from 1 to {len} exactly once")]
    NotPermutation { len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied,
    Failed(FailedAction),
    /// The decision service asked to see the current state again.
    Resend,
}

/// Which actions the decision service may issue in a phase.
pub fn available_in(kind: ActionKind, phase: Phase) -> bool {
    match kind {
        ActionKind::Invalid
        | ActionKind::UseConsumable
        | ActionKind::SellConsumable
        | ActionKind::SellJoker
        | ActionKind::RearrangeJokers => true,
        ActionKind::PlayRound | ActionKind::SkipRound | ActionKind::RerollBoss => {
            phase == Phase::BlindSelect
        }
        ActionKind::BuyCard
        | ActionKind::BuyBooster
        | ActionKind::BuyVoucher
        | ActionKind::BuyAndUseConsumable
        | ActionKind::RoundSelect
        | ActionKind::RerollShop => phase == Phase::Shop,
        ActionKind::Select | ActionKind::SkipBooster => phase.is_pack(),
        ActionKind::Play | ActionKind::Discard => phase == Phase::SelectingHand,
        ActionKind::RearrangeHand => matches!(
            phase,
            Phase::SelectingHand | Phase::TarotPack | Phase::SpectralPack
        ),
    }
}

/// Validates decisions against the live game and applies them through the engine's own entry
/// points.
#[derive(Debug, Default)]
pub struct Dispatcher {
    last_failure: Option<FailedAction>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// The failure to attach to the next published document, if any.
    pub fn last_failure(&self) -> Option<&FailedAction> {
        self.last_failure.as_ref()
    }

    /// Applies one decision. Never panics; every rejection becomes `Failed`.
    pub fn apply(&mut self, decision: &Decision, sim: &mut dyn Simulation) -> DispatchOutcome {
        self.last_failure = None;
        match try_apply(decision, sim) {
            Ok(outcome) => {
                tracing::info!(
                    target: "bridge.dispatch",
                    action = %decision.action,
                    positions = ?decision.positions,
                    outcome = ?outcome,
                    "decision applied"
                );
                outcome
            }
            Err(err) => {
                let failed = FailedAction {
                    action: decision.action.clone(),
                    positions: decision.positions.clone(),
                    reason: err.to_string(),
                };
                tracing::warn!(
                    target: "bridge.dispatch",
                    action = %decision.action,
                    positions = ?decision.positions,
                    reason = %failed.reason,
                    "decision rejected"
                );
                self.last_failure = Some(failed.clone());
                DispatchOutcome::Failed(failed)
            }
        }
    }
}

fn try_apply(
    decision: &Decision,
    sim: &mut dyn Simulation,
) -> Result<DispatchOutcome, DispatchError> {
    let kind: ActionKind = decision
        .action
        .parse()
        .map_err(|_| DispatchError::UnknownAction(decision.action.clone()))?;
    if kind == ActionKind::Invalid {
        return Ok(DispatchOutcome::Resend);
    }

    let phase = Phase::from_engine_state(sim.engine_state());
    if !phase.is_some_and(|phase| available_in(kind, phase)) {
        return Err(DispatchError::NotAvailable {
            action: kind,
            phase: phase.map_or_else(|| "an unknown phase".to_string(), |p| p.to_string()),
        });
    }

    let positions = decision.positions.as_slice();
    match kind {
        ActionKind::Play => {
            let indices = hand_selection(&*sim, positions)?;
            if sim.round_status().hands_left == 0 {
                return Err(DispatchError::NoHandsLeft);
            }
            ensure_forced_included(&*sim, &indices)?;
            highlight_hand(sim, &indices);
            sim.play_highlighted();
        }
        ActionKind::Discard => {
            let indices = hand_selection(&*sim, positions)?;
            if sim.round_status().discards_left == 0 {
                return Err(DispatchError::NoDiscardsLeft);
            }
            ensure_forced_included(&*sim, &indices)?;
            highlight_hand(sim, &indices);
            sim.discard_highlighted();
        }
        ActionKind::BuyCard => {
            let index = single_slot(&*sim, kind, Area::ShopCards, positions)?;
            let card = &sim.cards(Area::ShopCards)[index];
            ensure_affordable(&*sim, card.cost.unwrap_or(0))?;
            ensure_room_for(&*sim, card)?;
            sim.buy(Area::ShopCards, index);
        }
        ActionKind::BuyBooster => {
            let index = single_slot(&*sim, kind, Area::ShopBoosters, positions)?;
            ensure_affordable(&*sim, sim.cards(Area::ShopBoosters)[index].cost.unwrap_or(0))?;
            sim.buy(Area::ShopBoosters, index);
        }
        ActionKind::BuyVoucher => {
            let index = single_slot(&*sim, kind, Area::ShopVouchers, positions)?;
            ensure_affordable(&*sim, sim.cards(Area::ShopVouchers)[index].cost.unwrap_or(0))?;
            sim.buy(Area::ShopVouchers, index);
        }
        ActionKind::BuyAndUseConsumable => {
            let index = single_slot(&*sim, kind, Area::ShopCards, positions)?;
            let card = &sim.cards(Area::ShopCards)[index];
            if !card.set.is_consumable() {
                return Err(DispatchError::NotConsumable {
                    name: card_name(card),
                });
            }
            ensure_affordable(&*sim, card.cost.unwrap_or(0))?;
            if !sim.can_use(Area::ShopCards, index) {
                return Err(DispatchError::NotUsable {
                    name: card_name(card),
                });
            }
            sim.buy_and_use(index);
        }
        ActionKind::Select => {
            let (index, targets) = slot_with_targets(&*sim, kind, Area::PackChoices, positions)?;
            if sim.cards(Area::PackChoices)[index].set.is_consumable() {
                ensure_usable_with(sim, Area::PackChoices, index, &targets)?;
            } else {
                ensure_room_for(&*sim, &sim.cards(Area::PackChoices)[index])?;
            }
            sim.select_pack_choice(index);
        }
        ActionKind::UseConsumable => {
            let (index, targets) = slot_with_targets(&*sim, kind, Area::Consumables, positions)?;
            ensure_usable_with(sim, Area::Consumables, index, &targets)?;
            sim.use_consumable(index);
        }
        ActionKind::SellJoker => {
            let index = single_slot(&*sim, kind, Area::Jokers, positions)?;
            let card = &sim.cards(Area::Jokers)[index];
            if card.eternal {
                return Err(DispatchError::Eternal {
                    name: card_name(card),
                });
            }
            sim.sell(Area::Jokers, index);
        }
        ActionKind::SellConsumable => {
            let index = single_slot(&*sim, kind, Area::Consumables, positions)?;
            sim.sell(Area::Consumables, index);
        }
        ActionKind::RerollShop => {
            ensure_affordable(&*sim, sim.round_status().reroll_cost)?;
            sim.reroll_shop();
        }
        ActionKind::RerollBoss => {
            if !can_reroll_boss(&*sim) {
                return Err(DispatchError::BossRerollUnavailable);
            }
            ensure_affordable(&*sim, BOSS_REROLL_COST)?;
            sim.reroll_boss();
        }
        ActionKind::SkipBooster => sim.skip_booster(),
        ActionKind::SkipRound => {
            if sim.blinds().boss.state == BlindState::Select {
                return Err(DispatchError::BossSkip);
            }
            sim.skip_blind();
        }
        ActionKind::RoundSelect => sim.end_shop(),
        ActionKind::PlayRound => sim.select_blind(),
        ActionKind::RearrangeHand => {
            let order = permutation(&*sim, Area::Hand, positions)?;
            sim.reorder(Area::Hand, &order);
        }
        ActionKind::RearrangeJokers => {
            let order = permutation(&*sim, Area::Jokers, positions)?;
            sim.reorder(Area::Jokers, &order);
        }
        ActionKind::Invalid => return Ok(DispatchOutcome::Resend),
    }
    Ok(DispatchOutcome::Applied)
}

/// Maps a 1-based position to an index into `area`.
fn slot(sim: &dyn Simulation, area: Area, position: i64) -> Result<usize, DispatchError> {
    let len = sim.cards(area).len();
    usize::try_from(position)
        .ok()
        .filter(|p| (1..=len).contains(p))
        .map(|p| p - 1)
        .ok_or(DispatchError::NoCard { area, position })
}

fn slots(sim: &dyn Simulation, area: Area, positions: &[i64]) -> Result<Vec<usize>, DispatchError> {
    positions.iter().map(|p| slot(sim, area, *p)).collect()
}

/// Single-slot actions use the first position; extras are ignored.
fn single_slot(
    sim: &dyn Simulation,
    kind: ActionKind,
    area: Area,
    positions: &[i64],
) -> Result<usize, DispatchError> {
    let first = positions
        .first()
        .ok_or(DispatchError::MissingPosition { action: kind })?;
    slot(sim, area, *first)
}

/// First position names the card in `area`, the rest name supporting hand cards.
fn slot_with_targets(
    sim: &dyn Simulation,
    kind: ActionKind,
    area: Area,
    positions: &[i64],
) -> Result<(usize, Vec<usize>), DispatchError> {
    let index = single_slot(sim, kind, area, positions)?;
    let targets = slots(sim, Area::Hand, &positions[1..])?;
    Ok((index, targets))
}

fn hand_selection(sim: &dyn Simulation, positions: &[i64]) -> Result<Vec<usize>, DispatchError> {
    let indices = slots(sim, Area::Hand, positions)?;
    let mut seen = HashSet::new();
    for (index, position) in indices.iter().zip(positions) {
        if !seen.insert(*index) {
            return Err(DispatchError::DuplicatePosition(*position));
        }
    }
    if !(1..=MAX_SELECTED).contains(&indices.len()) {
        return Err(DispatchError::CardCount {
            count: indices.len(),
        });
    }
    Ok(indices)
}

fn ensure_forced_included(sim: &dyn Simulation, indices: &[usize]) -> Result<(), DispatchError> {
    let Some(forced) = sim.round_status().forced_card else {
        return Ok(());
    };
    let Some(forced_index) = sim.cards(Area::Hand).iter().position(|c| c.id == forced) else {
        return Ok(());
    };
    if indices.contains(&forced_index) {
        Ok(())
    } else {
        Err(DispatchError::ForcedCardMissing {
            position: forced_index + 1,
        })
    }
}

fn ensure_affordable(sim: &dyn Simulation, cost: i64) -> Result<(), DispatchError> {
    let available = sim.economy().spendable();
    if cost > available {
        return Err(DispatchError::CannotAfford { cost, available });
    }
    Ok(())
}

/// Negative editions bring their own slot.
fn ensure_room_for(sim: &dyn Simulation, card: &CardObject) -> Result<(), DispatchError> {
    if card.is_negative() {
        return Ok(());
    }
    let economy = sim.economy();
    match card.set {
        CardSet::Joker if sim.cards(Area::Jokers).len() >= economy.max_jokers => {
            Err(DispatchError::NoJokerSlot)
        }
        set if set.is_consumable()
            && sim.cards(Area::Consumables).len() >= economy.max_consumables =>
        {
            Err(DispatchError::NoConsumableSlot)
        }
        _ => Ok(()),
    }
}

fn highlight_hand(sim: &mut dyn Simulation, indices: &[usize]) {
    sim.clear_highlights(Area::Hand);
    for index in indices {
        sim.highlight(Area::Hand, *index);
    }
}

/// Highlights the supporting hand cards, then asks the engine whether the card is usable.
fn ensure_usable_with(
    sim: &mut dyn Simulation,
    area: Area,
    index: usize,
    targets: &[usize],
) -> Result<(), DispatchError> {
    highlight_hand(sim, targets);
    if sim.can_use(area, index) {
        return Ok(());
    }
    sim.clear_highlights(Area::Hand);
    Err(DispatchError::NotUsable {
        name: card_name(&sim.cards(area)[index]),
    })
}

/// Rearranges must name every card exactly once.
fn permutation(sim: &dyn Simulation, area: Area, positions: &[i64]) -> Result<Vec<usize>, DispatchError> {
    let order = slots(sim, area, positions)?;
    let len = sim.cards(area).len();
    let distinct: HashSet<usize> = order.iter().copied().collect();
    if order.len() != len || distinct.len() != len {
        return Err(DispatchError::NotPermutation { len });
    }
    Ok(order)
}
