use std::collections::BTreeMap;

use crate::agent::snapshot::{
    BlindDoc, BlindInfo, BlindSelectSection, CardDoc, CommonSection, FailedAction,
    GameOverSection, HandLevelDoc, PackSection, Phase, PhaseSection, SelectingHandSection,
    ShopSection, SnapshotDocument, TagDoc, TargetingPackSection,
};
use crate::agent::text::{collect_text, render_template};
use crate::world::{Area, BOSS_REROLL_COST, BlindObject, CardObject, Simulation};

const DEFAULT_MOST_PLAYED_HAND: &str = "High Card";

/// Keys whose display name does not follow the rank/suit or label rules.
fn special_name(key: &str) -> Option<&'static str> {
    match key {
        "m_stone" => Some("Stone Card"),
        _ => None,
    }
}

/// Builds the document for the engine's current phase.
///
/// Returns `None` when the raw engine phase is not one the decision service knows.
pub fn encode(sim: &dyn Simulation, failed: Option<&FailedAction>) -> Option<SnapshotDocument> {
    let phase = Phase::from_engine_state(sim.engine_state())?;
    Some(SnapshotDocument {
        common: encode_common(sim),
        failed_action: failed.cloned(),
        phase: encode_phase(phase, sim),
    })
}

fn encode_phase(phase: Phase, sim: &dyn Simulation) -> PhaseSection {
    match phase {
        Phase::SelectingHand => PhaseSection::SelectingHand(selecting_hand(sim)),
        Phase::Shop => PhaseSection::Shop(shop(sim)),
        Phase::PlayTarotCard => PhaseSection::PlayTarotCard,
        Phase::HandResolved => PhaseSection::HandResolved,
        Phase::DrawToHand => PhaseSection::DrawToHand,
        Phase::NewRound => PhaseSection::NewRound,
        Phase::BlindSelect => PhaseSection::BlindSelect(BlindSelectSection {
            blind_info: blind_info(sim),
        }),
        Phase::RoundEval => PhaseSection::RoundEval,
        Phase::TarotPack => PhaseSection::TarotPack(targeting_pack(sim)),
        Phase::SpectralPack => PhaseSection::SpectralPack(targeting_pack(sim)),
        Phase::StandardPack => PhaseSection::StandardPack(pack(sim)),
        Phase::BuffoonPack => PhaseSection::BuffoonPack(pack(sim)),
        Phase::PlanetPack => PhaseSection::PlanetPack(pack(sim)),
        Phase::GameOver => PhaseSection::GameOver(game_over(sim)),
        Phase::Menu => PhaseSection::Menu,
    }
}

fn encode_common(sim: &dyn Simulation) -> CommonSection {
    let economy = sim.economy();
    let progress = sim.progress();
    CommonSection {
        dollars: economy.dollars,
        bankrupt_at: economy.bankrupt_at,
        max_jokers: economy.max_jokers,
        max_consumables: economy.max_consumables,
        ante: progress.ante,
        round_number: progress.round,
        hands_played: progress.hands_played,
        seed: progress.seed,
        jokers: cards(sim, Area::Jokers),
        consumables: cards(sim, Area::Consumables),
        deck: cards(sim, Area::Deck),
        hand_levels: hand_levels(sim),
        tags: sim
            .tags()
            .iter()
            .map(|tag| TagDoc {
                name: tag.name.clone(),
                description: collect_text(&tag.description),
            })
            .collect(),
        owned_vouchers: sim.owned_vouchers().to_vec(),
        can_reroll_boss: can_reroll_boss(sim),
        played_hands: sim.played_hands().to_vec(),
    }
}

fn selecting_hand(sim: &dyn Simulation) -> SelectingHandSection {
    let round = sim.round_status();
    let hand = sim.cards(Area::Hand);
    let forced_card_index = round
        .forced_card
        .and_then(|id| hand.iter().position(|card| card.id == id))
        .map(|i| i + 1);
    SelectingHandSection {
        hand: hand.iter().map(card_doc).collect(),
        hands_left: round.hands_left,
        discards_left: round.discards_left,
        blind_info: blind_info(sim),
        chips: round.chips,
        forced_card_index,
        boss_blind_disabled: round.boss_disabled,
    }
}

fn shop(sim: &dyn Simulation) -> ShopSection {
    ShopSection {
        shop_cards: cards(sim, Area::ShopCards),
        shop_boosters: cards(sim, Area::ShopBoosters),
        shop_vouchers: cards(sim, Area::ShopVouchers),
        reroll_cost: sim.round_status().reroll_cost,
    }
}

fn targeting_pack(sim: &dyn Simulation) -> TargetingPackSection {
    TargetingPackSection {
        pack_choices: cards(sim, Area::PackChoices),
        hand: cards(sim, Area::Hand),
    }
}

fn pack(sim: &dyn Simulation) -> PackSection {
    PackSection {
        pack_choices: cards(sim, Area::PackChoices),
    }
}

fn game_over(sim: &dyn Simulation) -> GameOverSection {
    let progress = sim.progress();
    GameOverSection {
        best_hand: sim.best_hand(),
        final_ante: progress.ante,
        final_round: progress.round,
    }
}

fn cards(sim: &dyn Simulation, area: Area) -> Vec<CardDoc> {
    sim.cards(area).iter().map(card_doc).collect()
}

pub fn card_name(card: &CardObject) -> String {
    if let Some(name) = special_name(&card.key) {
        return name.to_string();
    }
    match card.base {
        Some(base) => format!("{} of {}", base.rank.name(), base.suit.name()),
        None => card.label.clone(),
    }
}

pub fn card_doc(card: &CardObject) -> CardDoc {
    let secondary = collect_text(&card.info_text);
    CardDoc {
        kind: card.set,
        name: card_name(card),
        main_description: collect_text(&card.main_text),
        secondary_description: (!secondary.is_empty()).then_some(secondary),
        edition: card.edition.clone(),
        enhancement: card.enhancement.clone(),
        seal: card.seal.clone(),
        cost: card.cost,
        sells_for: card.sell_value,
        eternal: card.eternal,
        facing: card.facing,
        rarity: card.rarity,
        copy_compatible: card.copy_compatible.clone(),
    }
}

fn hand_levels(sim: &dyn Simulation) -> BTreeMap<String, HandLevelDoc> {
    sim.hand_levels()
        .iter()
        .map(|level| {
            (
                level.name.clone(),
                HandLevelDoc {
                    level: level.level,
                    chips: level.chips,
                    mult: level.mult,
                    times_played: level.times_played,
                },
            )
        })
        .collect()
}

/// Hand with the highest play count; ties go to the earliest in engine order.
pub fn most_played_hand(sim: &dyn Simulation) -> String {
    let mut best: Option<(&str, i64)> = None;
    for level in sim.hand_levels() {
        if level.times_played <= 0 {
            continue;
        }
        if best.is_none_or(|(_, played)| level.times_played > played) {
            best = Some((level.name.as_str(), level.times_played));
        }
    }
    best.map(|(name, _)| name)
        .unwrap_or(DEFAULT_MOST_PLAYED_HAND)
        .to_string()
}

/// Whether the boss blind can be rerolled right now.
pub fn can_reroll_boss(sim: &dyn Simulation) -> bool {
    let vouchers = sim.owned_vouchers();
    let owns = |key: &str| vouchers.iter().any(|v| v == key);
    let voucher_allows = owns("v_retcon")
        || (owns("v_directors_cut") && !sim.round_status().boss_rerolled_this_ante);
    voucher_allows && sim.economy().spendable() >= BOSS_REROLL_COST
}

fn blind_info(sim: &dyn Simulation) -> BlindInfo {
    let board = sim.blinds();
    let boss_hand = most_played_hand(sim);
    BlindInfo {
        small: blind_doc(&board.small, None),
        big: blind_doc(&board.big, None),
        boss: blind_doc(&board.boss, Some(&boss_hand)),
    }
}

fn blind_doc(blind: &BlindObject, boss_hand: Option<&str>) -> BlindDoc {
    let boss_description = match boss_hand {
        Some(hand) if !blind.boss_text.is_empty() => Some(render_template(&blind.boss_text, &[hand])),
        _ => None,
    };
    BlindDoc {
        state: blind.state,
        chips_needed: blind.chips_needed,
        reward: blind.reward,
        tag: blind.skip_tag.as_ref().map(|tag| tag.name.clone()),
        tag_description: blind
            .skip_tag
            .as_ref()
            .map(|tag| collect_text(&tag.description)),
        boss_description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::engine_state as es;
    use crate::world::table::TableSim;
    use crate::world::{
        BlindState, CardId, CardSet, DescNode, DescriptionGraph, HandLevel, Rank, Suit,
        TagObject,
    };

    fn level(name: &str, times_played: i64) -> HandLevel {
        HandLevel {
            name: name.to_string(),
            level: 1,
            chips: 10,
            mult: 2,
            times_played,
        }
    }

    fn selecting_hand_table() -> TableSim {
        let mut sim = TableSim {
            engine_state: es::SELECTING_HAND,
            ..TableSim::default()
        };
        sim.hand = vec![
            CardObject::playing(11, Rank::Ace, Suit::Spades),
            CardObject::playing(12, Rank::Ten, Suit::Hearts),
            CardObject::playing(13, Rank::Four, Suit::Clubs),
        ];
        let mut joker = CardObject::new(20, CardSet::Joker, "j_joker", "Joker");
        joker.main_text = DescriptionGraph::from_lines(&["+4 Mult"]);
        joker.rarity = Some(1);
        sim.jokers.push(joker);
        sim.hand_levels = vec![level("Flush", 3), level("Pair", 5), level("High Card", 5)];
        sim.blinds.small.state = BlindState::Current;
        sim.blinds.small.chips_needed = 300;
        sim.blinds.small.reward = 3;
        sim.blinds.boss.chips_needed = 600;
        sim.blinds.boss.boss_text = vec!["Playing a ".to_string(), "#1# sets money to $0".to_string()];
        sim
    }

    #[test]
    fn encoding_is_idempotent() {
        let sim = selecting_hand_table();
        let first = encode(&sim, None).unwrap();
        let second = encode(&sim, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn unknown_engine_state_produces_no_document() {
        let sim = TableSim {
            engine_state: 13,
            ..TableSim::default()
        };
        assert!(encode(&sim, None).is_none());
    }

    #[test]
    fn selecting_hand_document_has_exactly_its_section() {
        let sim = selecting_hand_table();
        let value = serde_json::to_value(encode(&sim, None).unwrap()).unwrap();

        assert_eq!(value["state"], "SELECTING_HAND");
        assert_eq!(value["hand"][0]["name"], "Ace of Spades");
        assert_eq!(value["hands_left"], 4);
        assert_eq!(value["blind_info"]["Small"]["state"], "Current");
        assert!(value.get("shop_cards").is_none());
        assert!(value.get("pack_choices").is_none());
        assert!(value.get("failed_action").is_none());
        assert!(value.get("forced_card_index").is_none());
        assert_eq!(value["max_consumeables"], 2);
        assert_eq!(value["jokers"][0]["main_description"], "+4 Mult");
    }

    #[test]
    fn shop_document_has_no_hand() {
        let mut sim = selecting_hand_table();
        sim.engine_state = es::SHOP;
        let mut voucher = CardObject::new(30, CardSet::Voucher, "v_overstock_norm", "Overstock");
        voucher.cost = Some(10);
        sim.shop_vouchers.push(voucher);

        let value = serde_json::to_value(encode(&sim, None).unwrap()).unwrap();
        assert_eq!(value["state"], "SHOP");
        assert_eq!(value["shop_vouchers"][0]["cost"], 10);
        assert_eq!(value["reroll_cost"], 5);
        assert!(value.get("hand").is_none());
        assert!(value.get("blind_info").is_none());
    }

    #[test]
    fn transitional_phases_carry_only_common_fields() {
        let mut sim = selecting_hand_table();
        sim.engine_state = es::HAND_PLAYED;
        let doc = encode(&sim, None).unwrap();
        assert_eq!(doc.phase, PhaseSection::HandResolved);

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["state"], "HAND_PLAYED");
        assert!(value.get("hand").is_none());
        assert!(value.get("dollars").is_some());
    }

    #[test]
    fn tarot_pack_shows_hand_but_buffoon_pack_does_not() {
        let mut sim = selecting_hand_table();
        sim.pack_choices
            .push(CardObject::new(40, CardSet::Tarot, "c_magician", "The Magician"));

        sim.engine_state = es::TAROT_PACK;
        let tarot = serde_json::to_value(encode(&sim, None).unwrap()).unwrap();
        assert_eq!(tarot["hand"].as_array().unwrap().len(), 3);
        assert_eq!(tarot["pack_choices"][0]["type"], "Tarot");

        sim.engine_state = es::BUFFOON_PACK;
        let buffoon = serde_json::to_value(encode(&sim, None).unwrap()).unwrap();
        assert!(buffoon.get("hand").is_none());
        assert_eq!(buffoon["pack_choices"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn game_over_reports_final_progress() {
        let mut sim = selecting_hand_table();
        sim.engine_state = es::GAME_OVER;
        sim.best_hand = 1_240;
        sim.progress.ante = 3;
        sim.progress.round = 8;

        let doc = encode(&sim, None).unwrap();
        assert_eq!(
            doc.phase,
            PhaseSection::GameOver(GameOverSection {
                best_hand: 1_240,
                final_ante: 3,
                final_round: 8,
            })
        );
    }

    #[test]
    fn boss_description_uses_most_played_hand() {
        let sim = selecting_hand_table();
        let doc = encode(&sim, None).unwrap();
        let PhaseSection::SelectingHand(section) = doc.phase else {
            panic!("expected selecting hand");
        };
        // Pair and High Card tie on plays; Pair comes first in engine order.
        assert_eq!(
            section.blind_info.boss.boss_description.as_deref(),
            Some("Playing a  Pair sets money to $0")
        );
        assert_eq!(section.blind_info.small.boss_description, None);
    }

    #[test]
    fn most_played_defaults_when_nothing_played() {
        let mut sim = selecting_hand_table();
        sim.hand_levels = vec![level("Flush Five", 0), level("Flush", 0)];
        assert_eq!(most_played_hand(&sim), "High Card");
    }

    #[test]
    fn forced_card_index_is_one_based() {
        let mut sim = selecting_hand_table();
        sim.round.forced_card = Some(CardId(13));
        let value = serde_json::to_value(encode(&sim, None).unwrap()).unwrap();
        assert_eq!(value["forced_card_index"], 3);
    }

    #[test]
    fn failed_action_is_attached_when_pending() {
        let sim = selecting_hand_table();
        let failed = FailedAction {
            action: "play".to_string(),
            positions: vec![9],
            reason: "No card at hand position 9".to_string(),
        };
        let value = serde_json::to_value(encode(&sim, Some(&failed)).unwrap()).unwrap();
        assert_eq!(value["failed_action"]["reason"], "No card at hand position 9");
        assert_eq!(value["failed_action"]["positions"], serde_json::json!([9]));
    }

    #[test]
    fn card_names_follow_precedence() {
        let mut stone = CardObject::playing(1, Rank::King, Suit::Clubs);
        stone.key = "m_stone".to_string();
        assert_eq!(card_name(&stone), "Stone Card");
        assert_eq!(
            card_name(&CardObject::playing(2, Rank::Queen, Suit::Diamonds)),
            "Queen of Diamonds"
        );
        assert_eq!(
            card_name(&CardObject::new(3, CardSet::Planet, "c_pluto", "Pluto")),
            "Pluto"
        );
    }

    #[test]
    fn cyclic_card_description_still_encodes() {
        let mut sim = selecting_hand_table();
        let mut graph = DescriptionGraph::default();
        let a = graph.push(DescNode {
            text: Some("Copies ability of ".to_string()),
            ..DescNode::default()
        });
        let b = graph.push(DescNode {
            text: Some("Joker to the right".to_string()),
            ..DescNode::default()
        });
        graph.link(a, b);
        graph.link(b, a);
        graph.root = Some(a);
        let mut blueprint = CardObject::new(21, CardSet::Joker, "j_blueprint", "Blueprint");
        blueprint.main_text = graph;
        blueprint.copy_compatible = Some("compatible".to_string());
        sim.jokers.push(blueprint);

        let doc = encode(&sim, None).unwrap();
        assert_eq!(
            doc.common.jokers[1].main_description,
            "Copies ability of Joker to the right"
        );
        assert_eq!(
            doc.common.jokers[1].copy_compatible.as_deref(),
            Some("compatible")
        );
        assert_eq!(doc, encode(&sim, None).unwrap());
    }

    #[test]
    fn skip_tags_and_reroll_capability() {
        let mut sim = selecting_hand_table();
        sim.engine_state = es::BLIND_SELECT;
        sim.blinds.small.skip_tag = Some(TagObject {
            name: "Investment Tag".to_string(),
            description: DescriptionGraph::from_lines(&["Gain $25 after defeating", "the next Boss Blind"]),
        });
        sim.economy.dollars = 12;
        sim.vouchers.push("v_directors_cut".to_string());

        let doc = encode(&sim, None).unwrap();
        assert!(doc.common.can_reroll_boss);
        let PhaseSection::BlindSelect(section) = &doc.phase else {
            panic!("expected blind select");
        };
        assert_eq!(section.blind_info.small.tag.as_deref(), Some("Investment Tag"));
        assert_eq!(
            section.blind_info.small.tag_description.as_deref(),
            Some("Gain $25 after defeating the next Boss Blind")
        );

        sim.round.boss_rerolled_this_ante = true;
        assert!(!can_reroll_boss(&sim));
        sim.vouchers.push("v_retcon".to_string());
        assert!(can_reroll_boss(&sim));
        sim.economy.dollars = 9;
        assert!(!can_reroll_boss(&sim));
    }

    #[test]
    fn each_phase_carries_exactly_its_own_fields() {
        use std::collections::BTreeSet;

        const COMMON: &[&str] = &[
            "state",
            "dollars",
            "bankrupt_at",
            "max_jokers",
            "max_consumeables",
            "ante",
            "round_number",
            "hands_played",
            "seed",
            "jokers",
            "consumeables",
            "deck",
            "hand_levels",
            "tags",
            "owned_vouchers",
            "can_reroll_boss",
            "played_hands",
        ];
        let cases: [(u32, &str, &[&str]); 15] = [
            (
                es::SELECTING_HAND,
                "SELECTING_HAND",
                &["hand", "hands_left", "discards_left", "blind_info", "chips", "boss_blind_disabled"],
            ),
            (es::HAND_PLAYED, "HAND_PLAYED", &[]),
            (es::DRAW_TO_HAND, "DRAW_TO_HAND", &[]),
            (es::GAME_OVER, "GAME_OVER", &["best_hand", "final_ante", "final_round"]),
            (
                es::SHOP,
                "SHOP",
                &["shop_cards", "shop_boosters", "shop_vouchers", "reroll_cost"],
            ),
            (es::PLAY_TAROT, "PLAY_TAROT", &[]),
            (es::BLIND_SELECT, "BLIND_SELECT", &["blind_info"]),
            (es::ROUND_EVAL, "ROUND_EVAL", &[]),
            (es::TAROT_PACK, "TAROT_PACK", &["pack_choices", "hand"]),
            (es::PLANET_PACK, "PLANET_PACK", &["pack_choices"]),
            (es::MENU, "MENU", &[]),
            (es::SPECTRAL_PACK, "SPECTRAL_PACK", &["pack_choices", "hand"]),
            (es::STANDARD_PACK, "STANDARD_PACK", &["pack_choices"]),
            (es::BUFFOON_PACK, "BUFFOON_PACK", &["pack_choices"]),
            (es::NEW_ROUND, "NEW_ROUND", &[]),
        ];

        for (engine_state, tag, own) in cases {
            let sim = TableSim {
                engine_state,
                ..TableSim::default()
            };
            let doc = encode(&sim, None).unwrap();
            assert_eq!(doc.phase().tag(), tag);

            let value = serde_json::to_value(&doc).unwrap();
            let keys: BTreeSet<&str> = value
                .as_object()
                .unwrap()
                .keys()
                .map(String::as_str)
                .collect();
            let expected: BTreeSet<&str> = COMMON.iter().chain(own).copied().collect();
            assert_eq!(keys, expected, "fields for {tag}");
            assert_eq!(value["state"], tag);
        }
    }
}
