//! 落点建议：单击自动移动、自动收牌与提示共用的目标搜索。

use serde::{Deserialize, Serialize};

use crate::game::card::{Card, CardId};
use crate::game::pile::{PileId, TABLEAU_COUNT};
use crate::game::rules::RuleEngine;
use crate::game::state::GameState;

/// 每轮扫描的候选上限：废牌堆顶加上每列顶牌。
pub const SCAN_LIMIT: usize = 1 + TABLEAU_COUNT;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub card_id: CardId,
    pub from: PileId,
    pub to: PileId,
}

/// 废牌堆顶，然后 t0..t6 的顶牌；只保留朝上的牌。
pub fn scan_candidates(state: &GameState) -> Vec<CardId> {
    let mut candidates = Vec::with_capacity(SCAN_LIMIT);
    let piles = [PileId::Waste].into_iter().chain(PileId::TABLEAUS);
    for pile in piles {
        if let Some(card) = state.top_card_of(pile) {
            if card.face_up {
                candidates.push(card.id);
            }
        }
    }
    candidates.truncate(SCAN_LIMIT);
    candidates
}

/// 朝上、位于所在牌堆顶部的牌才可单独拿起。
fn exposed(state: &GameState, card_id: CardId) -> Option<(&Card, PileId)> {
    let card = state.card(card_id)?;
    let from = state.location_of(card_id)?;
    if !card.face_up || state.pile(from).top() != Some(card_id) {
        return None;
    }
    Some((card, from))
}

/// 第一个能接住该牌的收牌区。收牌区上的牌不在收牌区之间挪动。
pub fn foundation_target(state: &GameState, card_id: CardId) -> Option<PileId> {
    let (card, from) = exposed(state, card_id)?;
    if from.is_foundation() {
        return None;
    }
    PileId::FOUNDATIONS
        .into_iter()
        .find(|&pile| RuleEngine::can_place_on_foundation(state, card, pile))
}

/// 第一个能接住该牌的牌桌列，跳过 `skip`。
pub fn tableau_target(state: &GameState, card: &Card, skip: PileId) -> Option<PileId> {
    PileId::TABLEAUS
        .into_iter()
        .filter(|&pile| pile != skip)
        .find(|&pile| RuleEngine::can_place_on_tableau(state, card, pile))
}

/// 单击一张牌时的去向：先收牌区，后牌桌列。
pub fn auto_move_target(state: &GameState, card_id: CardId) -> Option<PileId> {
    let (card, from) = exposed(state, card_id)?;
    foundation_target(state, card_id).or_else(|| tableau_target(state, card, from))
}

pub fn hint(state: &GameState) -> Option<Hint> {
    if state.won() {
        return None;
    }
    scan_candidates(state).into_iter().find_map(|card_id| {
        let (card, from) = exposed(state, card_id)?;
        let to = foundation_target(state, card_id).or_else(|| tableau_target(state, card, from))?;
        Some(Hint { card_id, from, to })
    })
}

/// 只要牌的编号，供表现层高亮。
pub fn hint_candidate(state: &GameState) -> Option<CardId> {
    hint(state).map(|hint| hint.card_id)
}
