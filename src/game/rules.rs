use serde::{Deserialize, Serialize};

use crate::ai::advisor;

use super::{
    card::{Card, CardId},
    history::SnapshotReason,
    pile::{PileId, PileKind},
    state::{GameEvent, GameState, FOUNDATION_POINTS},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum RuleError {
    #[error("the game is already won")]
    GameFinished,
    #[error("no cards were selected")]
    EmptySelection,
    #[error("card {card_id} does not exist")]
    CardNotFound { card_id: CardId },
    #[error("unknown pile `{name}`")]
    UnknownPile { name: String },
    #[error("card {card_id} is face down")]
    CardFaceDown { card_id: CardId },
    #[error("cards cannot be moved onto {pile}, the pile they came from")]
    SamePile { pile: PileId },
    #[error("cards cannot be taken from {pile}")]
    NotASource { pile: PileId },
    #[error("{pile} does not accept cards")]
    NotADestination { pile: PileId },
    #[error("only one card at a time may go to a foundation, got {count}")]
    MultipleCardsToFoundation { count: usize },
    #[error("the selected cards on {pile} are not a movable run")]
    NotMovableRun { pile: PileId },
    #[error("card {card_id} cannot be placed on {pile}")]
    IllegalPlacement { card_id: CardId, pile: PileId },
    #[error("the selected cards are not the top of {pile}")]
    StaleSelection { pile: PileId },
    #[error("card {card_id} has no legal destination")]
    NoLegalMove { card_id: CardId },
    #[error("the top of {pile} is not a face-down card")]
    NothingToFlip { pile: PileId },
}

/// Klondike 规则：只读的合法性判断，以及在其基础上原子地执行移动。
///
/// 所有改变牌局的操作都在校验通过之后、修改之前写入撤销快照；
/// 被拒绝的操作既不改变牌局也不留下快照。
pub struct RuleEngine;

impl RuleEngine {
    pub fn can_place_on_foundation(state: &GameState, card: &Card, pile: PileId) -> bool {
        if !pile.is_foundation() {
            return false;
        }
        match state.top_card_of(pile) {
            None => card.is_ace(),
            Some(top) => card.builds_up_on(top),
        }
    }

    pub fn can_place_on_tableau(state: &GameState, card: &Card, pile: PileId) -> bool {
        if !pile.is_tableau() {
            return false;
        }
        match state.top_card_of(pile) {
            None => card.is_king(),
            Some(top) => card.builds_down_on(top),
        }
    }

    pub fn is_legal_destination(state: &GameState, card: &Card, pile: PileId) -> bool {
        match pile.kind() {
            PileKind::Foundation => Self::can_place_on_foundation(state, card, pile),
            PileKind::Tableau => Self::can_place_on_tableau(state, card, pile),
            PileKind::Stock | PileKind::Waste => false,
        }
    }

    /// 从 `start` 到顶部是否为全部朝上、降序异色的连续牌组。
    pub fn is_movable_run(state: &GameState, pile: PileId, start: usize) -> bool {
        if !pile.is_tableau() {
            return false;
        }
        let run = state.pile(pile).suffix_from(start);
        if run.is_empty() {
            return false;
        }

        let mut previous: Option<&Card> = None;
        for &card_id in run {
            let Some(card) = state.card(card_id) else {
                return false;
            };
            if !card.face_up {
                return false;
            }
            if let Some(prev) = previous {
                if !card.builds_down_on(prev) {
                    return false;
                }
            }
            previous = Some(card);
        }
        true
    }

    fn ensure_in_progress(state: &GameState) -> Result<(), RuleError> {
        if state.won() {
            return Err(RuleError::GameFinished);
        }
        Ok(())
    }

    /// 翻牌；牌库为空时把废牌堆整体翻回牌库。两者都空时什么也不做。
    pub fn draw_from_stock(state: &mut GameState) -> Vec<GameEvent> {
        if !state.pile(PileId::Stock).is_empty() {
            state.snapshot(SnapshotReason::Draw);
            let mut drawn = Vec::with_capacity(state.draw_mode().count());
            for _ in 0..state.draw_mode().count() {
                match state.shift_top(PileId::Stock, PileId::Waste, true) {
                    Some(card_id) => drawn.push(card_id),
                    None => break,
                }
            }
            state.moves += 1;
            log::debug!("drew {:?}", labels(state, &drawn));
            return vec![GameEvent::CardsDrawn { cards: drawn }];
        }

        if !state.pile(PileId::Waste).is_empty() {
            state.snapshot(SnapshotReason::Recycle);
            let mut count = 0;
            while state
                .shift_top(PileId::Waste, PileId::Stock, false)
                .is_some()
            {
                count += 1;
            }
            state.moves += 1;
            log::debug!("recycled {count} cards into the stock");
            return vec![GameEvent::WasteRecycled { count }];
        }

        Vec::new()
    }

    /// 拖放或点选目标时的入口：先按规则校验，再交给 [`RuleEngine::move_cards`]。
    pub fn attempt_move(
        state: &mut GameState,
        cards: &[CardId],
        from: PileId,
        to: PileId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_in_progress(state)?;

        let &lead_id = cards.first().ok_or(RuleError::EmptySelection)?;
        if from == to {
            return Err(RuleError::SamePile { pile: from });
        }
        if from == PileId::Stock {
            return Err(RuleError::NotASource { pile: from });
        }
        if matches!(to.kind(), PileKind::Stock | PileKind::Waste) {
            return Err(RuleError::NotADestination { pile: to });
        }
        if to.is_foundation() && cards.len() > 1 {
            return Err(RuleError::MultipleCardsToFoundation { count: cards.len() });
        }

        for &card_id in cards {
            let card = state
                .card(card_id)
                .ok_or(RuleError::CardNotFound { card_id })?;
            if !card.face_up {
                return Err(RuleError::CardFaceDown { card_id });
            }
        }

        if cards.len() > 1 {
            let movable = state
                .pile(from)
                .len()
                .checked_sub(cards.len())
                .is_some_and(|start| Self::is_movable_run(state, from, start));
            if !movable {
                return Err(RuleError::NotMovableRun { pile: from });
            }
        }

        let lead = state
            .card(lead_id)
            .ok_or(RuleError::CardNotFound { card_id: lead_id })?;
        if !Self::is_legal_destination(state, lead, to) {
            return Err(RuleError::IllegalPlacement {
                card_id: lead_id,
                pile: to,
            });
        }

        Self::move_cards(state, cards, from, to)
    }

    /// 把 `from` 顶部恰好等于 `cards` 的那段牌移到 `to`。
    ///
    /// 只做位置一致性检查，不检查放置规则；调用方应先完成规则校验。
    pub fn move_cards(
        state: &mut GameState,
        cards: &[CardId],
        from: PileId,
        to: PileId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::relocate(state, cards, from, to, SnapshotReason::Move)
    }

    fn relocate(
        state: &mut GameState,
        cards: &[CardId],
        from: PileId,
        to: PileId,
        reason: SnapshotReason,
    ) -> Result<Vec<GameEvent>, RuleError> {
        if from == to {
            return Err(RuleError::SamePile { pile: from });
        }
        if !state.pile(from).ends_with(cards) {
            log::warn!("refusing to move {cards:?}: not the top of {from}");
            return Err(RuleError::StaleSelection { pile: from });
        }

        state.snapshot(reason);
        let moved = state.transfer(from, to, cards.len());
        if to.is_foundation() {
            state.score = state.score.saturating_add(FOUNDATION_POINTS);
        }
        state.moves += 1;
        log::debug!("moved {:?} from {from} to {to}", labels(state, &moved));

        let mut events = vec![GameEvent::CardsMoved {
            cards: moved,
            from,
            to,
        }];
        events.extend(state.reveal_top(from));
        events.extend(state.evaluate_win());
        Ok(events)
    }

    /// 直接点击翻开牌桌列顶部背面朝下的牌，计一步。
    pub fn flip_top_if_exposed_face_down(
        state: &mut GameState,
        pile: PileId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_in_progress(state)?;
        let exposed = pile.is_tableau()
            && state
                .top_card_of(pile)
                .is_some_and(|card| !card.face_up);
        if !exposed {
            return Err(RuleError::NothingToFlip { pile });
        }

        state.snapshot(SnapshotReason::Flip);
        let events: Vec<GameEvent> = state.reveal_top(pile).into_iter().collect();
        state.moves += 1;
        Ok(events)
    }

    /// 点击单张牌：优先送往收牌区，其次送往可接的牌桌列。
    pub fn auto_move_single(
        state: &mut GameState,
        card_id: CardId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_in_progress(state)?;
        let from = state
            .location_of(card_id)
            .ok_or(RuleError::CardNotFound { card_id })?;
        let to = advisor::auto_move_target(state, card_id).ok_or(RuleError::NoLegalMove { card_id })?;
        Self::relocate(state, &[card_id], from, to, SnapshotReason::Auto)
    }

    /// 把废牌堆顶与各列顶牌中能上收牌区的牌逐张送上去，直到再无可送。
    /// 每一张都是独立的、可撤销的一步。
    pub fn auto_foundation_pass(state: &mut GameState) -> Vec<GameEvent> {
        let mut events = Vec::new();
        while !state.won() {
            let mut placed_any = false;
            for card_id in advisor::scan_candidates(state) {
                let Some(to) = advisor::foundation_target(state, card_id) else {
                    continue;
                };
                let Some(from) = state.location_of(card_id) else {
                    continue;
                };
                match Self::relocate(state, &[card_id], from, to, SnapshotReason::AutoFoundation) {
                    Ok(mut placed) => {
                        events.append(&mut placed);
                        placed_any = true;
                    }
                    Err(error) => log::warn!("auto-foundation skipped card {card_id}: {error}"),
                }
            }
            if !placed_any {
                break;
            }
        }
        events
    }
}

fn labels(state: &GameState, cards: &[CardId]) -> Vec<String> {
    cards
        .iter()
        .filter_map(|&card_id| state.card(card_id).map(Card::label))
        .collect()
}
