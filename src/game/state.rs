use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;

use super::card::{shuffled_deck, Card, CardId, Suit, DECK_SIZE};
use super::history::History;
use super::pile::{Pile, PileId, PileKind, Piles, TABLEAU_COUNT};

/// 一张牌进入收牌区的得分。
pub const FOUNDATION_POINTS: u32 = 10;
/// 翻开一张背面朝下的牌的得分。
pub const REVEAL_POINTS: u32 = 5;
/// 全部收齐时的一次性奖励。
pub const WIN_BONUS: u32 = 100;

/// 每次从牌库翻到废牌堆的张数。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum DrawMode {
    #[default]
    One,
    Three,
}

impl DrawMode {
    pub fn count(self) -> usize {
        match self {
            DrawMode::One => 1,
            DrawMode::Three => 3,
        }
    }
}

impl TryFrom<u8> for DrawMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DrawMode::One),
            3 => Ok(DrawMode::Three),
            other => Err(format!("draw mode must be 1 or 3, got {other}")),
        }
    }
}

impl From<DrawMode> for u8 {
    fn from(mode: DrawMode) -> Self {
        match mode {
            DrawMode::One => 1,
            DrawMode::Three => 3,
        }
    }
}

/// 牌局事件流，供表现层决定如何重绘。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum GameEvent {
    CardsDrawn {
        cards: Vec<CardId>,
    },
    WasteRecycled {
        count: usize,
    },
    CardsMoved {
        cards: Vec<CardId>,
        from: PileId,
        to: PileId,
    },
    CardRevealed {
        card_id: CardId,
        pile: PileId,
    },
    GameWon {
        score: u32,
    },
    MoveUndone,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum IntegrityError {
    #[error("expected {expected} cards, found {found}")]
    WrongCardCount { expected: usize, found: usize },
    #[error("slot {slot} holds card {card_id}")]
    CardIdMismatch { slot: usize, card_id: CardId },
    #[error("card {card_id} has rank {rank}")]
    InvalidRank { card_id: CardId, rank: u8 },
    #[error("card {card_id} does not match its suit and rank")]
    FaceMismatch { card_id: CardId },
    #[error("pile {pile} references unknown card {card_id}")]
    UnknownCard { pile: PileId, card_id: CardId },
    #[error("card {card_id} appears in more than one place")]
    DuplicateCard { card_id: CardId },
    #[error("card {card_id} is not in any pile")]
    MissingCard { card_id: CardId },
    #[error("card {card_id} on {pile} is facing the wrong way")]
    WrongFacing { pile: PileId, card_id: CardId },
    #[error("foundation {pile} is not an ascending single-suit run")]
    BrokenFoundation { pile: PileId },
    #[error("tableau {pile} has a face-down card above a face-up one")]
    FaceDownAboveFaceUp { pile: PileId },
    #[error("face-up cards on {pile} do not build down in alternating colors")]
    BrokenTableauRun { pile: PileId },
    #[error("won flag is {won} but {in_foundations} cards are on the foundations")]
    WonMismatch { won: bool, in_foundations: usize },
}

/// 一局 Klondike 的完整状态。
///
/// 牌堆与反向索引只在本 crate 内部修改；外部通过访问器只读查看。
/// 序列化形式为带版本号的存档记录，见 [`super::record::SavedGame`]。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "crate::game::record::SavedGame", into = "crate::game::record::SavedGame")]
pub struct GameState {
    pub(crate) cards: Vec<Card>,
    pub(crate) piles: Piles,
    pub(crate) score: u32,
    pub(crate) moves: u32,
    pub(crate) elapsed_sec: u64,
    pub(crate) draw_mode: DrawMode,
    pub(crate) won: bool,
    pub(crate) history: History,
    locations: [PileId; DECK_SIZE],
}

impl GameState {
    /// 依据配置洗牌发牌；未给出种子时使用系统熵。
    pub fn new_game(config: &GameConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self::deal(config.draw_mode, &mut rng, &config.logo_keys)
    }

    pub fn deal<R: Rng + ?Sized>(draw_mode: DrawMode, rng: &mut R, logo_keys: &[String]) -> Self {
        Self::from_deck(shuffled_deck(rng, logo_keys), draw_mode)
    }

    /// 按给定牌序发牌：第 n 列得到 n+1 张、只有最上面一张朝上，其余进入牌库。
    pub fn from_deck(deck: Vec<Card>, draw_mode: DrawMode) -> Self {
        let mut piles = Piles::default();
        let mut order = deck.iter().map(|card| card.id);
        for (column, &pile) in PileId::TABLEAUS.iter().enumerate() {
            for _ in 0..=column {
                if let Some(card_id) = order.next() {
                    piles[pile].push(card_id);
                }
            }
        }
        for card_id in order {
            piles[PileId::Stock].push(card_id);
        }

        let mut cards = deck;
        cards.sort_by_key(|card| card.id);
        for card in &mut cards {
            card.face_up = false;
        }
        for pile in PileId::TABLEAUS {
            if let Some(top) = piles[pile].top() {
                if let Some(card) = cards.get_mut(usize::from(top)) {
                    card.face_up = true;
                }
            }
        }

        Self::from_parts(cards, piles, 0, 0, 0, draw_mode, false, History::default())
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        cards: Vec<Card>,
        piles: Piles,
        score: u32,
        moves: u32,
        elapsed_sec: u64,
        draw_mode: DrawMode,
        won: bool,
        history: History,
    ) -> Self {
        let mut state = Self {
            cards,
            piles,
            score,
            moves,
            elapsed_sec,
            draw_mode,
            won,
            history,
            locations: [PileId::Stock; DECK_SIZE],
        };
        state.rebuild_locations();
        state
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, card_id: CardId) -> Option<&Card> {
        self.cards.get(usize::from(card_id))
    }

    pub fn piles(&self) -> &Piles {
        &self.piles
    }

    pub fn pile(&self, pile: PileId) -> &Pile {
        &self.piles[pile]
    }

    pub fn top_card_of(&self, pile: PileId) -> Option<&Card> {
        self.piles[pile].top().and_then(|card_id| self.card(card_id))
    }

    /// 反向索引：某张牌当前所在的牌堆。
    pub fn location_of(&self, card_id: CardId) -> Option<PileId> {
        self.locations.get(usize::from(card_id)).copied()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn elapsed_sec(&self) -> u64 {
        self.elapsed_sec
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    pub fn won(&self) -> bool {
        self.won
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn set_draw_mode(&mut self, draw_mode: DrawMode) {
        self.draw_mode = draw_mode;
    }

    /// 计时器每秒调用一次；胜利后停表。返回是否计时。
    pub fn tick(&mut self) -> bool {
        if self.won {
            return false;
        }
        self.elapsed_sec += 1;
        true
    }

    pub(crate) fn rebuild_locations(&mut self) {
        for (pile_id, pile) in self.piles.iter() {
            for card_id in pile.iter() {
                if let Some(slot) = self.locations.get_mut(usize::from(card_id)) {
                    *slot = pile_id;
                }
            }
        }
    }

    /// 把 `from` 顶部的 `count` 张牌按原顺序移到 `to`。
    pub(crate) fn transfer(&mut self, from: PileId, to: PileId, count: usize) -> Vec<CardId> {
        let run = self.piles[from].remove_suffix(count);
        self.piles[to].append_run(&run);
        for &card_id in &run {
            if let Some(slot) = self.locations.get_mut(usize::from(card_id)) {
                *slot = to;
            }
        }
        run
    }

    /// 逐张搬运：弹出 `from` 顶牌、设置朝向、压到 `to` 顶部。
    pub(crate) fn shift_top(&mut self, from: PileId, to: PileId, face_up: bool) -> Option<CardId> {
        let card_id = self.piles[from].pop()?;
        if let Some(card) = self.cards.get_mut(usize::from(card_id)) {
            card.face_up = face_up;
        }
        self.piles[to].push(card_id);
        if let Some(slot) = self.locations.get_mut(usize::from(card_id)) {
            *slot = to;
        }
        Some(card_id)
    }

    /// 牌桌列顶牌若背面朝上则翻开并加分；不计步数。
    pub(crate) fn reveal_top(&mut self, pile: PileId) -> Option<GameEvent> {
        if !pile.is_tableau() {
            return None;
        }
        let card_id = self.piles[pile].top()?;
        let card = self.cards.get_mut(usize::from(card_id))?;
        if card.face_up {
            return None;
        }
        card.face_up = true;
        self.score = self.score.saturating_add(REVEAL_POINTS);
        Some(GameEvent::CardRevealed { card_id, pile })
    }

    pub(crate) fn evaluate_win(&mut self) -> Option<GameEvent> {
        if self.won || self.piles.foundation_total() != DECK_SIZE {
            return None;
        }
        self.won = true;
        self.score = self.score.saturating_add(WIN_BONUS);
        Some(GameEvent::GameWon { score: self.score })
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        check_layout(&self.cards, &self.piles, self.won)
    }
}

/// 校验一组牌与牌堆布局是否满足全部不变量。存档加载和快照校验共用。
pub(crate) fn check_layout(cards: &[Card], piles: &Piles, won: bool) -> Result<(), IntegrityError> {
    if cards.len() != DECK_SIZE {
        return Err(IntegrityError::WrongCardCount {
            expected: DECK_SIZE,
            found: cards.len(),
        });
    }
    for (slot, card) in cards.iter().enumerate() {
        if usize::from(card.id) != slot {
            return Err(IntegrityError::CardIdMismatch {
                slot,
                card_id: card.id,
            });
        }
        if !(1..=13).contains(&card.rank) {
            return Err(IntegrityError::InvalidRank {
                card_id: card.id,
                rank: card.rank,
            });
        }
        if Card::id_for(card.suit, card.rank) != card.id {
            return Err(IntegrityError::FaceMismatch { card_id: card.id });
        }
    }

    let mut seen = [false; DECK_SIZE];
    for (pile_id, pile) in piles.iter() {
        for card_id in pile.iter() {
            let slot = seen
                .get_mut(usize::from(card_id))
                .ok_or(IntegrityError::UnknownCard {
                    pile: pile_id,
                    card_id,
                })?;
            if *slot {
                return Err(IntegrityError::DuplicateCard { card_id });
            }
            *slot = true;
        }
    }
    if let Some(missing) = seen.iter().position(|present| !present) {
        return Err(IntegrityError::MissingCard {
            card_id: missing as CardId,
        });
    }

    // 牌库全部背面朝上；废牌堆与基础堆全部正面朝上。
    for (pile_id, pile) in piles.iter() {
        let expected = match pile_id.kind() {
            PileKind::Stock => false,
            PileKind::Waste | PileKind::Foundation => true,
            PileKind::Tableau => continue,
        };
        if let Some(card_id) = pile.iter().find(|&id| cards[usize::from(id)].face_up != expected) {
            return Err(IntegrityError::WrongFacing {
                pile: pile_id,
                card_id,
            });
        }
    }

    for pile_id in PileId::FOUNDATIONS {
        let pile = &piles[pile_id];
        let suit: Option<Suit> = pile.top().map(|id| cards[usize::from(id)].suit);
        let ordered = pile.iter().enumerate().all(|(depth, id)| {
            let card = &cards[usize::from(id)];
            Some(card.suit) == suit && usize::from(card.rank) == depth + 1
        });
        if !ordered {
            return Err(IntegrityError::BrokenFoundation { pile: pile_id });
        }
    }

    for pile_id in PileId::TABLEAUS {
        let mut previous: Option<&Card> = None;
        for card_id in piles[pile_id].iter() {
            let card = &cards[usize::from(card_id)];
            match previous {
                Some(prev) if prev.face_up && !card.face_up => {
                    return Err(IntegrityError::FaceDownAboveFaceUp { pile: pile_id });
                }
                Some(prev) if prev.face_up && !card.builds_down_on(prev) => {
                    return Err(IntegrityError::BrokenTableauRun { pile: pile_id });
                }
                _ => {}
            }
            previous = Some(card);
        }
    }

    let in_foundations = piles.foundation_total();
    if won != (in_foundations == DECK_SIZE) {
        return Err(IntegrityError::WonMismatch {
            won,
            in_foundations,
        });
    }

    Ok(())
}

/// 固定的 7 列发牌张数之和。
pub const DEALT_TO_TABLEAU: usize = TABLEAU_COUNT * (TABLEAU_COUNT + 1) / 2;

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::game::card::fresh_deck;

    /// 按 `layout` 摆牌，未提及的牌全部背面朝上放进牌库。
    pub(crate) fn arranged(layout: &[(PileId, &[(Suit, u8, bool)])]) -> GameState {
        let mut cards = fresh_deck();
        let mut piles = Piles::default();
        let mut placed = [false; DECK_SIZE];
        for (pile, entries) in layout {
            for &(suit, rank, face_up) in entries.iter() {
                let card_id = Card::id_for(suit, rank);
                cards[usize::from(card_id)].face_up = face_up;
                placed[usize::from(card_id)] = true;
                piles[*pile].push(card_id);
            }
        }
        for card in &cards {
            if !placed[usize::from(card.id)] {
                piles[PileId::Stock].push(card.id);
            }
        }
        let won = piles.foundation_total() == DECK_SIZE;
        GameState::from_parts(cards, piles, 0, 0, 0, DrawMode::One, won, History::default())
    }

    pub(crate) fn id(suit: Suit, rank: u8) -> CardId {
        Card::id_for(suit, rank)
    }

    pub(crate) fn full_suit(suit: Suit, up_to: u8) -> Vec<(Suit, u8, bool)> {
        (1..=up_to).map(|rank| (suit, rank, true)).collect()
    }
}
