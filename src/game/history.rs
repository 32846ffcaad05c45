use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::card::Card;
use super::pile::Piles;
use super::state::GameState;

/// 撤销栈的最大深度，超出时丢弃最旧的快照。
pub const UNDO_LIMIT: usize = 80;

/// 快照来源，只作记录用途。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotReason {
    Draw,
    Recycle,
    Flip,
    Move,
    Auto,
    AutoFoundation,
}

/// 某次改变牌局之前的完整局面。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub reason: SnapshotReason,
    pub(crate) cards: Vec<Card>,
    pub(crate) piles: Piles,
    pub(crate) score: u32,
    pub(crate) moves: u32,
    pub(crate) elapsed_sec: u64,
    pub(crate) won: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct History {
    entries: VecDeque<Snapshot>,
}

impl History {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }

    pub(crate) fn push(&mut self, snapshot: Snapshot) {
        self.entries.push_back(snapshot);
        self.enforce_limit();
    }

    /// 丢弃超出 [`UNDO_LIMIT`] 的最旧快照，返回丢弃的条数。
    pub(crate) fn enforce_limit(&mut self) -> usize {
        let excess = self.entries.len().saturating_sub(UNDO_LIMIT);
        self.entries.drain(..excess);
        excess
    }

    pub(crate) fn pop(&mut self) -> Option<Snapshot> {
        self.entries.pop_back()
    }
}

impl GameState {
    /// 在改变牌局之前调用，记录当前局面。
    pub(crate) fn snapshot(&mut self, reason: SnapshotReason) {
        let snapshot = Snapshot {
            reason,
            cards: self.cards.clone(),
            piles: self.piles.clone(),
            score: self.score,
            moves: self.moves,
            elapsed_sec: self.elapsed_sec,
            won: self.won,
        };
        self.history.push(snapshot);
    }

    /// 回到最近一次改变牌局之前的局面。没有可撤销的操作时返回 `false`。
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.pop() else {
            return false;
        };
        log::debug!("undo {:?}", snapshot.reason);
        self.cards = snapshot.cards;
        self.piles = snapshot.piles;
        self.score = snapshot.score;
        self.moves = snapshot.moves;
        self.elapsed_sec = snapshot.elapsed_sec;
        self.won = snapshot.won;
        self.rebuild_locations();
        true
    }
}
