use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::card::CardId;

pub const FOUNDATION_COUNT: usize = 4;
pub const TABLEAU_COUNT: usize = 7;
pub const PILE_COUNT: usize = 2 + FOUNDATION_COUNT + TABLEAU_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PileKind {
    Stock,
    Waste,
    Foundation,
    Tableau,
}

/// 牌局中固定的 13 个牌堆。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PileId {
    #[serde(rename = "stock")]
    Stock,
    #[serde(rename = "waste")]
    Waste,
    #[serde(rename = "f0")]
    Foundation0,
    #[serde(rename = "f1")]
    Foundation1,
    #[serde(rename = "f2")]
    Foundation2,
    #[serde(rename = "f3")]
    Foundation3,
    #[serde(rename = "t0")]
    Tableau0,
    #[serde(rename = "t1")]
    Tableau1,
    #[serde(rename = "t2")]
    Tableau2,
    #[serde(rename = "t3")]
    Tableau3,
    #[serde(rename = "t4")]
    Tableau4,
    #[serde(rename = "t5")]
    Tableau5,
    #[serde(rename = "t6")]
    Tableau6,
}

impl PileId {
    pub const ALL: [PileId; PILE_COUNT] = [
        PileId::Stock,
        PileId::Waste,
        PileId::Foundation0,
        PileId::Foundation1,
        PileId::Foundation2,
        PileId::Foundation3,
        PileId::Tableau0,
        PileId::Tableau1,
        PileId::Tableau2,
        PileId::Tableau3,
        PileId::Tableau4,
        PileId::Tableau5,
        PileId::Tableau6,
    ];

    pub const FOUNDATIONS: [PileId; FOUNDATION_COUNT] = [
        PileId::Foundation0,
        PileId::Foundation1,
        PileId::Foundation2,
        PileId::Foundation3,
    ];

    pub const TABLEAUS: [PileId; TABLEAU_COUNT] = [
        PileId::Tableau0,
        PileId::Tableau1,
        PileId::Tableau2,
        PileId::Tableau3,
        PileId::Tableau4,
        PileId::Tableau5,
        PileId::Tableau6,
    ];

    pub fn kind(self) -> PileKind {
        match self {
            PileId::Stock => PileKind::Stock,
            PileId::Waste => PileKind::Waste,
            PileId::Foundation0
            | PileId::Foundation1
            | PileId::Foundation2
            | PileId::Foundation3 => PileKind::Foundation,
            _ => PileKind::Tableau,
        }
    }

    pub fn is_foundation(self) -> bool {
        self.kind() == PileKind::Foundation
    }

    pub fn is_tableau(self) -> bool {
        self.kind() == PileKind::Tableau
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PileId::Stock => "stock",
            PileId::Waste => "waste",
            PileId::Foundation0 => "f0",
            PileId::Foundation1 => "f1",
            PileId::Foundation2 => "f2",
            PileId::Foundation3 => "f3",
            PileId::Tableau0 => "t0",
            PileId::Tableau1 => "t1",
            PileId::Tableau2 => "t2",
            PileId::Tableau3 => "t3",
            PileId::Tableau4 => "t4",
            PileId::Tableau5 => "t5",
            PileId::Tableau6 => "t6",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PileId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PileId::ALL
            .iter()
            .copied()
            .find(|pile| pile.as_str() == s)
            .ok_or(())
    }
}

/// 有序的卡牌编号序列，末尾元素为“顶牌”。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Pile {
    cards: Vec<CardId>,
}

impl Pile {
    pub fn from_cards(cards: Vec<CardId>) -> Self {
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn top(&self) -> Option<CardId> {
        self.cards.last().copied()
    }

    pub fn cards(&self) -> &[CardId] {
        &self.cards
    }

    pub fn iter(&self) -> impl Iterator<Item = CardId> + '_ {
        self.cards.iter().copied()
    }

    /// 从 `index` 起到顶部的所有牌；越界时为空。
    pub fn suffix_from(&self, index: usize) -> &[CardId] {
        self.cards.get(index..).unwrap_or(&[])
    }

    /// `run` 是否恰好是本牌堆的顶部后缀（按位置逐一比对）。
    pub fn ends_with(&self, run: &[CardId]) -> bool {
        !run.is_empty() && self.cards.ends_with(run)
    }

    pub fn push(&mut self, card_id: CardId) {
        self.cards.push(card_id);
    }

    pub fn pop(&mut self) -> Option<CardId> {
        self.cards.pop()
    }

    pub fn append_run(&mut self, run: &[CardId]) {
        self.cards.extend_from_slice(run);
    }

    /// 移除顶部 `count` 张牌并按原顺序返回。
    pub fn remove_suffix(&mut self, count: usize) -> Vec<CardId> {
        let start = self.cards.len().saturating_sub(count);
        self.cards.split_off(start)
    }
}

/// 全部 13 个牌堆，按 [`PileId`] 索引。序列化为以牌堆名为键的映射。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Piles {
    piles: [Pile; PILE_COUNT],
}

impl Piles {
    pub fn iter(&self) -> impl Iterator<Item = (PileId, &Pile)> {
        PileId::ALL.iter().map(move |&id| (id, &self.piles[id.slot()]))
    }

    pub fn foundation_total(&self) -> usize {
        PileId::FOUNDATIONS
            .iter()
            .map(|&id| self.piles[id.slot()].len())
            .sum()
    }
}

impl Index<PileId> for Piles {
    type Output = Pile;

    fn index(&self, id: PileId) -> &Pile {
        &self.piles[id.slot()]
    }
}

impl IndexMut<PileId> for Piles {
    fn index_mut(&mut self, id: PileId) -> &mut Pile {
        &mut self.piles[id.slot()]
    }
}

impl Serialize for Piles {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(PILE_COUNT))?;
        for (id, pile) in self.iter() {
            map.serialize_entry(&id, pile)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Piles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut raw = BTreeMap::<PileId, Pile>::deserialize(deserializer)?;
        let mut piles = Piles::default();
        for id in PileId::ALL {
            piles[id] = raw
                .remove(&id)
                .ok_or_else(|| D::Error::custom(format!("missing pile `{id}`")))?;
        }
        Ok(piles)
    }
}
