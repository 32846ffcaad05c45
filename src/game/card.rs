use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 一副牌的张数。
pub const DECK_SIZE: usize = 52;
/// 每种花色的张数。
pub const RANKS_PER_SUIT: u8 = 13;

pub const ACE: u8 = 1;
pub const KING: u8 = 13;

/// 卡牌标识，取值 `0..52`，按花色主序、点数次序分配。
pub type CardId = u8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    Red,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    #[serde(rename = "S")]
    Spades,
    #[serde(rename = "H")]
    Hearts,
    #[serde(rename = "D")]
    Diamonds,
    #[serde(rename = "C")]
    Clubs,
}

impl Suit {
    /// 发牌顺序中的花色次序，同时决定卡牌编号。
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn color(self) -> Color {
        match self {
            Suit::Spades | Suit::Clubs => Color::Black,
            Suit::Hearts | Suit::Diamonds => Color::Red,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
        }
    }

    fn index(self) -> u8 {
        match self {
            Suit::Spades => 0,
            Suit::Hearts => 1,
            Suit::Diamonds => 2,
            Suit::Clubs => 3,
        }
    }
}

/// 单张扑克牌。身份（编号、花色、点数）不可变，只有朝向会改变。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub suit: Suit,
    pub rank: u8,
    pub face_up: bool,
    /// 装饰用的图标键，规则引擎不读取。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_key: Option<String>,
}

impl Card {
    pub fn new(suit: Suit, rank: u8) -> Self {
        Self {
            id: Self::id_for(suit, rank),
            suit,
            rank,
            face_up: false,
            logo_key: None,
        }
    }

    /// 给定花色与点数对应的卡牌编号。
    pub fn id_for(suit: Suit, rank: u8) -> CardId {
        suit.index() * RANKS_PER_SUIT + rank.saturating_sub(1)
    }

    pub fn color(&self) -> Color {
        self.suit.color()
    }

    pub fn is_ace(&self) -> bool {
        self.rank == ACE
    }

    pub fn is_king(&self) -> bool {
        self.rank == KING
    }

    /// 能否以降序、异色的方式叠放在 `under` 之上（牌桌列规则）。
    pub fn builds_down_on(&self, under: &Card) -> bool {
        self.color() != under.color() && self.rank + 1 == under.rank
    }

    /// 能否以同花色升序叠放在 `under` 之上（收牌区规则）。
    pub fn builds_up_on(&self, under: &Card) -> bool {
        self.suit == under.suit && self.rank == under.rank + 1
    }

    fn rank_label(&self) -> &'static str {
        const LABELS: [&str; 13] = [
            "A", "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K",
        ];
        LABELS
            .get(usize::from(self.rank.saturating_sub(1)))
            .copied()
            .unwrap_or("?")
    }

    /// 日志里用的短名，如 `10♦`。
    pub fn label(&self) -> String {
        format!("{}{}", self.rank_label(), self.suit.symbol())
    }
}

/// 按编号顺序生成的整副新牌，全部背面朝上。
pub fn fresh_deck() -> Vec<Card> {
    Suit::ALL
        .iter()
        .flat_map(|&suit| (ACE..=KING).map(move |rank| Card::new(suit, rank)))
        .collect()
}

/// 洗好的一副牌。`logo_keys` 非空时为每张牌随机挑一个装饰图标。
pub fn shuffled_deck<R: Rng + ?Sized>(rng: &mut R, logo_keys: &[String]) -> Vec<Card> {
    let mut deck = fresh_deck();
    deck.shuffle(rng);
    for card in &mut deck {
        card.logo_key = logo_keys.choose(rng).cloned();
    }
    deck
}
