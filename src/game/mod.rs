//! 游戏核心逻辑模块（牌与牌堆模型、规则引擎、撤销栈、存档记录）。

pub mod card;
pub mod history;
pub mod pile;
pub mod record;
pub mod rules;
pub mod state;

pub use card::{Card, CardId, Color, Suit, DECK_SIZE};
pub use history::{History, Snapshot, SnapshotReason, UNDO_LIMIT};
pub use pile::{Pile, PileId, PileKind, Piles};
pub use record::{RecordError, SavedGame, RECORD_VERSION};
pub use rules::{RuleEngine, RuleError};
pub use state::{DrawMode, GameEvent, GameState, IntegrityError};
