//! 存档记录：牌局的纯数据形式，带整数版本号。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::card::{Card, CardId};
use super::history::History;
use super::pile::Piles;
use super::state::{check_layout, DrawMode, GameState, IntegrityError};

/// 当前存档格式版本。
pub const RECORD_VERSION: u32 = 1;

/// 全部字段必填；缺字段的记录按损坏处理。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SavedGame {
    pub version: u32,
    pub cards: BTreeMap<CardId, Card>,
    pub piles: Piles,
    pub score: u32,
    pub moves: u32,
    pub elapsed_sec: u64,
    pub draw_mode: DrawMode,
    pub won: bool,
    pub undo: History,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("unsupported save version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("saved layout is inconsistent: {0}")]
    Integrity(#[from] IntegrityError),
    #[error("undo snapshot {index} is inconsistent: {error}")]
    Snapshot { index: usize, error: IntegrityError },
}

impl From<GameState> for SavedGame {
    fn from(state: GameState) -> Self {
        Self {
            version: RECORD_VERSION,
            cards: state.cards.into_iter().map(|card| (card.id, card)).collect(),
            piles: state.piles,
            score: state.score,
            moves: state.moves,
            elapsed_sec: state.elapsed_sec,
            draw_mode: state.draw_mode,
            won: state.won,
            undo: state.history,
        }
    }
}

impl TryFrom<SavedGame> for GameState {
    type Error = RecordError;

    fn try_from(saved: SavedGame) -> Result<Self, Self::Error> {
        if saved.version != RECORD_VERSION {
            return Err(RecordError::UnsupportedVersion {
                found: saved.version,
                expected: RECORD_VERSION,
            });
        }

        let cards: Vec<Card> = saved.cards.into_values().collect();
        check_layout(&cards, &saved.piles, saved.won)?;

        let mut undo = saved.undo;
        let dropped = undo.enforce_limit();
        if dropped > 0 {
            log::warn!("saved undo history was {dropped} entries over the limit, dropped the oldest");
        }
        for (index, snapshot) in undo.iter().enumerate() {
            check_layout(&snapshot.cards, &snapshot.piles, snapshot.won)
                .map_err(|error| RecordError::Snapshot { index, error })?;
        }

        Ok(GameState::from_parts(
            cards,
            saved.piles,
            saved.score,
            saved.moves,
            saved.elapsed_sec,
            saved.draw_mode,
            saved.won,
            undo,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::history::UNDO_LIMIT;
    use crate::game::pile::PileId;
    use crate::game::rules::RuleEngine;

    fn played() -> GameState {
        let mut state = GameState::new_game(&GameConfig {
            seed: Some(2024),
            ..GameConfig::default()
        });
        RuleEngine::draw_from_stock(&mut state);
        RuleEngine::draw_from_stock(&mut state);
        state.tick();
        state
    }

    #[test]
    fn json_round_trip_reproduces_state() {
        let state = played();
        let json = serde_json::to_string(&state).expect("state serializes");
        let restored: GameState = serde_json::from_str(&json).expect("state deserializes");
        assert_eq!(restored, state);
        assert_eq!(restored.history().len(), 2);
        for (pile_id, pile) in restored.piles().iter() {
            for card_id in pile.iter() {
                assert_eq!(restored.location_of(card_id), Some(pile_id));
            }
        }
    }

    #[test]
    fn record_carries_version_and_named_piles() {
        let value = serde_json::to_value(played()).expect("state serializes");
        assert_eq!(value["version"], serde_json::json!(RECORD_VERSION));
        assert_eq!(value["drawMode"], serde_json::json!(1));
        assert_eq!(value["elapsedSec"], serde_json::json!(1));
        assert!(value["cards"]["0"]["faceUp"].is_boolean());
        assert!(value["piles"]["t6"].is_array());
        assert!(value["cards"]["51"].is_object());
    }

    #[test]
    fn stale_version_is_rejected() {
        let mut value = serde_json::to_value(played()).expect("state serializes");
        value["version"] = serde_json::json!(2);
        let error = serde_json::from_value::<GameState>(value).expect_err("version 2 is unknown");
        assert!(error.to_string().contains("unsupported save version"));
    }

    #[test]
    fn inconsistent_layout_is_rejected() {
        let mut saved = SavedGame::from(played());
        let stolen = saved.piles[PileId::Stock].pop().expect("stock has cards");
        saved.piles[PileId::Waste].push(stolen);
        saved.piles[PileId::Waste].push(stolen);
        assert_eq!(
            GameState::try_from(saved),
            Err(RecordError::Integrity(IntegrityError::DuplicateCard {
                card_id: stolen
            }))
        );
    }

    #[test]
    fn corrupt_snapshot_is_rejected() {
        let mut saved = SavedGame::from(played());
        let mut value = serde_json::to_value(&saved.undo).expect("history serializes");
        value[0]["won"] = serde_json::json!(true);
        saved.undo = serde_json::from_value(value).expect("history deserializes");
        assert!(matches!(
            GameState::try_from(saved),
            Err(RecordError::Snapshot { index: 0, .. })
        ));
    }

    #[test]
    fn incomplete_record_is_rejected() {
        for field in ["score", "moves", "elapsedSec", "drawMode", "won", "undo"] {
            let mut value = serde_json::to_value(played()).expect("state serializes");
            let removed = value
                .as_object_mut()
                .and_then(|record| record.remove(field));
            assert!(removed.is_some(), "record has `{field}`");
            assert!(
                serde_json::from_value::<GameState>(value).is_err(),
                "a record without `{field}` must not load"
            );
        }
    }

    #[test]
    fn oversized_history_keeps_newest_snapshots() {
        let mut saved = SavedGame::from(played());
        let mut value = serde_json::to_value(&saved.undo).expect("history serializes");
        let entries = value.as_array_mut().expect("history is an array");
        let mut padded: Vec<serde_json::Value> = (0..200).map(|_| entries[0].clone()).collect();
        padded.push(entries[1].clone());
        *entries = padded;
        saved.undo = serde_json::from_value(value).expect("history deserializes");
        let newest = saved.undo.iter().last().cloned();

        let state = GameState::try_from(saved).expect("oversized history still loads");

        assert_eq!(state.history().len(), UNDO_LIMIT);
        assert_eq!(state.history().iter().last().cloned(), newest);
    }

    #[test]
    fn misfaced_cards_are_rejected() {
        let mut saved = SavedGame::from(played());
        let stock_top = saved.piles[PileId::Stock].top().expect("stock has cards");
        if let Some(card) = saved.cards.get_mut(&stock_top) {
            card.face_up = true;
        }
        assert_eq!(
            GameState::try_from(saved),
            Err(RecordError::Integrity(IntegrityError::WrongFacing {
                pile: PileId::Stock,
                card_id: stock_top
            }))
        );
    }
}
