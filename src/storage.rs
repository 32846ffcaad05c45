//! 键值存储边界：存档与偏好的读写。浏览器端实现见 `web` 模块。

use std::collections::HashMap;

use crate::config::Settings;
use crate::game::GameState;

pub const GAME_KEY: &str = "solitaire_pwa_v1_state";
pub const SETTINGS_KEY: &str = "solitaire_pwa_v1_settings";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage is not available")]
    Unavailable,
    #[error("storage backend failed: {0}")]
    Backend(String),
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait Storage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// 内存实现，用于原生环境和测试。
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    read_only: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有写入都失败，模拟配额已满或隐私模式。
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::Backend(format!("`{key}` is read-only")));
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::Backend(format!("`{key}` is read-only")));
        }
        self.entries.remove(key);
        Ok(())
    }
}

pub fn save_game<S: Storage + ?Sized>(storage: &mut S, state: &GameState) -> Result<(), StorageError> {
    let json = serde_json::to_string(state)?;
    storage.write(GAME_KEY, &json)
}

/// 读取存档。缺失、损坏或版本不符的记录一律视为没有存档。
pub fn load_game<S: Storage + ?Sized>(storage: &S) -> Option<GameState> {
    let raw = match storage.read(GAME_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(error) => {
            log::warn!("could not read saved game: {error}");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(state) => Some(state),
        Err(error) => {
            log::warn!("discarding saved game: {error}");
            None
        }
    }
}

pub fn clear_game<S: Storage + ?Sized>(storage: &mut S) -> Result<(), StorageError> {
    storage.remove(GAME_KEY)
}

pub fn save_settings<S: Storage + ?Sized>(
    storage: &mut S,
    settings: &Settings,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(settings)?;
    storage.write(SETTINGS_KEY, &json)
}

/// 读取偏好；无法解析时整体回落到默认值。
pub fn load_settings<S: Storage + ?Sized>(storage: &S) -> Settings {
    match storage.read(SETTINGS_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|error| {
            log::warn!("ignoring unreadable settings: {error}");
            Settings::default()
        }),
        Ok(None) => Settings::default(),
        Err(error) => {
            log::warn!("could not read settings: {error}");
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeckStyle, GameConfig};
    use crate::game::state::DrawMode;

    fn seeded() -> GameState {
        GameState::new_game(&GameConfig {
            seed: Some(77),
            ..GameConfig::default()
        })
    }

    #[test]
    fn saved_game_loads_back() {
        let mut storage = MemoryStorage::new();
        let state = seeded();
        save_game(&mut storage, &state).expect("memory storage accepts writes");
        assert_eq!(load_game(&storage), Some(state));

        clear_game(&mut storage).expect("memory storage accepts removes");
        assert_eq!(load_game(&storage), None);
    }

    #[test]
    fn corrupt_or_foreign_records_are_absent() {
        let mut storage = MemoryStorage::new();
        storage.write(GAME_KEY, "{not json").expect("write");
        assert_eq!(load_game(&storage), None);

        let mut value = serde_json::to_value(seeded()).expect("state serializes");
        value["version"] = serde_json::json!(0);
        storage.write(GAME_KEY, &value.to_string()).expect("write");
        assert_eq!(load_game(&storage), None);
    }

    #[test]
    fn truncated_record_is_absent() {
        let mut storage = MemoryStorage::new();
        let mut value = serde_json::to_value(seeded()).expect("state serializes");
        if let Some(record) = value.as_object_mut() {
            record.remove("score");
            record.remove("undo");
        }
        storage.write(GAME_KEY, &value.to_string()).expect("write");
        assert_eq!(load_game(&storage), None);
    }

    #[test]
    fn settings_fall_back_to_defaults() {
        let mut storage = MemoryStorage::new();
        assert_eq!(load_settings(&storage), Settings::default());

        storage.write(SETTINGS_KEY, "[]").expect("write");
        assert_eq!(load_settings(&storage), Settings::default());

        let custom = Settings {
            draw_mode: DrawMode::Three,
            hints: false,
            auto_foundation: true,
            deck_style: DeckStyle::Classic,
        };
        save_settings(&mut storage, &custom).expect("write");
        assert_eq!(load_settings(&storage), custom);
        assert!(storage
            .get(SETTINGS_KEY)
            .is_some_and(|raw| raw.contains("\"deckStyle\":\"classic\"")));
    }

    #[test]
    fn read_only_storage_reports_backend_error() {
        let mut storage = MemoryStorage::read_only();
        assert!(matches!(
            save_game(&mut storage, &seeded()),
            Err(StorageError::Backend(_))
        ));
        assert_eq!(load_game(&storage), None);
    }
}
