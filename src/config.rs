//! 玩家偏好与开局配置。

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::game::state::DrawMode;

/// 牌面装饰风格，只影响表现层。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeckStyle {
    /// 每张牌随机分配一个装饰徽标。
    #[default]
    MlbRandom,
    Classic,
}

impl DeckStyle {
    pub fn uses_logos(self) -> bool {
        matches!(self, DeckStyle::MlbRandom)
    }
}

impl FromStr for DeckStyle {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mlb_random" | "mlb" => Ok(DeckStyle::MlbRandom),
            "classic" => Ok(DeckStyle::Classic),
            _ => Err(()),
        }
    }
}

/// 持久化的玩家偏好。缺失字段取默认值。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub draw_mode: DrawMode,
    pub hints: bool,
    pub auto_foundation: bool,
    pub deck_style: DeckStyle,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            draw_mode: DrawMode::One,
            hints: true,
            auto_foundation: false,
            deck_style: DeckStyle::MlbRandom,
        }
    }
}

/// 开一局新牌所需的全部参数。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    pub draw_mode: DrawMode,
    pub auto_foundation: bool,
    /// 固定种子时发牌可复现。
    pub seed: Option<u64>,
    /// 可供随机分配的装饰徽标；为空时牌面不带徽标。
    pub logo_keys: Vec<String>,
}

impl GameConfig {
    /// 依据偏好生成配置；经典牌面忽略徽标列表。
    pub fn from_settings(settings: &Settings, logo_keys: &[String]) -> Self {
        let logo_keys = if settings.deck_style.uses_logos() {
            logo_keys.to_vec()
        } else {
            Vec::new()
        };
        Self {
            draw_mode: settings.draw_mode,
            auto_foundation: settings.auto_foundation,
            seed: None,
            logo_keys,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
