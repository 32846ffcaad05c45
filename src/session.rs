//! 会话控制：持有当前牌局、玩家偏好与存储，串起规则引擎、自动收牌与持久化。

use crate::ai::advisor::{self, Hint};
use crate::config::{GameConfig, Settings};
use crate::game::card::{Card, CardId};
use crate::game::pile::PileId;
use crate::game::rules::{RuleEngine, RuleError};
use crate::game::state::{GameEvent, GameState};
use crate::storage::{self, Storage};

/// 计时触发的存档之间的最小间隔。
pub const SAVE_THROTTLE_MS: f64 = 500.0;

/// 前沿节流：窗口内第一次请求立即放行，其余丢弃。
#[derive(Debug, Clone, Default)]
pub struct SaveThrottle {
    last_save_ms: Option<f64>,
}

impl SaveThrottle {
    pub fn ready(&mut self, now_ms: f64) -> bool {
        match self.last_save_ms {
            Some(last) if now_ms - last < SAVE_THROTTLE_MS && now_ms >= last => false,
            _ => {
                self.last_save_ms = Some(now_ms);
                true
            }
        }
    }
}

pub struct Session<S: Storage> {
    storage: S,
    settings: Settings,
    logo_keys: Vec<String>,
    state: GameState,
    auto_foundation: bool,
    throttle: SaveThrottle,
    events: Vec<GameEvent>,
}

impl<S: Storage> Session<S> {
    /// 读取偏好与存档；没有可用存档时按偏好开新局。
    pub fn restore_or_new(storage: S) -> Self {
        let mut settings = storage::load_settings(&storage);
        match storage::load_game(&storage) {
            Some(state) => {
                log::info!(
                    "restored game: score {}, {} moves, {}s",
                    state.score(),
                    state.moves(),
                    state.elapsed_sec()
                );
                settings.draw_mode = state.draw_mode();
                Self::assemble(storage, settings, state)
            }
            None => {
                let state = GameState::new_game(&GameConfig::from_settings(&settings, &[]));
                let mut session = Self::assemble(storage, settings, state);
                session.after_new_game();
                session
            }
        }
    }

    fn assemble(storage: S, settings: Settings, state: GameState) -> Self {
        Self {
            auto_foundation: settings.auto_foundation,
            storage,
            settings,
            logo_keys: Vec::new(),
            state,
            throttle: SaveThrottle::default(),
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn new_game(&mut self, config: GameConfig) {
        self.auto_foundation = config.auto_foundation;
        self.state = GameState::new_game(&config);
        log::debug!(
            "new game: draw {}, seed {:?}",
            config.draw_mode.count(),
            config.seed
        );
        self.after_new_game();
    }

    pub fn new_game_from_settings(&mut self) {
        let config = GameConfig::from_settings(&self.settings, &self.logo_keys);
        self.new_game(config);
    }

    fn after_new_game(&mut self) {
        self.events.clear();
        self.commit(Vec::new(), true);
    }

    /// 保存偏好；翻牌张数立即作用于当前牌局。
    pub fn update_settings(&mut self, settings: Settings) {
        if let Err(error) = storage::save_settings(&mut self.storage, &settings) {
            log::warn!("could not save settings: {error}");
        }
        self.auto_foundation = settings.auto_foundation;
        let draw_mode_changed = self.state.draw_mode() != settings.draw_mode;
        self.state.set_draw_mode(settings.draw_mode);
        self.settings = settings;
        if draw_mode_changed {
            self.persist();
        }
    }

    /// 装饰徽标列表，下一局开始时生效。
    pub fn set_logo_keys(&mut self, logo_keys: Vec<String>) {
        self.logo_keys = logo_keys;
    }

    pub fn draw(&mut self) -> bool {
        let events = RuleEngine::draw_from_stock(&mut self.state);
        let changed = !events.is_empty();
        if changed {
            self.commit(events, true);
        }
        changed
    }

    pub fn attempt_move(
        &mut self,
        cards: &[CardId],
        from: PileId,
        to: PileId,
    ) -> Result<(), RuleError> {
        let events = RuleEngine::attempt_move(&mut self.state, cards, from, to)?;
        self.commit(events, true);
        Ok(())
    }

    pub fn auto_move_single(&mut self, card_id: CardId) -> Result<(), RuleError> {
        let events = RuleEngine::auto_move_single(&mut self.state, card_id)?;
        self.commit(events, true);
        Ok(())
    }

    pub fn flip_top(&mut self, pile: PileId) -> Result<(), RuleError> {
        let events = RuleEngine::flip_top_if_exposed_face_down(&mut self.state, pile)?;
        self.commit(events, true);
        Ok(())
    }

    /// 撤销之后不跑自动收牌。
    pub fn undo(&mut self) -> bool {
        if !self.state.undo() {
            return false;
        }
        self.commit(vec![GameEvent::MoveUndone], false);
        true
    }

    pub fn hint(&self) -> Option<Hint> {
        if !self.settings.hints {
            return None;
        }
        advisor::hint(&self.state)
    }

    pub fn top_card_of(&self, pile: PileId) -> Option<&Card> {
        self.state.top_card_of(pile)
    }

    pub fn is_legal_destination(&self, card_id: CardId, pile: PileId) -> bool {
        self.state
            .card(card_id)
            .is_some_and(|card| RuleEngine::is_legal_destination(&self.state, card, pile))
    }

    pub fn location_of(&self, card_id: CardId) -> Option<PileId> {
        self.state.location_of(card_id)
    }

    /// 每秒一次。返回计时是否前进；存档受节流限制。
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if !self.state.tick() {
            return false;
        }
        if self.throttle.ready(now_ms) {
            self.persist();
        }
        true
    }

    /// 清除存档并按当前偏好开新局。
    pub fn reset_saved_game(&mut self) {
        if let Err(error) = storage::clear_game(&mut self.storage) {
            log::warn!("could not clear saved game: {error}");
        }
        self.new_game_from_settings();
    }

    /// 尽力写入存档，失败只记录日志。
    pub fn persist(&mut self) {
        if let Err(error) = storage::save_game(&mut self.storage, &self.state) {
            log::warn!("could not save game: {error}");
        }
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn commit(&mut self, events: Vec<GameEvent>, run_auto_foundation: bool) {
        self.events.extend(events);
        if run_auto_foundation && self.auto_foundation {
            let placed = RuleEngine::auto_foundation_pass(&mut self.state);
            self.events.extend(placed);
        }
        self.persist();
    }
}
