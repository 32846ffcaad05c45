pub mod ai;
pub mod config;
pub mod game;
pub mod logging;
pub mod session;
pub mod storage;
pub mod web;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::str::FromStr;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::from_value;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::js_sys::Date;

pub use ai::Hint;
pub use config::{DeckStyle, GameConfig, Settings};
pub use game::{
    Card, CardId, DrawMode, GameEvent, GameState, IntegrityError, PileId, RecordError,
    RuleEngine, RuleError, SavedGame, Suit,
};
pub use session::Session;
pub use storage::{MemoryStorage, Storage, StorageError};
pub use web::LocalStorage;

/// 计时器间隔。
const TICK_INTERVAL_MS: u32 = 1_000;

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    if logging::init().is_err() {
        web_sys::console::warn_1(&"logger was already installed".into());
    }
}

/// 以 JSON 兼容形式转换，映射输出为普通对象而非 `Map`。
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn to_js_error<E: Serialize + std::fmt::Display>(error: E) -> JsValue {
    to_js(&error).unwrap_or_else(|_| JsValue::from_str(&error.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_pile(name: &str) -> Result<PileId, JsValue> {
    PileId::from_str(name).map_err(|_| {
        to_js_error(RuleError::UnknownPile {
            name: name.to_string(),
        })
    })
}

/// 规则拒绝的操作对 JS 只是 `false`。
fn accepted(result: Result<(), RuleError>) -> bool {
    match result {
        Ok(()) => true,
        Err(error) => {
            log::debug!("rejected: {error}");
            false
        }
    }
}

/// 表现层使用的引擎对象。会话在引擎与计时循环之间共享。
#[wasm_bindgen]
pub struct SolitaireEngine {
    session: Rc<RefCell<Session<LocalStorage>>>,
    clock: Rc<Cell<u32>>,
}

impl Default for SolitaireEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl SolitaireEngine {
    /// 恢复本地存档，没有可用存档时开新局。
    #[wasm_bindgen(constructor)]
    pub fn new() -> SolitaireEngine {
        let session = Session::restore_or_new(LocalStorage::open());
        SolitaireEngine {
            session: Rc::new(RefCell::new(session)),
            clock: Rc::new(Cell::new(0)),
        }
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.borrow().state()).map_err(serde_to_js_error)
    }

    pub fn settings_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.borrow().settings()).map_err(serde_to_js_error)
    }

    pub fn set_settings_json(&mut self, json: &str) -> Result<(), JsValue> {
        let settings: Settings = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.session.borrow_mut().update_settings(settings);
        Ok(())
    }

    #[wasm_bindgen(js_name = "setLogoKeys")]
    pub fn set_logo_keys(&mut self, keys: JsValue) -> Result<(), JsValue> {
        let keys: Vec<String> = from_value(keys).map_err(JsValue::from)?;
        self.session.borrow_mut().set_logo_keys(keys);
        Ok(())
    }

    /// `config` 省略时按已保存的偏好开局。
    #[wasm_bindgen(js_name = "newGame")]
    pub fn new_game(&mut self, config: JsValue) -> Result<(), JsValue> {
        let mut session = self.session.borrow_mut();
        if config.is_undefined() || config.is_null() {
            session.new_game_from_settings();
        } else {
            let config: GameConfig = from_value(config).map_err(JsValue::from)?;
            session.new_game(config);
        }
        Ok(())
    }

    #[wasm_bindgen(js_name = "drawFromStock")]
    pub fn draw_from_stock(&mut self) -> bool {
        self.session.borrow_mut().draw()
    }

    #[wasm_bindgen(js_name = "attemptMove")]
    pub fn attempt_move(&mut self, card_ids: Vec<u8>, from: &str, to: &str) -> Result<bool, JsValue> {
        let from = parse_pile(from)?;
        let to = parse_pile(to)?;
        Ok(accepted(self.session.borrow_mut().attempt_move(&card_ids, from, to)))
    }

    #[wasm_bindgen(js_name = "autoMoveSingle")]
    pub fn auto_move_single(&mut self, card_id: u8) -> bool {
        accepted(self.session.borrow_mut().auto_move_single(card_id))
    }

    #[wasm_bindgen(js_name = "flipTopIfExposedFaceDown")]
    pub fn flip_top(&mut self, pile: &str) -> Result<bool, JsValue> {
        let pile = parse_pile(pile)?;
        Ok(accepted(self.session.borrow_mut().flip_top(pile)))
    }

    pub fn undo(&mut self) -> bool {
        self.session.borrow_mut().undo()
    }

    /// 提示的牌及其来源与去向；关闭提示或无可走时为 `null`。
    pub fn hint(&self) -> Result<JsValue, JsValue> {
        match self.session.borrow().hint() {
            Some(hint) => to_js(&hint),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = "hintCandidate")]
    pub fn hint_candidate(&self) -> Option<u8> {
        self.session.borrow().hint().map(|hint| hint.card_id)
    }

    #[wasm_bindgen(js_name = "topCardOf")]
    pub fn top_card_of(&self, pile: &str) -> Result<JsValue, JsValue> {
        let pile = parse_pile(pile)?;
        match self.session.borrow().top_card_of(pile) {
            Some(card) => to_js(card),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = "isLegalDestination")]
    pub fn is_legal_destination(&self, card_id: u8, pile: &str) -> Result<bool, JsValue> {
        let pile = parse_pile(pile)?;
        Ok(self.session.borrow().is_legal_destination(card_id, pile))
    }

    #[wasm_bindgen(js_name = "locationOf")]
    pub fn location_of(&self, card_id: u8) -> Option<String> {
        self.session
            .borrow()
            .location_of(card_id)
            .map(|pile| pile.to_string())
    }

    /// 取出并清空自上次调用以来的事件。
    #[wasm_bindgen(js_name = "takeEvents")]
    pub fn take_events(&mut self) -> Result<JsValue, JsValue> {
        let events = self.session.borrow_mut().take_events();
        to_js(&events)
    }

    pub fn tick(&mut self) -> bool {
        self.session.borrow_mut().tick(Date::now())
    }

    /// 启动每秒一次的计时循环。再次调用会让旧循环在下一拍退出。
    #[wasm_bindgen(js_name = "startClock")]
    pub fn start_clock(&self) {
        let generation = self.clock.get().wrapping_add(1);
        self.clock.set(generation);

        let clock = Rc::clone(&self.clock);
        let session = Rc::clone(&self.session);
        spawn_local(async move {
            loop {
                TimeoutFuture::new(TICK_INTERVAL_MS).await;
                if clock.get() != generation {
                    break;
                }
                match session.try_borrow_mut() {
                    Ok(mut session) => {
                        session.tick(Date::now());
                    }
                    Err(_) => log::debug!("session busy, skipping tick"),
                }
            }
        });
    }

    #[wasm_bindgen(js_name = "stopClock")]
    pub fn stop_clock(&self) {
        self.clock.set(self.clock.get().wrapping_add(1));
    }

    #[wasm_bindgen(js_name = "resetSavedGame")]
    pub fn reset_saved_game(&mut self) {
        self.session.borrow_mut().reset_saved_game();
    }
}

/// 发一局新牌并以存档 JSON 返回，不读写存储。
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state(draw_mode: u8, seed: Option<u32>) -> Result<String, JsValue> {
    let draw_mode = DrawMode::try_from(draw_mode).map_err(|message| JsValue::from_str(&message))?;
    let config = GameConfig {
        draw_mode,
        seed: seed.map(u64::from),
        ..GameConfig::default()
    };
    serde_json::to_string(&GameState::new_game(&config)).map_err(serde_to_js_error)
}

/// 校验一份存档 JSON；不合法时抛出错误说明。
#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(json: &str) -> Result<(), JsValue> {
    let saved: SavedGame = serde_json::from_str(json).map_err(serde_to_js_error)?;
    GameState::try_from(saved).map_err(serde_to_js_error)?;
    Ok(())
}

#[wasm_bindgen(js_name = "setLogLevel")]
pub fn set_log_level(level: &str) -> bool {
    logging::set_level(level).is_some()
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
