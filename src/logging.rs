//! 浏览器控制台日志：把 `log` 门面的记录转发到 `console.*`。

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use wasm_bindgen::JsValue;
use web_sys::console;

/// 未指定时的默认级别。
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

pub struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format_record(record));
        match record.level() {
            Level::Error => console::error_1(&line),
            Level::Warn => console::warn_1(&line),
            Level::Info => console::info_1(&line),
            Level::Debug | Level::Trace => console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

pub fn format_record(record: &Record) -> String {
    format!("[{}] {}: {}", record.level(), record.target(), record.args())
}

pub fn init() -> Result<(), SetLoggerError> {
    init_with_level(DEFAULT_LEVEL)
}

/// 安装日志器。重复安装返回错误，但级别仍会更新。
pub fn init_with_level(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_max_level(level);
    log::set_logger(&LOGGER)
}

/// 运行时调整级别，接受 `off`、`error`…`trace`（不区分大小写）。
pub fn set_level(name: &str) -> Option<LevelFilter> {
    let level = name.parse::<LevelFilter>().ok()?;
    log::set_max_level(level);
    Some(level)
}
