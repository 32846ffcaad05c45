//! 浏览器 `localStorage` 适配。

use wasm_bindgen::JsValue;

use crate::storage::{Storage, StorageError};

/// 打开失败（隐私模式、沙箱 iframe 等）时所有读写都返回 [`StorageError::Unavailable`]。
pub struct LocalStorage {
    inner: Option<web_sys::Storage>,
}

impl LocalStorage {
    pub fn open() -> Self {
        let inner = web_sys::window().and_then(|window| window.local_storage().ok().flatten());
        if inner.is_none() {
            log::warn!("localStorage is unavailable, progress will not be saved");
        }
        Self { inner }
    }

    pub fn is_available(&self) -> bool {
        self.inner.is_some()
    }

    fn backend(&self) -> Result<&web_sys::Storage, StorageError> {
        self.inner.as_ref().ok_or(StorageError::Unavailable)
    }
}

fn backend_error(value: JsValue) -> StorageError {
    StorageError::Backend(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

impl Storage for LocalStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.backend()?.get_item(key).map_err(backend_error)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.backend()?.set_item(key, value).map_err(backend_error)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.backend()?.remove_item(key).map_err(backend_error)
    }
}
