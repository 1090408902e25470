//! `localStorage` and history-API adapters.

use stockroom_session::{Navigator, SessionStorage, StorageError};
use wasm_bindgen::JsValue;

/// The window's `localStorage`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

fn local_storage() -> Result<web_sys::Storage, StorageError> {
    let window = web_sys::window()
        .ok_or_else(|| StorageError::Unavailable("no window object".to_string()))?;
    window
        .local_storage()
        .map_err(|e| StorageError::Unavailable(format!("{e:?}")))?
        .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))
}

fn rejected(key: &str, err: JsValue) -> StorageError {
    StorageError::Rejected {
        key: key.to_string(),
        reason: format!("{err:?}"),
    }
}

impl SessionStorage for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        local_storage()?.get_item(key).map_err(|e| rejected(key, e))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        local_storage()?.set_item(key, value).map_err(|e| rejected(key, e))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        local_storage()?.remove_item(key).map_err(|e| rejected(key, e))
    }
}

/// Navigates with `history.pushState` and lets the router catch up.
///
/// The router only learns about the new URL from a `popstate` event; that
/// event is dispatched from a spawned task so the router (and any effect that
/// re-evaluates the gate) runs after the gate has released its lock.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn current_path(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().pathname().ok())
            .unwrap_or_else(|| "/".to_string())
    }

    fn redirect(&self, path: &str) {
        if self.current_path() == path {
            return;
        }
        let Some(window) = web_sys::window() else {
            return;
        };

        let pushed = window
            .history()
            .and_then(|history| history.push_state_with_url(&JsValue::NULL, "", Some(path)));
        if let Err(err) = pushed {
            tracing::warn!(path, error = ?err, "history.pushState failed");
            return;
        }

        wasm_bindgen_futures::spawn_local(async {
            let Some(window) = web_sys::window() else {
                return;
            };
            if let Ok(event) = web_sys::PopStateEvent::new("popstate") {
                let _ = window.dispatch_event(&event);
            }
        });
    }
}
