//! Router/navigation seam.

use std::sync::Mutex;

/// Imperative navigation used by the gate to redirect.
///
/// `redirect` must not call back into the gate synchronously: the gate holds
/// its state lock while deciding, and a re-entrant evaluation would deadlock.
/// Redirecting to the path already displayed must be a no-op.
pub trait Navigator: Send + Sync {
    /// Path of the view currently displayed (query string allowed).
    fn current_path(&self) -> String;

    fn redirect(&self, path: &str);
}

/// Navigator that keeps its history in memory.
#[derive(Debug)]
pub struct MemoryNavigator {
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(vec![initial.into()]),
        }
    }

    /// User-initiated navigation (link click, address bar).
    pub fn visit(&self, path: impl Into<String>) {
        if let Ok(mut history) = self.history.lock() {
            history.push(path.into());
        }
    }

    /// Every path displayed so far, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.history
            .lock()
            .ok()
            .and_then(|history| history.last().cloned())
            .unwrap_or_else(|| "/".to_string())
    }

    fn redirect(&self, path: &str) {
        let Ok(mut history) = self.history.lock() else {
            return;
        };
        if history.last().map(String::as_str) != Some(path) {
            history.push(path.to_string());
        }
    }
}
