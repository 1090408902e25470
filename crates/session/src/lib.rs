//! `stockroom-session` — the client-side session gate.
//!
//! **Responsibility:** single source of truth for "who is signed in" and
//! "may the requested route be shown".
//!
//! This crate provides:
//! - Session bootstrap from persisted storage (with cleanup of broken records)
//! - Login / logout as the only mutation paths
//! - Role-based route evaluation with idempotent redirects
//! - A broadcast of session changes and a guard that re-evaluates on each one
//!
//! Storage and navigation are traits so the same gate runs in the browser
//! (`stockroom-web`) and in native tests.

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod gate;
pub mod guard;
pub mod navigator;
pub mod state;
pub mod storage;

pub use config::{ConfigError, GateConfig};
pub use error::GateError;
pub use events::{SessionBus, SessionEvent, SessionEventKind, Subscription};
pub use gate::{SessionGate, SessionHandle};
pub use guard::RouteGuard;
pub use navigator::{MemoryNavigator, Navigator};
pub use state::{AccessDecision, SessionView};
pub use storage::{InMemoryStorage, SessionStorage, StorageError};
