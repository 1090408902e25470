//! `stockroom-web`
//!
//! **Responsibility:** browser bindings for the session gate.
//!
//! This crate provides:
//! - `localStorage` as the gate's persisted store
//! - Browser history as the gate's navigator
//! - Leptos components that provide the gate and guard routes
//!
//! Everything here is `wasm32`-only; on native targets the crate is empty and
//! the gate is exercised through `stockroom-session` directly.

#[cfg(target_arch = "wasm32")]
pub mod browser;
#[cfg(target_arch = "wasm32")]
pub mod provider;

#[cfg(target_arch = "wasm32")]
pub use browser::{BrowserNavigator, LocalStorage};
#[cfg(target_arch = "wasm32")]
pub use provider::{Protected, SessionContext, SessionProvider, use_session};
