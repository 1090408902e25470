//! `stockroom-core` — shared building blocks for the Stockroom client.
//!
//! This crate contains **pure** primitives (no browser, storage or network concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::UserId;
