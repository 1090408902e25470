//! `stockroom-auth` — pure authentication/authorization model for the client.
//!
//! This crate is intentionally decoupled from the browser and from storage:
//! it knows what a signed-in user looks like and which routes each role may
//! open, nothing more.

pub mod policy;
pub mod roles;
pub mod token;
pub mod user;

pub use policy::{LinkInconsistency, RouteAccessPolicy, RoutePrefix, normalize_path};
pub use roles::Role;
pub use token::AuthToken;
pub use user::SessionUser;
