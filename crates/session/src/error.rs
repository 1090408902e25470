use thiserror::Error;

use stockroom_core::DomainError;

use crate::storage::StorageError;

/// Failures surfaced by [`crate::SessionGate`] operations.
///
/// Malformed persisted sessions are not errors: they are cleaned up and the
/// gate carries on unauthenticated.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("could not encode session: {0}")]
    Encode(#[from] DomainError),

    /// A previous holder of the session lock panicked.
    #[error("session state lock poisoned")]
    Poisoned,
}
