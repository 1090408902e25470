//! The signed-in user record as returned by the authentication endpoint.

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainResult, UserId};

use crate::Role;

/// Authenticated user, as cached by the client between page loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub contact_info: Option<String>,
    pub role: Role,
}

impl SessionUser {
    pub fn new(id: u64, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(id),
            name: name.into(),
            contact_info: None,
            role,
        }
    }

    pub fn with_contact_info(mut self, contact_info: impl Into<String>) -> Self {
        self.contact_info = Some(contact_info.into());
        self
    }

    /// Serialize into the persisted representation.
    pub fn to_json(&self) -> DomainResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a persisted record.
    ///
    /// Any decoding problem (bad JSON, missing fields, unknown role) is reported
    /// as [`stockroom_core::DomainError::Malformed`]. The name is free text and
    /// may be empty.
    pub fn from_json(raw: &str) -> DomainResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::DomainError;

    #[test]
    fn round_trips_through_persisted_form() {
        let user = SessionUser::new(1, "A", Role::Customer).with_contact_info("a@example.com");
        let raw = user.to_json().unwrap();
        assert_eq!(SessionUser::from_json(&raw).unwrap(), user);
    }

    #[test]
    fn contact_info_is_optional_in_stored_record() {
        let user = SessionUser::from_json(r#"{"id":3,"name":"Sam","role":"supplier"}"#).unwrap();
        assert_eq!(user.id, UserId::new(3));
        assert_eq!(user.contact_info, None);
        assert_eq!(user.role, Role::Supplier);
    }

    #[test]
    fn unknown_role_is_malformed() {
        let err = SessionUser::from_json(r#"{"id":3,"name":"Sam","role":"root"}"#).unwrap_err();
        assert!(matches!(err, DomainError::Malformed(_)));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            SessionUser::from_json("{not json"),
            Err(DomainError::Malformed(_))
        ));
        assert!(matches!(
            SessionUser::from_json(r#"{"id":3,"role":"admin"}"#),
            Err(DomainError::Malformed(_))
        ));
    }

    #[test]
    fn blank_name_survives_persisted_form() {
        let user = SessionUser::new(1, "", Role::Customer);
        let raw = user.to_json().unwrap();
        assert_eq!(SessionUser::from_json(&raw).unwrap(), user);
    }
}
