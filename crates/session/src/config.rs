//! Gate configuration: storage keys, well-known paths, role allow-list.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_auth::{RouteAccessPolicy, RoutePrefix, normalize_path};
use stockroom_core::DomainError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse gate config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid gate config: {0}")]
    Invalid(String),
}

impl From<DomainError> for ConfigError {
    fn from(value: DomainError) -> Self {
        Self::Invalid(value.to_string())
    }
}

/// Static configuration of the session gate.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Storage key holding the serialized user record.
    pub user_key: String,
    /// Storage key holding the opaque token.
    pub token_key: String,
    pub login_path: String,
    /// Default destination after login and after a role-denied route.
    pub home_path: String,
    /// Paths reachable without a session. Must contain `login_path`.
    pub public_paths: Vec<String>,
    pub policy: RouteAccessPolicy,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            user_key: "user".to_string(),
            token_key: "token".to_string(),
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
            public_paths: vec!["/login".to_string()],
            policy: RouteAccessPolicy::default(),
        }
    }
}

impl GateConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: GateConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_policy(mut self, policy: RouteAccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_key.is_empty() || self.token_key.is_empty() {
            return Err(ConfigError::Invalid("storage keys must not be empty".into()));
        }
        if self.user_key == self.token_key {
            return Err(ConfigError::Invalid(format!(
                "user and token share the storage key '{}'",
                self.user_key
            )));
        }
        for path in [&self.login_path, &self.home_path]
            .into_iter()
            .chain(self.public_paths.iter())
        {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!("path '{path}' must start with '/'")));
            }
        }
        if !self.is_public(&self.login_path) {
            return Err(ConfigError::Invalid(format!(
                "login path '{}' must be public",
                self.login_path
            )));
        }
        if self.is_public(&self.home_path) {
            return Err(ConfigError::Invalid(format!(
                "home path '{}' must not be public",
                self.home_path
            )));
        }
        Ok(())
    }

    /// Whether `path` is reachable without a session.
    ///
    /// Public paths match exactly (after stripping query and fragment and a
    /// trailing slash), never as prefixes.
    pub fn is_public(&self, path: &str) -> bool {
        let path = trim_trailing_slash(normalize_path(path));
        self.public_paths
            .iter()
            .any(|public| trim_trailing_slash(public) == path)
    }

    /// Role prefixes that are accepted by this config's policy for `path`.
    pub fn granting_prefix(&self, role: stockroom_auth::Role, path: &str) -> Option<&RoutePrefix> {
        self.policy.matching_prefix(role, path)
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_auth::Role;

    #[test]
    fn defaults_are_valid() {
        let config = GateConfig::default();
        config.validate().unwrap();
        assert!(config.is_public("/login"));
        assert!(config.is_public("/login/?next=/orders"));
        assert!(!config.is_public("/login/reset"));
        assert!(!config.is_public("/"));
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(GateConfig::from_json("{}").unwrap(), GateConfig::default());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config = GateConfig::from_json(
            r#"{"home_path": "/dashboard", "policy": {"admin": ["/dashboard"]}}"#,
        )
        .unwrap();
        assert_eq!(config.home_path, "/dashboard");
        assert_eq!(config.login_path, "/login");
        assert!(config.policy.permits(Role::Admin, "/dashboard"));
        assert!(config.granting_prefix(Role::Customer, "/dashboard").is_none());
    }

    #[test]
    fn login_must_be_public() {
        let err = GateConfig::from_json(r#"{"public_paths": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("/login")));
    }

    #[test]
    fn rejects_shared_storage_key() {
        let err = GateConfig::from_json(r#"{"user_key": "s", "token_key": "s"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_policy_prefix() {
        let err = GateConfig::from_json(r#"{"policy": {"admin": ["orders"]}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
