//! Role allow-list: which path prefixes each role may navigate to.
//!
//! This is a UX gate only. The API still authorizes every request; the table
//! here decides whether the client renders a route or redirects away from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult};

use crate::Role;

// ─────────────────────────────────────────────────────────────────────────────
// Route prefix
// ─────────────────────────────────────────────────────────────────────────────

/// A validated, absolute path prefix (`/orders`, `/`).
///
/// Trailing slashes are dropped on construction, except for the root prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoutePrefix(String);

impl RoutePrefix {
    pub fn new(prefix: impl Into<String>) -> DomainResult<Self> {
        let prefix = prefix.into();
        let trimmed = prefix.trim();
        if !trimmed.starts_with('/') {
            return Err(DomainError::validation(format!(
                "route prefix '{prefix}' must start with '/'"
            )));
        }
        if trimmed.contains(['?', '#']) {
            return Err(DomainError::validation(format!(
                "route prefix '{prefix}' must not carry a query or fragment"
            )));
        }

        let normalized = trimmed.trim_end_matches('/');
        if normalized.is_empty() {
            Ok(Self("/".to_string()))
        } else {
            Ok(Self(normalized.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Segment-aware prefix match.
    ///
    /// `/orders` matches `/orders` and `/orders/42` but not `/orders-archive`.
    /// The root prefix only matches the root path.
    pub fn matches(&self, path: &str) -> bool {
        let path = normalize_path(path);
        if self.0 == "/" {
            return path == "/";
        }
        match path.strip_prefix(self.0.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl TryFrom<String> for RoutePrefix {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoutePrefix> for String {
    fn from(value: RoutePrefix) -> Self {
        value.0
    }
}

impl core::fmt::Display for RoutePrefix {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip query string and fragment; an empty path is the root.
pub fn normalize_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    if path.is_empty() { "/" } else { path }
}

// ─────────────────────────────────────────────────────────────────────────────
// Policy table
// ─────────────────────────────────────────────────────────────────────────────

/// Static mapping from role to the path prefixes that role may open.
///
/// A role missing from the table may open nothing but public paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteAccessPolicy {
    routes: BTreeMap<Role, Vec<RoutePrefix>>,
}

impl RouteAccessPolicy {
    /// An empty table (every role is denied everything).
    pub fn empty() -> Self {
        Self {
            routes: BTreeMap::new(),
        }
    }

    /// Builder-style registration of a role's allow-list.
    pub fn with_role<I, P>(mut self, role: Role, prefixes: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let prefixes = prefixes
            .into_iter()
            .map(RoutePrefix::new)
            .collect::<DomainResult<Vec<_>>>()?;
        self.routes.insert(role, prefixes);
        Ok(self)
    }

    /// Parse a table from its JSON form: `{"admin": ["/", "/orders"], ...}`.
    pub fn from_json(raw: &str) -> DomainResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn prefixes(&self, role: Role) -> &[RoutePrefix] {
        self.routes.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.routes.keys().copied()
    }

    /// Whether `role` may open `path`.
    pub fn permits(&self, role: Role, path: &str) -> bool {
        self.prefixes(role).iter().any(|prefix| prefix.matches(path))
    }

    /// The prefix that grants `role` access to `path`, if any.
    pub fn matching_prefix(&self, role: Role, path: &str) -> Option<&RoutePrefix> {
        self.prefixes(role).iter().find(|prefix| prefix.matches(path))
    }

    /// Report in-app links that a role's allow-list would bounce.
    ///
    /// `links` maps each role to the paths its rendered navigation points to.
    /// The allow-list stays authoritative; this only lists the mismatches so
    /// they can be fixed on one side or the other.
    pub fn audit_links(&self, links: &BTreeMap<Role, Vec<String>>) -> Vec<LinkInconsistency> {
        let mut found = Vec::new();
        for (role, paths) in links {
            for path in paths {
                if !self.permits(*role, path) {
                    tracing::debug!(role = %role, path = %path, "link not covered by allow-list");
                    found.push(LinkInconsistency {
                        role: *role,
                        path: path.clone(),
                    });
                }
            }
        }
        found
    }
}

impl Default for RouteAccessPolicy {
    /// The allow-list shipped with the client.
    fn default() -> Self {
        let table: [(Role, &[&str]); 3] = [
            (
                Role::Admin,
                &[
                    "/",
                    "/dashboard",
                    "/products",
                    "/customers",
                    "/suppliers",
                    "/orders",
                    "/shipments",
                    "/payments",
                ],
            ),
            (
                Role::Customer,
                &["/", "/products", "/orders", "/payments", "/profile"],
            ),
            (Role::Supplier, &["/", "/orders", "/shipments", "/products"]),
        ];

        let routes = table
            .into_iter()
            .map(|(role, prefixes)| {
                let prefixes = prefixes
                    .iter()
                    .map(|p| RoutePrefix(p.to_string()))
                    .collect();
                (role, prefixes)
            })
            .collect();

        Self { routes }
    }
}

/// A rendered link that the linking role is not allowed to follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkInconsistency {
    pub role: Role,
    pub path: String,
}
