//! In-memory session state and the decisions derived from it.

use serde::Serialize;

use stockroom_auth::{AuthToken, Role, SessionUser};

/// The in-memory session. Only [`crate::SessionGate`] can construct or mutate it.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    user: Option<SessionUser>,
    token: Option<AuthToken>,
    loading: bool,
    revision: u64,
}

impl Session {
    pub(crate) fn loading() -> Self {
        Self {
            user: None,
            token: None,
            loading: true,
            revision: 0,
        }
    }

    /// Set both halves together; the pair is the unit of authentication.
    pub(crate) fn authenticate(&mut self, user: SessionUser, token: AuthToken) {
        self.user = Some(user);
        self.token = Some(token);
        self.revision += 1;
    }

    pub(crate) fn clear(&mut self) {
        self.user = None;
        self.token = None;
        self.revision += 1;
    }

    pub(crate) fn finish_loading(&mut self) {
        if self.loading {
            self.loading = false;
            self.revision += 1;
        }
    }

    pub(crate) fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub(crate) fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn view(&self) -> SessionView {
        SessionView {
            user: self.user.clone(),
            loading: self.loading,
        }
    }
}

/// What consumers see of the session.
///
/// `loading` is a third state: while it is set, consumers must not decide
/// between "signed in" and "signed out".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub user: Option<SessionUser>,
    pub loading: bool,
}

impl SessionView {
    pub fn is_authenticated(&self) -> bool {
        !self.loading && self.user.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|user| user.role)
    }
}

/// Outcome of one route-access evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "target", rename_all = "snake_case")]
pub enum AccessDecision {
    /// Bootstrap has not completed; nothing was decided.
    Loading,
    Allow,
    /// Credentials found in storage were adopted; no redirect this pass.
    Adopted,
    RedirectToLogin(String),
    RedirectToHome(String),
}

impl AccessDecision {
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            AccessDecision::RedirectToLogin(target) | AccessDecision::RedirectToHome(target) => {
                Some(target)
            }
            _ => None,
        }
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect_target().is_some()
    }
}
