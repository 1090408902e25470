//! The session gate: sole writer of session state and sole decider of
//! redirect-on-denial.

use std::sync::{Arc, Mutex, MutexGuard};

use stockroom_auth::{AuthToken, SessionUser, normalize_path};

use crate::config::GateConfig;
use crate::error::GateError;
use crate::events::{SessionBus, SessionEvent, SessionEventKind, Subscription};
use crate::navigator::Navigator;
use crate::state::{AccessDecision, Session, SessionView};
use crate::storage::SessionStorage;

/// Shared handle to the gate, handed to every consumer.
pub type SessionHandle = Arc<SessionGate>;

/// Result of reading persisted credentials.
enum Persisted {
    Valid(SessionUser, AuthToken),
    Missing,
}

/// Marker of the last redirect issued, for idempotent evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RedirectMark {
    revision: u64,
    requested: String,
    target: String,
}

#[derive(Debug)]
struct GateState {
    session: Session,
    /// Set by login; consumed by `complete_login`.
    home_redirect_pending: bool,
    last_redirect: Option<RedirectMark>,
}

/// Client-side authentication/authorization gate.
///
/// All decisions run while holding the state lock, so evaluations are strictly
/// sequential and never interleave with a login or logout.
pub struct SessionGate {
    config: GateConfig,
    storage: Arc<dyn SessionStorage>,
    navigator: Arc<dyn Navigator>,
    bus: SessionBus,
    state: Mutex<GateState>,
}

impl core::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionGate")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SessionGate {
    /// Create a gate in the loading state. Call [`SessionGate::bootstrap`] next.
    pub fn new(
        config: GateConfig,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            storage,
            navigator,
            bus: SessionBus::new(),
            state: Mutex::new(GateState {
                session: Session::loading(),
                home_redirect_pending: false,
                last_redirect: None,
            }),
        }
    }

    pub fn into_handle(self) -> SessionHandle {
        Arc::new(self)
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    pub fn subscribe(&self) -> Subscription<SessionEvent> {
        self.bus.subscribe()
    }

    fn lock(&self) -> Result<MutexGuard<'_, GateState>, GateError> {
        self.state.lock().map_err(|_| GateError::Poisoned)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn view(&self) -> Result<SessionView, GateError> {
        Ok(self.lock()?.session.view())
    }

    /// Token to attach to API calls, if signed in.
    pub fn token(&self) -> Result<Option<AuthToken>, GateError> {
        Ok(self.lock()?.session.token().cloned())
    }

    pub fn revision(&self) -> Result<u64, GateError> {
        Ok(self.lock()?.session.revision())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bootstrap
    // ─────────────────────────────────────────────────────────────────────────

    /// One-time read of persisted credentials.
    ///
    /// Broken or half-written records are deleted and the session stays empty.
    /// `loading` flips to false as the last step. Later calls are no-ops.
    pub fn bootstrap(&self) -> Result<SessionView, GateError> {
        let mut state = self.lock()?;
        if !state.session.is_loading() {
            return Ok(state.session.view());
        }

        if let Persisted::Valid(user, token) = self.read_persisted() {
            tracing::debug!(user_id = %user.id, role = %user.role, "restored persisted session");
            state.session.authenticate(user, token);
        }

        state.session.finish_loading();
        let revision = state.session.revision();
        self.bus
            .publish(SessionEvent::new(SessionEventKind::Bootstrapped, revision));

        Ok(state.session.view())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Route access
    // ─────────────────────────────────────────────────────────────────────────

    /// Decide whether `requested` may be shown and redirect if not.
    ///
    /// Re-running with unchanged session and path issues no further redirect.
    pub fn evaluate(&self, requested: &str) -> Result<AccessDecision, GateError> {
        let mut state = self.lock()?;
        if state.session.is_loading() {
            return Ok(AccessDecision::Loading);
        }

        let path = normalize_path(requested);

        if self.config.is_public(path) {
            return Ok(AccessDecision::Allow);
        }

        let Some(role) = state.session.user().map(|user| user.role) else {
            // Login may have written storage without this gate seeing it yet.
            if let Persisted::Valid(user, token) = self.read_persisted() {
                tracing::debug!(user_id = %user.id, "adopted persisted session");
                state.session.authenticate(user, token);
                let revision = state.session.revision();
                self.bus
                    .publish(SessionEvent::new(SessionEventKind::Adopted, revision));
                return Ok(AccessDecision::Adopted);
            }

            let target = self.config.login_path.clone();
            tracing::debug!(path, to = %target, "unauthenticated; redirecting");
            self.redirect(&mut state, path, &target);
            return Ok(AccessDecision::RedirectToLogin(target));
        };

        match self.config.granting_prefix(role, path) {
            Some(prefix) => {
                tracing::trace!(path, role = %role, prefix = %prefix, "route allowed");
                Ok(AccessDecision::Allow)
            }
            None => {
                let target = self.config.home_path.clone();
                tracing::debug!(path, role = %role, to = %target, "route not in allow-list");
                self.redirect(&mut state, path, &target);
                Ok(AccessDecision::RedirectToHome(target))
            }
        }
    }

    fn redirect(&self, state: &mut GateState, requested: &str, target: &str) {
        let mark = RedirectMark {
            revision: state.session.revision(),
            requested: requested.to_string(),
            target: target.to_string(),
        };
        if state.last_redirect.as_ref() == Some(&mark) {
            return;
        }
        self.navigator.redirect(target);
        state.last_redirect = Some(mark);
    }

    /// Issue the post-login redirect home.
    ///
    /// Called in reaction to the `LoggedIn` event carrying `revision`, so the
    /// authenticated state is already visible. Returns `false` (and does
    /// nothing) when the login was superseded or its redirect already issued.
    pub fn complete_login(&self, revision: u64) -> Result<bool, GateError> {
        let mut state = self.lock()?;
        let current = state.session.revision();
        if !state.home_redirect_pending || current != revision || state.session.user().is_none() {
            return Ok(false);
        }

        state.home_redirect_pending = false;
        let target = self.config.home_path.clone();
        tracing::debug!(to = %target, "post-login redirect");
        self.navigator.redirect(&target);
        state.last_redirect = Some(RedirectMark {
            revision: current,
            requested: target.clone(),
            target,
        });
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Login / logout
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist and adopt credentials already validated by the auth endpoint.
    ///
    /// The redirect home is not issued here: subscribers react to `LoggedIn`
    /// by calling [`SessionGate::complete_login`].
    pub fn login(&self, user: SessionUser, token: AuthToken) -> Result<(), GateError> {
        let raw = user.to_json()?;
        let mut state = self.lock()?;

        let previous_user = self.storage.get(&self.config.user_key)?;
        let previous_token = self.storage.get(&self.config.token_key)?;

        let written = self
            .storage
            .set(&self.config.user_key, &raw)
            .and_then(|()| self.storage.set(&self.config.token_key, token.as_str()));
        if let Err(err) = written {
            // Put back whatever pair was there so storage keeps matching memory.
            self.restore(&self.config.user_key, previous_user.as_deref());
            self.restore(&self.config.token_key, previous_token.as_deref());
            return Err(err.into());
        }

        tracing::info!(user_id = %user.id, role = %user.role, "signed in");
        state.session.finish_loading();
        state.session.authenticate(user, token);
        state.home_redirect_pending = true;

        let revision = state.session.revision();
        self.bus
            .publish(SessionEvent::new(SessionEventKind::LoggedIn, revision));
        Ok(())
    }

    /// Clear the session, delete persisted credentials, go to the login page.
    ///
    /// Without a signed-in user the session, its revision and the event stream
    /// are left alone.
    pub fn logout(&self) -> Result<(), GateError> {
        let mut state = self.lock()?;

        if let Some(user) = state.session.user() {
            tracing::info!(user_id = %user.id, "signed out");
            state.session.clear();
            state.home_redirect_pending = false;

            let revision = state.session.revision();
            self.bus
                .publish(SessionEvent::new(SessionEventKind::LoggedOut, revision));
        }
        self.clear_persisted();

        self.navigator.redirect(&self.config.login_path);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────

    /// Read both persisted entries; anything short of a valid pair is cleaned up.
    fn read_persisted(&self) -> Persisted {
        let user = self.storage.get(&self.config.user_key);
        let token = self.storage.get(&self.config.token_key);

        let (user, token) = match (user, token) {
            (Ok(user), Ok(token)) => (user, token),
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(error = %err, "session storage unreadable; treating as signed out");
                return Persisted::Missing;
            }
        };

        match (user, token) {
            (None, None) => Persisted::Missing,
            (Some(raw), Some(token)) => match SessionUser::from_json(&raw) {
                Ok(user) => Persisted::Valid(user, AuthToken::new(token)),
                Err(err) => {
                    tracing::warn!(error = %err, "discarding malformed persisted session");
                    self.clear_persisted();
                    Persisted::Missing
                }
            },
            _ => {
                tracing::warn!("discarding half-written persisted session");
                self.clear_persisted();
                Persisted::Missing
            }
        }
    }

    fn restore(&self, key: &str, previous: Option<&str>) {
        let restored = match previous {
            Some(value) => self.storage.set(key, value),
            None => self.storage.remove(key),
        };
        if let Err(err) = restored {
            tracing::warn!(key, error = %err, "failed to restore persisted session entry");
        }
    }

    fn clear_persisted(&self) {
        for key in [&self.config.user_key, &self.config.token_key] {
            if let Err(err) = self.storage.remove(key) {
                tracing::warn!(key = %key, error = %err, "failed to delete persisted session entry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::MemoryNavigator;
    use crate::storage::InMemoryStorage;
    use stockroom_auth::{Role, RouteAccessPolicy};

    struct Fixture {
        gate: SessionGate,
        storage: Arc<InMemoryStorage>,
        nav: Arc<MemoryNavigator>,
    }

    fn fixture(storage: InMemoryStorage, at: &str) -> Fixture {
        let storage = Arc::new(storage);
        let nav = Arc::new(MemoryNavigator::new(at));
        let gate = SessionGate::new(GateConfig::default(), storage.clone(), nav.clone());
        Fixture { gate, storage, nav }
    }

    fn customer() -> SessionUser {
        SessionUser::new(1, "A", Role::Customer)
    }

    fn persisted(user: &SessionUser, token: &str) -> InMemoryStorage {
        InMemoryStorage::new()
            .with_entry("user", user.to_json().unwrap())
            .with_entry("token", token)
    }

    #[test]
    fn bootstrap_without_entries_is_signed_out() {
        let f = fixture(InMemoryStorage::new(), "/");
        assert!(f.gate.view().unwrap().loading);

        let view = f.gate.bootstrap().unwrap();
        assert!(!view.loading);
        assert_eq!(view.user, None);
    }

    #[test]
    fn bootstrap_restores_valid_session() {
        let f = fixture(persisted(&customer(), "t"), "/");

        let view = f.gate.bootstrap().unwrap();
        assert!(!view.loading);
        assert_eq!(view.user, Some(customer()));
        assert_eq!(f.gate.token().unwrap(), Some(AuthToken::new("t")));
    }

    #[test]
    fn bootstrap_deletes_unparseable_user() {
        let storage = InMemoryStorage::new()
            .with_entry("user", "{broken")
            .with_entry("token", "t");
        let f = fixture(storage, "/");

        let view = f.gate.bootstrap().unwrap();
        assert_eq!(view.user, None);
        assert!(f.storage.is_empty());
    }

    #[test]
    fn bootstrap_deletes_orphan_token() {
        let f = fixture(InMemoryStorage::new().with_entry("token", "t"), "/");
        f.gate.bootstrap().unwrap();
        assert!(f.storage.is_empty());
    }

    #[test]
    fn bootstrap_runs_once() {
        let f = fixture(InMemoryStorage::new(), "/");
        let events = f.gate.subscribe();
        f.gate.bootstrap().unwrap();
        f.gate.bootstrap().unwrap();
        assert_eq!(events.drain().len(), 1);
    }

    #[test]
    fn evaluation_waits_for_bootstrap() {
        let f = fixture(InMemoryStorage::new(), "/orders");
        assert_eq!(f.gate.evaluate("/orders").unwrap(), AccessDecision::Loading);
        assert_eq!(f.nav.history(), vec!["/orders"]);
    }

    #[test]
    fn login_path_never_redirects() {
        let f = fixture(InMemoryStorage::new(), "/login");
        f.gate.bootstrap().unwrap();
        assert_eq!(f.gate.evaluate("/login").unwrap(), AccessDecision::Allow);

        f.gate.login(customer(), AuthToken::new("t")).unwrap();
        assert_eq!(f.gate.evaluate("/login").unwrap(), AccessDecision::Allow);
        assert_eq!(f.nav.history(), vec!["/login"]);
    }

    #[test]
    fn unauthenticated_request_redirects_to_login_once() {
        let f = fixture(InMemoryStorage::new(), "/orders");
        f.gate.bootstrap().unwrap();

        let first = f.gate.evaluate("/orders").unwrap();
        let second = f.gate.evaluate("/orders").unwrap();
        assert_eq!(first, AccessDecision::RedirectToLogin("/login".into()));
        assert_eq!(second, first);
        assert_eq!(f.nav.history(), vec!["/orders", "/login"]);
    }

    #[test]
    fn adopts_credentials_written_behind_its_back() {
        let f = fixture(InMemoryStorage::new(), "/orders");
        f.gate.bootstrap().unwrap();

        f.storage.set("user", &customer().to_json().unwrap()).unwrap();
        f.storage.set("token", "t").unwrap();

        assert_eq!(f.gate.evaluate("/orders").unwrap(), AccessDecision::Adopted);
        assert_eq!(f.gate.view().unwrap().user, Some(customer()));
        assert_eq!(f.nav.history(), vec!["/orders"]);
        assert_eq!(f.gate.evaluate("/orders").unwrap(), AccessDecision::Allow);
    }

    #[test]
    fn supplier_allow_list() {
        let policy = RouteAccessPolicy::empty()
            .with_role(Role::Supplier, ["/", "/orders", "/shipments", "/products"])
            .unwrap();
        let storage = Arc::new(persisted(&SessionUser::new(9, "S", Role::Supplier), "t"));
        let nav = Arc::new(MemoryNavigator::new("/"));
        let gate = SessionGate::new(
            GateConfig::default().with_policy(policy),
            storage,
            nav.clone(),
        );
        gate.bootstrap().unwrap();

        assert_eq!(
            gate.evaluate("/customers").unwrap(),
            AccessDecision::RedirectToHome("/".into())
        );
        assert_eq!(gate.evaluate("/orders/42").unwrap(), AccessDecision::Allow);
    }

    #[test]
    fn login_persists_and_defers_redirect() {
        let f = fixture(InMemoryStorage::new(), "/login");
        f.gate.bootstrap().unwrap();
        let events = f.gate.subscribe();

        f.gate.login(customer(), AuthToken::new("t")).unwrap();
        assert_eq!(
            f.storage.get("user").unwrap(),
            Some(customer().to_json().unwrap())
        );
        assert_eq!(f.storage.get("token").unwrap().as_deref(), Some("t"));
        // No inline redirect.
        assert_eq!(f.nav.history(), vec!["/login"]);

        let event = events.try_recv().unwrap();
        assert_eq!(event.kind, SessionEventKind::LoggedIn);
        assert_eq!(event.revision, f.gate.revision().unwrap());

        assert!(f.gate.complete_login(event.revision).unwrap());
        assert!(!f.gate.complete_login(event.revision).unwrap());
        assert_eq!(f.nav.history(), vec!["/login", "/"]);
    }

    #[test]
    fn superseded_login_does_not_redirect() {
        let f = fixture(InMemoryStorage::new(), "/login");
        f.gate.bootstrap().unwrap();
        let events = f.gate.subscribe();

        f.gate.login(customer(), AuthToken::new("t")).unwrap();
        f.gate.logout().unwrap();

        let logged_in = events.try_recv().unwrap();
        assert!(!f.gate.complete_login(logged_in.revision).unwrap());
        assert_eq!(f.nav.history(), vec!["/login"]);
    }

    #[test]
    fn logout_clears_everything_and_redirects() {
        let f = fixture(persisted(&customer(), "t"), "/orders");
        f.gate.bootstrap().unwrap();

        f.gate.logout().unwrap();
        assert_eq!(f.gate.view().unwrap().user, None);
        assert_eq!(f.gate.token().unwrap(), None);
        assert!(f.storage.is_empty());
        assert_eq!(f.nav.current_path(), "/login");

        f.gate.logout().unwrap();
        assert!(f.storage.is_empty());
        assert_eq!(f.nav.history(), vec!["/orders", "/login"]);
    }

    #[test]
    fn repeated_logout_only_redirects() {
        let f = fixture(persisted(&customer(), "t"), "/orders");
        f.gate.bootstrap().unwrap();
        f.gate.logout().unwrap();

        let events = f.gate.subscribe();
        let revision = f.gate.revision().unwrap();
        f.nav.visit("/products");

        f.gate.logout().unwrap();
        assert_eq!(f.gate.revision().unwrap(), revision);
        assert!(events.try_recv().is_err());
        assert_eq!(f.nav.current_path(), "/login");
    }

    #[test]
    fn logout_before_bootstrap_keeps_loading() {
        let f = fixture(persisted(&customer(), "t"), "/orders");
        let events = f.gate.subscribe();

        f.gate.logout().unwrap();
        assert!(f.gate.view().unwrap().loading);
        assert!(events.try_recv().is_err());
        assert!(f.storage.is_empty());
        assert_eq!(f.nav.current_path(), "/login");
    }
}
