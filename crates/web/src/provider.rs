//! Leptos components that provide the session gate and guard routes.

use std::rc::Rc;
use std::sync::Arc;

use leptos::*;
use leptos_router::use_location;

use stockroom_auth::{AuthToken, SessionUser};
use stockroom_session::{
    AccessDecision, GateConfig, GateError, RouteGuard, SessionGate, SessionHandle, SessionView,
};

use crate::browser::{BrowserNavigator, LocalStorage};

/// What pages get from [`use_session`].
///
/// `view` is reactive; `login`/`logout` are the only ways to change it.
#[derive(Clone)]
pub struct SessionContext {
    gate: SessionHandle,
    guard: Rc<RouteGuard>,
    view: RwSignal<SessionView>,
}

impl SessionContext {
    /// Current `{ user, loading }`. Tracks reactively.
    pub fn view(&self) -> SessionView {
        self.view.get()
    }

    pub fn token(&self) -> Option<AuthToken> {
        self.gate.token().ok().flatten()
    }

    /// Adopt credentials returned by the auth endpoint.
    pub fn login(&self, user: SessionUser, token: AuthToken) -> Result<(), GateError> {
        self.gate.login(user, token)?;
        self.refresh();
        Ok(())
    }

    pub fn logout(&self) -> Result<(), GateError> {
        self.gate.logout()?;
        self.refresh();
        Ok(())
    }

    /// Let the guard react to pending session events, then republish the view.
    fn refresh(&self) {
        if let Err(err) = self.guard.sync() {
            tracing::error!(error = %err, "route guard failed");
        }
        match self.gate.view() {
            Ok(view) => self.view.set(view),
            Err(err) => tracing::error!(error = %err, "session unreadable"),
        }
    }
}

/// The session provided by the enclosing [`SessionProvider`].
///
/// # Panics
///
/// Panics when rendered outside a `SessionProvider`.
pub fn use_session() -> SessionContext {
    expect_context::<SessionContext>()
}

/// Bootstraps the gate, provides it to `children`, and re-evaluates access on
/// every route change. Must be rendered inside a `<Router>`.
#[component]
pub fn SessionProvider(
    #[prop(optional)] config: Option<GateConfig>,
    children: Children,
) -> impl IntoView {
    let gate = SessionGate::new(
        config.unwrap_or_default(),
        Arc::new(LocalStorage),
        Arc::new(BrowserNavigator),
    )
    .into_handle();
    let guard = Rc::new(RouteGuard::new(gate.clone()));

    let initial = gate.bootstrap().unwrap_or_else(|err| {
        tracing::error!(error = %err, "session bootstrap failed");
        SessionView {
            user: None,
            loading: false,
        }
    });

    let context = SessionContext {
        gate,
        guard,
        view: create_rw_signal(initial),
    };
    context.refresh();
    provide_context(context.clone());

    let location = use_location();
    create_effect(move |_| {
        let path = location.pathname.get();
        match context.guard.on_route_change(&path) {
            Ok(AccessDecision::Adopted) => context.refresh(),
            Ok(_) => {}
            Err(err) => tracing::error!(error = %err, path = %path, "route evaluation failed"),
        }
    });

    children()
}

/// Renders `children` only for an authenticated session, `fallback` otherwise
/// (including while the session is still loading).
#[component]
pub fn Protected(
    #[prop(optional, into)] fallback: ViewFn,
    children: ChildrenFn,
) -> impl IntoView {
    let session = use_session();
    move || {
        if session.view().is_authenticated() {
            children().into_view()
        } else {
            fallback.run()
        }
    }
}
