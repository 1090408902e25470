//! Route guard: re-runs route evaluation whenever the session changes or the
//! user navigates.

use crate::error::GateError;
use crate::events::{SessionEvent, SessionEventKind, Subscription};
use crate::gate::SessionHandle;
use crate::state::AccessDecision;

/// Subscriber that keeps the displayed route consistent with the session.
///
/// Each trigger (one session event, one navigation) produces exactly one
/// evaluation pass; passes run one after another on the caller's thread.
#[derive(Debug)]
pub struct RouteGuard {
    gate: SessionHandle,
    events: Subscription<SessionEvent>,
}

impl RouteGuard {
    /// Subscribe to `gate`. Events published before this call are not seen.
    pub fn new(gate: SessionHandle) -> Self {
        let events = gate.subscribe();
        Self { gate, events }
    }

    pub fn gate(&self) -> &SessionHandle {
        &self.gate
    }

    /// Process every session event received since the last call.
    ///
    /// A `LoggedIn` event first completes the login (redirect home), then the
    /// route the navigator now shows is evaluated like for any other event.
    pub fn sync(&self) -> Result<Vec<AccessDecision>, GateError> {
        let mut decisions = Vec::new();
        for event in self.events.drain() {
            tracing::trace!(kind = ?event.kind, revision = event.revision, "session event");
            if event.kind == SessionEventKind::LoggedIn {
                self.gate.complete_login(event.revision)?;
            }
            let path = self.gate.navigator().current_path();
            decisions.push(self.gate.evaluate(&path)?);
        }
        Ok(decisions)
    }

    /// Evaluate a navigation to `path`.
    pub fn on_route_change(&self, path: &str) -> Result<AccessDecision, GateError> {
        self.gate.evaluate(path)
    }
}
