//! Session change notifications.
//!
//! The gate publishes one event per session mutation. Subscribers (the route
//! guard, page components) re-read the session in reaction; events carry no
//! user data, only what changed and the revision it produced.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    /// Initial read of persisted storage finished.
    Bootstrapped,
    /// Persisted credentials written by another path were adopted.
    Adopted,
    LoggedIn,
    LoggedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    /// Session revision after the change.
    pub revision: u64,
    pub occurred_at: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(kind: SessionEventKind, revision: u64) -> Self {
        Self {
            kind,
            revision,
            occurred_at: Utc::now(),
        }
    }
}

/// A subscription to session events.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything published so far.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// In-process broadcast of session events.
///
/// - No IO / no async
/// - Every subscriber receives every event, in publish order
/// - Dropped subscribers are pruned on the next publish
#[derive(Debug, Default)]
pub struct SessionBus {
    subscribers: Mutex<Vec<mpsc::Sender<SessionEvent>>>,
}

impl SessionBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, event: SessionEvent) {
        let Ok(mut subs) = self.subscribers.lock() else {
            tracing::error!(kind = ?event.kind, "session bus lock poisoned; event dropped");
            return;
        };

        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscribe(&self) -> Subscription<SessionEvent> {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock still yields a subscription; it just stays silent.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|subs| subs.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fans_out_in_order() {
        let bus = SessionBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(SessionEvent::new(SessionEventKind::Bootstrapped, 1));
        bus.publish(SessionEvent::new(SessionEventKind::LoggedIn, 2));

        let kinds: Vec<_> = a.drain().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![SessionEventKind::Bootstrapped, SessionEventKind::LoggedIn]);
        assert_eq!(b.drain().len(), 2);
    }

    #[test]
    fn prunes_dropped_subscribers() {
        let bus = SessionBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(SessionEvent::new(SessionEventKind::LoggedOut, 1));
        assert_eq!(bus.subscriber_count(), 1);
        assert!(kept.try_recv().is_ok());
    }
}
