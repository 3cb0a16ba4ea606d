//! Observer registry: ordered subscriptions, token removal, snapshot dispatch.
//!
//! The registry keeps one registration-ordered list of live subscriptions and
//! hands out a frozen [`DispatchSnapshot`] at publish time. Subscribe and
//! unsubscribe calls arriving after a snapshot was taken do not affect that
//! snapshot; an unsubscribe racing a publish may therefore still receive at
//! most one more notification. That race is part of the contract, not a bug.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use crate::event::Event;

/// Callback invoked on the publishing thread for each matching event.
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Opaque handle identifying one subscription; used for removal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

struct SubscriptionEntry<E: Event> {
    token: SubscriptionToken,
    /// `None` subscribes to every kind.
    filter: Option<E::Kind>,
    handler: Handler<E>,
}

impl<E: Event> SubscriptionEntry<E> {
    fn matches(&self, kind: E::Kind) -> bool {
        match self.filter {
            None => true,
            Some(k) => k == kind,
        }
    }
}

struct RegistryState<E: Event> {
    subscriptions: Vec<SubscriptionEntry<E>>,
    next_token: u64,
}

/// Per-entity observer registry.
///
/// - Thread-safe under concurrent subscribe/unsubscribe/publish callers.
/// - Subscriptions are kept in registration order; dispatch preserves it.
/// - Handlers run **outside** the registry lock, so a handler may re-enter
///   the registry (or the publishing entity) without deadlocking.
pub struct ObserverRegistry<E: Event> {
    inner: Mutex<RegistryState<E>>,
}

impl<E: Event> Default for ObserverRegistry<E> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(RegistryState {
                subscriptions: Vec::new(),
                next_token: 1,
            }),
        }
    }
}

impl<E: Event> ObserverRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState<E>> {
        // Handlers never run under this lock, so a poisoned guard still
        // holds a consistent subscription list.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a handler for one event kind (`Some(kind)`) or all kinds
    /// (`None`). Returns a token usable for removal.
    pub fn subscribe(
        &self,
        filter: Option<E::Kind>,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) -> SubscriptionToken {
        let mut state = self.lock();
        let token = SubscriptionToken(state.next_token);
        state.next_token += 1;
        state.subscriptions.push(SubscriptionEntry {
            token,
            filter,
            handler: Arc::new(handler),
        });
        token
    }

    /// Remove a subscription. Idempotent: removing an already-removed token
    /// is a no-op. Returns whether anything was removed.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut state = self.lock();
        let before = state.subscriptions.len();
        state.subscriptions.retain(|s| s.token != token);
        state.subscriptions.len() != before
    }

    /// Number of live subscriptions (any kind).
    pub fn subscription_count(&self) -> usize {
        self.lock().subscriptions.len()
    }

    /// Freeze the ordered set of handlers matching `kind` at this instant.
    ///
    /// Later subscribe/unsubscribe calls do not affect the returned snapshot.
    pub fn snapshot(&self, kind: E::Kind) -> DispatchSnapshot<E> {
        let state = self.lock();
        DispatchSnapshot {
            handlers: state
                .subscriptions
                .iter()
                .filter(|s| s.matches(kind))
                .map(|s| (s.token, Arc::clone(&s.handler)))
                .collect(),
        }
    }

    /// Snapshot + deliver in one step.
    pub fn dispatch(&self, event: &E) -> DispatchOutcome {
        self.snapshot(event.kind()).deliver(event)
    }
}

impl<E: Event> core::fmt::Debug for ObserverRegistry<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

/// Frozen, registration-ordered handler list captured at publish time.
pub struct DispatchSnapshot<E: Event> {
    handlers: Vec<(SubscriptionToken, Handler<E>)>,
}

impl<E: Event> DispatchSnapshot<E> {
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Invoke every handler in order, synchronously, on the calling thread.
    ///
    /// A panicking handler is caught, logged, and counted as failed; it does
    /// not abort delivery to the remaining handlers.
    pub fn deliver(&self, event: &E) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for (token, handler) in &self.handlers {
            let result = panic::catch_unwind(AssertUnwindSafe(|| handler(event)));
            match result {
                Ok(()) => outcome.delivered += 1,
                Err(_) => {
                    outcome.failed += 1;
                    warn!(
                        token = token.0,
                        event_type = event.event_type(),
                        "observer handler panicked during dispatch"
                    );
                }
            }
        }
        outcome
    }
}

/// Per-dispatch delivery tally.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Handlers that ran to completion.
    pub delivered: usize,
    /// Handlers that panicked (isolated, logged).
    pub failed: usize,
}
