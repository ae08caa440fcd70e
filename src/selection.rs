//! Decoupled notifications between the calendar and the memo panel
//!
//! Neither side holds a reference to the other: the calendar publishes
//! [`Signal::DateSelected`] when the user picks a day, the memo panel publishes
//! [`Signal::DateChanged`] when it moves to another day by itself, and anyone that changed
//! stored events publishes [`Signal::ScheduleUpdated`].
//! Selection and change are distinct kinds so that reacting to one never re-publishes the other.

use std::collections::{HashMap, VecDeque};
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::NaiveDate;
use once_cell::sync::Lazy;

/// A notification delivered to every handler currently mounted for its kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// The user selected a day on the calendar
    DateSelected(NaiveDate),
    /// The memo panel moved to another day on its own
    DateChanged(NaiveDate),
    /// Stored events changed, views of the schedule should be fetched again
    ScheduleUpdated,
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::DateSelected(_) => SignalKind::DateSelected,
            Signal::DateChanged(_) => SignalKind::DateChanged,
            Signal::ScheduleUpdated => SignalKind::ScheduleUpdated,
        }
    }

    /// The date this signal carries, if any
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Signal::DateSelected(d) | Signal::DateChanged(d) => Some(*d),
            Signal::ScheduleUpdated => None,
        }
    }
}

impl Display for Signal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.date() {
            Some(date) => write!(f, "{}({})", self.kind(), date),
            None => write!(f, "{}", self.kind()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalKind {
    DateSelected,
    DateChanged,
    ScheduleUpdated,
}

impl SignalKind {
    /// The event name the web client uses for this kind
    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::DateSelected => "open-memo-by-date",
            SignalKind::DateChanged => "memo-date-changed",
            SignalKind::ScheduleUpdated => "schedule-updated",
        }
    }
}

impl Display for SignalKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}



type Handler = Arc<dyn Fn(&Signal) + Send + Sync>;

#[derive(Default)]
struct BusState {
    next_id: u64,
    /// Kept in registration order
    handlers: Vec<(u64, SignalKind, Handler)>,
    pending: VecDeque<Signal>,
    dispatching: bool,
}

/// A synchronous publish/subscribe channel. Clones share the same subscribers
#[derive(Clone, Default)]
pub struct SelectionBus {
    state: Arc<Mutex<BusState>>,
}

impl std::fmt::Debug for SelectionBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionBus")
            .field("handlers", &self.lock().handlers.len())
            .finish()
    }
}

static GLOBAL_BUS: Lazy<SelectionBus> = Lazy::new(SelectionBus::new);

/// The bus shared by every component of the page
pub fn global() -> &'static SelectionBus {
    &GLOBAL_BUS
}

impl SelectionBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `handler` for signals of `kind`, until the returned guard is dropped
    pub fn subscribe<F>(&self, kind: SignalKind, handler: F) -> Subscription
    where
        F: Fn(&Signal) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.handlers.push((id, kind, Arc::new(handler)));
        log::trace!("Subscribed handler #{} to {}", id, kind);
        Subscription { id, bus: Arc::downgrade(&self.state) }
    }

    /// Start mounting a component. See [`Mount`]
    pub fn mount(&self) -> Mount {
        Mount { bus: self.clone(), subscriptions: HashMap::new() }
    }

    /// Number of handlers currently registered for `kind`
    pub fn subscriber_count(&self, kind: SignalKind) -> usize {
        self.lock().handlers.iter().filter(|(_, k, _)| *k == kind).count()
    }

    /// Deliver `signal` to the handlers of its kind.
    ///
    /// Signals published while another one is being delivered (i.e. from a handler) are
    /// queued and delivered right after it, so that handlers always see signals in
    /// publication order. Publishing without any subscriber does nothing.
    pub fn publish(&self, signal: Signal) {
        {
            let mut state = self.lock();
            state.pending.push_back(signal);
            if state.dispatching {
                log::trace!("Queued {} behind the signal being delivered", signal);
                return;
            }
            state.dispatching = true;
        }
        let _dispatch = Dispatch { state: &*self.state };

        loop {
            let (current, handlers) = {
                let mut state = self.lock();
                let current = match state.pending.pop_front() {
                    Some(s) => s,
                    None => {
                        // Unlocked before `_dispatch` resets the flag
                        drop(state);
                        return;
                    },
                };
                let handlers: Vec<Handler> = state.handlers.iter()
                    .filter(|(_, kind, _)| *kind == current.kind())
                    .map(|(_, _, h)| Arc::clone(h))
                    .collect();
                (current, handlers)
            };

            log::debug!("Delivering {} to {} handler(s)", current, handlers.len());
            // The lock is released here, so that handlers can publish or (un)subscribe
            for handler in handlers {
                handler(&current);
            }
        }
    }

    fn unsubscribe(state: &Mutex<BusState>, id: u64) {
        let mut state = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.handlers.retain(|(h_id, _, _)| *h_id != id);
        log::trace!("Unsubscribed handler #{}", id);
    }
}



/// Marks a bus as dispatching, until the queue is drained or a handler panics
struct Dispatch<'a> {
    state: &'a Mutex<BusState>,
}

impl Drop for Dispatch<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if std::thread::panicking() && state.pending.is_empty() == false {
            log::warn!("A handler panicked, dropping {} queued signal(s)", state.pending.len());
            state.pending.clear();
        }
        state.dispatching = false;
    }
}

/// Keeps a handler registered. Dropping it removes the handler
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    bus: Weak<Mutex<BusState>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.bus.upgrade() {
            SelectionBus::unsubscribe(&state, self.id);
        }
    }
}

/// The subscriptions of one mounted component: at most one handler per signal kind.
///
/// Dropping the `Mount` unmounts the component, i.e. removes all of its handlers.
pub struct Mount {
    bus: SelectionBus,
    subscriptions: HashMap<SignalKind, Subscription>,
}

impl Mount {
    /// Handle signals of `kind`. This replaces the handler previously set for this kind, if any
    pub fn on<F>(&mut self, kind: SignalKind, handler: F) -> &mut Self
    where
        F: Fn(&Signal) + Send + Sync + 'static,
    {
        let subscription = self.bus.subscribe(kind, handler);
        // The replaced subscription (if any) is dropped here
        self.subscriptions.insert(kind, subscription);
        self
    }

    /// Stop handling signals of `kind`
    pub fn off(&mut self, kind: SignalKind) {
        self.subscriptions.remove(&kind);
    }

    pub fn is_handling(&self, kind: SignalKind) -> bool {
        self.subscriptions.contains_key(&kind)
    }

    pub fn bus(&self) -> &SelectionBus {
        &self.bus
    }
}

impl std::fmt::Debug for Mount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mount")
            .field("kinds", &self.subscriptions.keys().collect::<Vec<_>>())
            .finish()
    }
}
