//! The memo panel, that lists and edits the events of one day
//!
//! The panel floats until a day is selected on the calendar. Then it is docked next to the
//! calendar and shows that day, until it is closed.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{NaiveDate, NaiveTime};

use crate::calendar_page::LoadState;
use crate::error::{Result, ScheduleError};
use crate::event::{Category, Event, EventDraft, EventId, EventPatch};
use crate::selection::{Mount, SelectionBus, Signal, SignalKind};
use crate::traits::ScheduleSource;

/// Title of the memos saved without one
pub const DEFAULT_MEMO_TITLE: &str = "Memo";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelMode {
    /// Not attached to any day of the calendar
    Floating,
    /// Showing the events of a day
    Viewing(NaiveDate),
}

#[derive(Debug)]
struct PanelState {
    mode: PanelMode,
    /// The day new memos are saved to
    working_date: NaiveDate,
    events: Vec<Event>,
    /// Events ticked for deletion or edition
    marked: BTreeSet<EventId>,
    load: LoadState,
    needs_fetch: bool,
}

impl PanelState {
    fn view(&mut self, date: NaiveDate, generation: &AtomicU64) {
        if self.mode != PanelMode::Viewing(date) {
            self.events.clear();
            self.marked.clear();
            self.load = LoadState::Idle;
            generation.fetch_add(1, Ordering::SeqCst);
        }
        self.mode = PanelMode::Viewing(date);
        self.working_date = date;
        self.needs_fetch = true;
    }

    fn viewed_date(&self) -> Option<NaiveDate> {
        match self.mode {
            PanelMode::Viewing(date) => Some(date),
            PanelMode::Floating => None,
        }
    }
}

/// The controller of the memo panel
pub struct MemoPanel<S>
where
    S: ScheduleSource + Send + Sync,
{
    source: Arc<S>,
    bus: SelectionBus,
    state: Arc<Mutex<PanelState>>,
    generation: Arc<AtomicU64>,
    _mount: Mount,
}

fn lock_state(state: &Mutex<PanelState>) -> MutexGuard<'_, PanelState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S> MemoPanel<S>
where
    S: ScheduleSource + Send + Sync,
{
    /// Mount a floating panel on `bus`. Memos are saved to `today` until another day is picked
    pub fn new(source: Arc<S>, bus: &SelectionBus, today: NaiveDate) -> Self {
        let state = Arc::new(Mutex::new(PanelState {
            mode: PanelMode::Floating,
            working_date: today,
            events: Vec::new(),
            marked: BTreeSet::new(),
            load: LoadState::Idle,
            needs_fetch: false,
        }));
        let generation = Arc::new(AtomicU64::new(0));

        let mut mount = bus.mount();
        {
            let state = Arc::clone(&state);
            let generation = Arc::clone(&generation);
            mount.on(SignalKind::DateSelected, move |signal| {
                if let Signal::DateSelected(date) = signal {
                    lock_state(&state).view(*date, &generation);
                }
            });
        }

        Self { source, bus: bus.clone(), state, generation, _mount: mount }
    }

    fn lock(&self) -> MutexGuard<'_, PanelState> {
        lock_state(&self.state)
    }

    pub fn mode(&self) -> PanelMode { self.lock().mode }
    pub fn working_date(&self) -> NaiveDate { self.lock().working_date }
    pub fn events(&self) -> Vec<Event> { self.lock().events.clone() }
    pub fn load_state(&self) -> LoadState { self.lock().load.clone() }
    pub fn needs_fetch(&self) -> bool { self.lock().needs_fetch }

    pub fn marked(&self) -> Vec<EventId> {
        self.lock().marked.iter().cloned().collect()
    }

    /// Pick another day from the panel itself. The calendar follows along
    pub fn change_date(&self, date: NaiveDate) {
        let docked = {
            let mut st = self.lock();
            match st.mode {
                PanelMode::Viewing(_) => {
                    st.view(date, &self.generation);
                    true
                },
                PanelMode::Floating => {
                    st.working_date = date;
                    false
                },
            }
        };
        if docked {
            self.bus.publish(Signal::DateChanged(date));
        }
    }

    /// Go back to floating mode
    pub fn close(&self) {
        let mut st = self.lock();
        st.mode = PanelMode::Floating;
        st.events.clear();
        st.marked.clear();
        st.load = LoadState::Idle;
        st.needs_fetch = false;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Fetch the events of the viewed day.
    ///
    /// Returns whether the response was applied: it is discarded when the panel moved to
    /// another day (or was closed) in the meantime.
    pub async fn fetch_day(&self) -> bool {
        let (date, ticket) = {
            let mut st = self.lock();
            let date = match st.viewed_date() {
                Some(date) => date,
                None => return false,
            };
            st.load = LoadState::Loading;
            (date, self.generation.fetch_add(1, Ordering::SeqCst) + 1)
        };

        let result = self.source.list_by_date(date, None).await;

        let mut st = self.lock();
        if self.generation.load(Ordering::SeqCst) != ticket {
            log::debug!("Discarding an outdated response for {}", date);
            return false;
        }
        match result {
            Ok(events) => {
                st.marked.retain(|id| events.iter().any(|e| e.id() == id));
                st.events = events;
                st.load = LoadState::Ready;
            },
            Err(err) => {
                log::warn!("Unable to fetch the events of {}: {}", date, err);
                st.events.clear();
                st.marked.clear();
                st.load = LoadState::Failed(err.to_string());
            },
        }
        st.needs_fetch = false;
        true
    }

    /// Fetch the viewed day if it has changed since the last fetch
    pub async fn sync(&self) -> bool {
        if self.needs_fetch() {
            self.fetch_day().await
        } else {
            false
        }
    }

    /// Save a memo to the working date, as a general event
    pub async fn save_memo(&self, title: &str, body: &str, time: NaiveTime) -> Result<Event> {
        let title = match title.trim() {
            "" => DEFAULT_MEMO_TITLE,
            t => t,
        };
        let draft = EventDraft::new(self.working_date(), title, Category::General)
            .with_memo(body)
            .at(time);

        let event = self.source.create(draft).await?;
        {
            let mut st = self.lock();
            if let Some(date) = st.viewed_date() {
                if event.covers(date) {
                    st.events.push(event.clone());
                }
            }
        }
        self.bus.publish(Signal::ScheduleUpdated);
        Ok(event)
    }

    /// Tick or untick an event of the list. Returns whether it is now ticked
    pub fn toggle_mark(&self, id: &EventId) -> bool {
        let mut st = self.lock();
        if st.marked.remove(id) {
            return false;
        }
        if st.events.iter().any(|e| e.id() == id) {
            st.marked.insert(id.clone());
            true
        } else {
            false
        }
    }

    /// The event to edit, when exactly one event is ticked
    pub fn editable(&self) -> Option<Event> {
        let st = self.lock();
        if st.marked.len() != 1 {
            return None;
        }
        st.marked.iter().next()
            .and_then(|id| st.events.iter().find(|e| e.id() == id))
            .cloned()
    }

    /// Update an event of the list. Nothing changes locally if the server refuses it.
    ///
    /// The patched date range is checked against the listed event before any request, since
    /// the server stores a lone `end_date` as is.
    pub async fn update_event(&self, id: &EventId, patch: EventPatch) -> Result<Event> {
        let current = match self.lock().events.iter().find(|e| e.id() == id) {
            Some(event) => event.clone(),
            None => return Err(ScheduleError::NotFound(id.clone())),
        };
        if patch.is_empty() {
            return Ok(current);
        }
        patch.validate_against(&current)?;

        let event = self.source.update(id, patch).await?;
        {
            let mut st = self.lock();
            let date = st.viewed_date();
            st.events.retain(|e| e.id() != id);
            if date.map(|d| event.covers(d)).unwrap_or(false) {
                st.events.push(event.clone());
            } else {
                st.marked.remove(id);
            }
        }
        self.bus.publish(Signal::ScheduleUpdated);
        Ok(event)
    }

    /// Delete every ticked event.
    ///
    /// Deletions stop at the first failure. The events deleted until then are removed from
    /// the list, the others stay ticked.
    pub async fn delete_marked(&self) -> Result<usize> {
        let marked = self.marked();
        let mut n_deleted = 0;
        let mut failure = None;

        for id in &marked {
            match self.source.delete(id).await {
                Ok(()) => {
                    let mut st = self.lock();
                    st.events.retain(|e| e.id() != id);
                    st.marked.remove(id);
                    n_deleted += 1;
                },
                Err(err) => {
                    log::error!("Unable to delete {}: {}", id, err);
                    failure = Some(err);
                    break;
                },
            }
        }

        if n_deleted > 0 {
            self.bus.publish(Signal::ScheduleUpdated);
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(n_deleted),
        }
    }
}

impl<S> std::fmt::Debug for MemoPanel<S>
where
    S: ScheduleSource + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoPanel")
            .field("state", &*self.lock())
            .finish()
    }
}
