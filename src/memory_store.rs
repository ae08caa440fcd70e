//! An in-memory schedule source, that behaves like the schedule server
//!
//! This is mostly useful for tests and demos. Failures can be injected with a [`MockBehaviour`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{Result, ScheduleError};
use crate::event::{Category, Event, EventDraft, EventId, EventPatch};
use crate::mock_behaviour::{MockBehaviour, Operation};
use crate::month::YearMonth;
use crate::traits::ScheduleSource;

#[derive(Debug, Default)]
struct StoreData {
    events: HashMap<EventId, Event>,
    behaviour: MockBehaviour,
    n_requests: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that holds `events`, stored as is (without any validation)
    pub fn with_events<I: IntoIterator<Item = Event>>(events: I) -> Self {
        let store = Self::new();
        for event in events {
            store.insert(event);
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `event` as is (replacing an event with the same id)
    pub fn insert(&self, event: Event) {
        self.lock().events.insert(event.id().clone(), event);
    }

    pub fn get(&self, id: &EventId) -> Option<Event> {
        self.lock().events.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of calls received so far
    pub fn n_requests(&self) -> usize {
        self.lock().n_requests
    }

    pub fn set_mock_behaviour(&self, behaviour: MockBehaviour) {
        self.lock().behaviour = behaviour;
    }

    fn sorted_matching<F>(&self, filter: F) -> Vec<Event>
    where
        F: Fn(&Event) -> bool,
    {
        let data = self.lock();
        let mut events: Vec<Event> = data.events.values().filter(|e| filter(e)).cloned().collect();
        events.sort_by(|a, b| {
            a.start_date().cmp(&b.start_date())
                .then(a.time().cmp(&b.time()))
                .then(a.id().cmp(b.id()))
        });
        events
    }
}

/// The overlap test of the server, which compares raw dates: events with inverted ranges may match
fn raw_overlaps(event: &Event, first: NaiveDate, last: NaiveDate) -> bool {
    let end = event.end_date().unwrap_or_else(|| event.start_date());
    event.start_date() <= last && end >= first
}

#[async_trait]
impl ScheduleSource for MemoryStore {
    async fn list_month(&self, month: YearMonth) -> Result<Vec<Event>> {
        {
            let mut data = self.lock();
            data.n_requests += 1;
            data.behaviour.check(Operation::ListMonth)?;
        }
        let (first, last) = (month.first_day(), month.last_day());
        Ok(self.sorted_matching(|e| raw_overlaps(e, first, last)))
    }

    async fn list_by_date(&self, date: NaiveDate, kind: Option<Category>) -> Result<Vec<Event>> {
        {
            let mut data = self.lock();
            data.n_requests += 1;
            data.behaviour.check(Operation::ListByDate)?;
        }
        let mut events = self.sorted_matching(|e| {
            raw_overlaps(e, date, date) && kind.map(|k| e.category() == k).unwrap_or(true)
        });
        // Most recent start dates first. The sort is stable, the time order is kept
        events.sort_by(|a, b| b.start_date().cmp(&a.start_date()));
        Ok(events)
    }

    async fn create(&self, draft: EventDraft) -> Result<Event> {
        let mut data = self.lock();
        data.n_requests += 1;
        data.behaviour.check(Operation::Create)?;
        draft.validate()?;

        let event = draft.into_event(EventId::random());
        data.events.insert(event.id().clone(), event.clone());
        log::debug!("Memory store: created {}", event.id());
        Ok(event)
    }

    async fn update(&self, id: &EventId, patch: EventPatch) -> Result<Event> {
        let mut data = self.lock();
        data.n_requests += 1;
        data.behaviour.check(Operation::Update)?;

        let event = data.events.get_mut(id).ok_or_else(|| ScheduleError::NotFound(id.clone()))?;
        patch.validate_against(event)?;
        event.apply(&patch);
        Ok(event.clone())
    }

    async fn delete(&self, id: &EventId) -> Result<()> {
        let mut data = self.lock();
        data.n_requests += 1;
        data.behaviour.check(Operation::Delete)?;

        match data.events.remove(id) {
            Some(_) => Ok(()),
            None => Err(ScheduleError::NotFound(id.clone())),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<Event>> {
        {
            let mut data = self.lock();
            data.n_requests += 1;
            data.behaviour.check(Operation::Search)?;
        }
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.sorted_matching(|e| e.title().contains(query) || e.memo().contains(query)))
    }
}
