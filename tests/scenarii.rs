//! Fixtures shared by the integration tests
//!
//! Every test file that needs them declares `mod scenarii;`

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Notify;

use planner_calendar::error::{Result, ScheduleError};
use planner_calendar::memory_store::MemoryStore;
use planner_calendar::traits::ScheduleSource;
use planner_calendar::{Category, Event, EventDraft, EventId, EventPatch, YearMonth};

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn month(y: i32, m: u32) -> YearMonth {
    YearMonth::new(y, m).unwrap()
}

fn event(id: u64, start: NaiveDate, end: Option<NaiveDate>, title: &str, category: Category) -> Event {
    Event::new(EventId::from(id), start, end, title.to_string(), category)
}

/// A few weeks of a user schedule, around February 2024
pub fn basic_scenarii() -> Vec<Event> {
    vec![
        event(1, ymd(2024, 1, 15), None, "New year run", Category::Workout),
        event(2, ymd(2024, 1, 30), Some(ymd(2024, 2, 2)), "Training camp", Category::Workout),
        event(3, ymd(2024, 2, 10), Some(ymd(2024, 2, 12)), "Low-carb diet", Category::Meal),
        event(4, ymd(2024, 2, 10), None, "Dentist", Category::General).with_memo("bring the x-rays"),
        event(5, ymd(2024, 2, 10), Some(ymd(2024, 2, 10)), "Brunch", Category::Meal),
        event(6, ymd(2024, 2, 29), Some(ymd(2024, 3, 3)), "Ski trip", Category::General),
        event(7, ymd(2024, 3, 5), None, "Swimming", Category::Workout),
    ]
}

pub fn populated_store() -> MemoryStore {
    MemoryStore::with_events(basic_scenarii())
}

pub fn ids(events: &[Event]) -> Vec<String> {
    events.iter().map(|e| e.id().to_string()).collect()
}

/// A source that holds back the listings of one month (or one day), until any other month
/// (or day) has been listed
pub struct GatedSource {
    pub inner: MemoryStore,
    gated_month: Option<YearMonth>,
    gated_day: Option<NaiveDate>,
    month_gate: Notify,
    day_gate: Notify,
}

impl GatedSource {
    pub fn new(inner: MemoryStore, gated: YearMonth) -> Self {
        Self { inner, gated_month: Some(gated), gated_day: None, month_gate: Notify::new(), day_gate: Notify::new() }
    }

    pub fn holding_day(inner: MemoryStore, gated: NaiveDate) -> Self {
        Self { inner, gated_month: None, gated_day: Some(gated), month_gate: Notify::new(), day_gate: Notify::new() }
    }

    /// Let the held back day listing complete
    pub fn release_day(&self) {
        self.day_gate.notify_one();
    }
}

#[async_trait]
impl ScheduleSource for GatedSource {
    async fn list_month(&self, month: YearMonth) -> Result<Vec<Event>> {
        if Some(month) == self.gated_month {
            self.month_gate.notified().await;
            return self.inner.list_month(month).await;
        }
        let result = self.inner.list_month(month).await;
        self.month_gate.notify_one();
        result
    }

    async fn list_by_date(&self, date: NaiveDate, kind: Option<Category>) -> Result<Vec<Event>> {
        if Some(date) == self.gated_day {
            self.day_gate.notified().await;
            return self.inner.list_by_date(date, kind).await;
        }
        let result = self.inner.list_by_date(date, kind).await;
        self.release_day();
        result
    }

    async fn create(&self, draft: EventDraft) -> Result<Event> {
        self.inner.create(draft).await
    }

    async fn update(&self, id: &EventId, patch: EventPatch) -> Result<Event> {
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: &EventId) -> Result<()> {
        self.inner.delete(id).await
    }

    async fn search(&self, query: &str) -> Result<Vec<Event>> {
        self.inner.search(query).await
    }
}

/// A source that stores updates as is, as the schedule server does, and counts them
pub struct UncheckedSource {
    pub inner: MemoryStore,
    n_updates: AtomicUsize,
}

impl UncheckedSource {
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner, n_updates: AtomicUsize::new(0) }
    }

    pub fn n_updates(&self) -> usize {
        self.n_updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScheduleSource for UncheckedSource {
    async fn list_month(&self, month: YearMonth) -> Result<Vec<Event>> {
        self.inner.list_month(month).await
    }

    async fn list_by_date(&self, date: NaiveDate, kind: Option<Category>) -> Result<Vec<Event>> {
        self.inner.list_by_date(date, kind).await
    }

    async fn create(&self, draft: EventDraft) -> Result<Event> {
        self.inner.create(draft).await
    }

    async fn update(&self, id: &EventId, patch: EventPatch) -> Result<Event> {
        self.n_updates.fetch_add(1, Ordering::SeqCst);
        let mut event = self.inner.get(id).ok_or_else(|| ScheduleError::NotFound(id.clone()))?;
        event.apply(&patch);
        self.inner.insert(event.clone());
        Ok(event)
    }

    async fn delete(&self, id: &EventId) -> Result<()> {
        self.inner.delete(id).await
    }

    async fn search(&self, query: &str) -> Result<Vec<Event>> {
        self.inner.search(query).await
    }
}
