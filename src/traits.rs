use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::event::{Category, Event, EventDraft, EventId, EventPatch};
use crate::month::YearMonth;

/// A store of schedule events, usually the schedule server (see [`Client`](crate::client::Client))
///
/// Every function may trigger a network request (that can be slow, or that can even fail).
/// An event "overlaps" a range when at least one of the days from its start date to its end
/// date (or its start date alone when it has no end date) is in that range.
#[async_trait]
pub trait ScheduleSource {
    /// Returns every event that overlaps `month`
    async fn list_month(&self, month: YearMonth) -> Result<Vec<Event>>;

    /// Returns every event visible on `date`, optionally of a single category
    async fn list_by_date(&self, date: NaiveDate, kind: Option<Category>) -> Result<Vec<Event>>;

    /// Store a new event. The store assigns its id
    async fn create(&self, draft: EventDraft) -> Result<Event>;

    /// Change some fields of an existing event
    async fn update(&self, id: &EventId, patch: EventPatch) -> Result<Event>;

    async fn delete(&self, id: &EventId) -> Result<()>;

    /// Returns the events whose title or memo contain `query`.
    /// A blank query matches nothing
    async fn search(&self, query: &str) -> Result<Vec<Event>>;
}
