//! This modules merges the schedule server and the local cache in a single virtual source
//!
//! The server is always asked first. When it cannot be reached, listings are served from the
//! cache, so that a user can still browse the last known schedule while offline.
//! Writes are never served from the cache: they go to the server, and invalidate the cached
//! listings they affect.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::cache::Cache;
use crate::error::Result;
use crate::event::{Category, Event, EventDraft, EventId, EventPatch};
use crate::month::YearMonth;
use crate::traits::ScheduleSource;

/// A data source that combines a remote `ScheduleSource` and a local [`Cache`].
///
/// Usually, `R` is a [`Client`](crate::client::Client).
/// However, it can be a [`MemoryStore`](crate::memory_store::MemoryStore) for tests.
#[derive(Debug)]
pub struct Provider<R>
where
    R: ScheduleSource + Send + Sync,
{
    /// The remote source (usually a server)
    remote: R,
    /// The local cache
    local: Mutex<Cache>,
    /// Whether the cache file is written after every change
    persist: bool,
}

impl<R> Provider<R>
where
    R: ScheduleSource + Send + Sync,
{
    /// Create a provider. The cache file is written after every change
    pub fn new(remote: R, local: Cache) -> Self {
        Self { remote, local: Mutex::new(local), persist: true }
    }

    /// Create a provider that never writes its cache to disk
    pub fn in_memory(remote: R, local: Cache) -> Self {
        Self { remote, local: Mutex::new(local), persist: false }
    }

    /// Returns the data source described as `remote`
    pub fn remote(&self) -> &R { &self.remote }

    /// Returns the data source described as `local`
    pub fn local(&self) -> MutexGuard<'_, Cache> {
        self.local.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn changed(&self, cache: &Cache) {
        if self.persist {
            cache.save_or_warn();
        }
    }

    fn invalidate_event(&self, event: &Event) {
        let mut cache = self.local();
        cache.invalidate_event(event);
        self.changed(&cache);
    }
}

#[async_trait]
impl<R> ScheduleSource for Provider<R>
where
    R: ScheduleSource + Send + Sync,
{
    async fn list_month(&self, month: YearMonth) -> Result<Vec<Event>> {
        match self.remote.list_month(month).await {
            Ok(events) => {
                let mut cache = self.local();
                cache.store_month(month, events.clone());
                self.changed(&cache);
                Ok(events)
            },
            Err(err) if err.is_network() => {
                match self.local().month(month) {
                    Some(events) => {
                        log::warn!("Unable to fetch {} ({}). Showing the offline copy", month, err);
                        Ok(events.clone())
                    },
                    None => Err(err),
                }
            },
            Err(err) => Err(err),
        }
    }

    async fn list_by_date(&self, date: NaiveDate, kind: Option<Category>) -> Result<Vec<Event>> {
        match self.remote.list_by_date(date, kind).await {
            Ok(events) => {
                // Filtered listings are not complete day listings
                if kind.is_none() {
                    let mut cache = self.local();
                    cache.store_day(date, events.clone());
                    self.changed(&cache);
                }
                Ok(events)
            },
            Err(err) if err.is_network() => {
                let offline = self.local().day(date).map(|events| {
                    events.iter()
                        .filter(|e| kind.map(|k| e.category() == k).unwrap_or(true))
                        .cloned()
                        .collect::<Vec<_>>()
                });
                match offline {
                    Some(events) => {
                        log::warn!("Unable to fetch {} ({}). Showing the offline copy", date, err);
                        Ok(events)
                    },
                    None => Err(err),
                }
            },
            Err(err) => Err(err),
        }
    }

    async fn create(&self, draft: EventDraft) -> Result<Event> {
        let event = self.remote.create(draft).await?;
        self.invalidate_event(&event);
        Ok(event)
    }

    async fn update(&self, id: &EventId, patch: EventPatch) -> Result<Event> {
        let event = self.remote.update(id, patch).await?;
        self.invalidate_event(&event);
        Ok(event)
    }

    async fn delete(&self, id: &EventId) -> Result<()> {
        self.remote.delete(id).await?;
        let mut cache = self.local();
        cache.invalidate_id(id);
        self.changed(&cache);
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<Event>> {
        self.remote.search(query).await
    }
}
