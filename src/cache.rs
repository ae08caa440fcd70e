//! This module provides a local cache for schedule data
//!
//! The cache is only an offline copy of what the server returned. It is never written to
//! directly: writes go to the server, and invalidate the cached listings they may affect.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::event::{Event, EventId};
use crate::month::YearMonth;


/// Listings of the schedule server, stored in a local file
#[derive(Debug, PartialEq)]
pub struct Cache {
    backing_file: PathBuf,
    data: CachedData,
}

#[derive(Default, Debug, PartialEq, Serialize, Deserialize)]
struct CachedData {
    months: HashMap<YearMonth, Vec<Event>>,
    days: HashMap<NaiveDate, Vec<Event>>,
    last_sync: Option<DateTime<Utc>>,
}

impl Cache {
    /// Initialize a cache from the content of a valid backing file if it exists.
    /// Returns an error otherwise
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = match std::fs::File::open(path) {
            Err(err) => {
                return Err(ScheduleError::Cache(format!("Unable to open file {:?}: {}", path, err)));
            },
            Ok(file) => serde_json::from_reader(file)?,
        };

        Ok(Self{
            backing_file: PathBuf::from(path),
            data,
        })
    }

    /// Initialize a cache with the default contents
    pub fn new(path: &Path) -> Self {
        Self{
            backing_file: PathBuf::from(path),
            data: CachedData::default(),
        }
    }

    /// Load the cache from `path`, or start an empty one if it cannot be read
    pub fn from_file_or_new(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(cache) => cache,
            Err(err) => {
                log::warn!("Invalid cache file: {}. Using a default cache", err);
                Self::new(path)
            }
        }
    }

    pub fn backing_file(&self) -> &Path {
        &self.backing_file
    }

    /// Store the current Cache to its backing file
    pub fn save_to_file(&self) -> Result<()> {
        if let Some(parent) = self.backing_file.parent() {
            if parent.as_os_str().is_empty() == false {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(&self.backing_file)?;
        serde_json::to_writer(file, &self.data)?;
        Ok(())
    }

    /// Store the cache, only logging failures
    pub fn save_or_warn(&self) {
        if let Err(err) = self.save_to_file() {
            log::warn!("Unable to save cache file {:?}: {}", self.backing_file, err);
        }
    }

    /// Returns the last time the server successfully answered a listing
    /// (or None in case it never did)
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.data.last_sync
    }

    pub fn month(&self, month: YearMonth) -> Option<&Vec<Event>> {
        self.data.months.get(&month)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&Vec<Event>> {
        self.data.days.get(&date)
    }

    pub fn store_month(&mut self, month: YearMonth, events: Vec<Event>) {
        self.data.months.insert(month, events);
        self.data.last_sync = Some(Utc::now());
    }

    pub fn store_day(&mut self, date: NaiveDate, events: Vec<Event>) {
        self.data.days.insert(date, events);
        self.data.last_sync = Some(Utc::now());
    }

    /// Drop every cached listing that `event` may belong to, or that holds an event with the same id
    pub fn invalidate_event(&mut self, event: &Event) {
        let (first, last) = match event.span() {
            Ok(span) => span,
            Err(_) => (event.start_date(), event.start_date()),
        };
        self.data.months.retain(|month, _| month.last_day() < first || month.first_day() > last);
        self.data.days.retain(|date, _| *date < first || *date > last);
        self.invalidate_id(event.id());
    }

    /// Drop every cached listing that holds the event `id`
    pub fn invalidate_id(&mut self, id: &EventId) {
        let holds = |events: &[Event]| events.iter().any(|e| e.id() == id);
        self.data.months.retain(|_, events| holds(events.as_slice()) == false);
        self.data.days.retain(|_, events| holds(events.as_slice()) == false);
    }

    pub fn clear(&mut self) {
        self.data.months.clear();
        self.data.days.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.months.is_empty() && self.data.days.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::event::Category;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn serde_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("nested").join("cache.json");

        let mut cache = Cache::new(&cache_path);
        let feb = YearMonth::new(2024, 2).unwrap();
        let ev = Event::new(EventId::from(3u64), ymd(2024, 2, 10), Some(ymd(2024, 2, 12)), "Diet".into(), Category::Meal);
        cache.store_month(feb, vec![ev.clone()]);
        cache.store_day(ymd(2024, 2, 11), vec![ev]);

        cache.save_to_file().unwrap();

        let retrieved_cache = Cache::from_file(&cache_path).unwrap();
        assert_eq!(cache, retrieved_cache);
        assert!(retrieved_cache.last_sync().is_some());
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nothing.json");
        assert!(Cache::from_file(&path).is_err());
        assert!(Cache::from_file_or_new(&path).is_empty());
    }

    #[test]
    fn invalidation() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = Cache::new(&dir.path().join("cache.json"));
        let jan = YearMonth::new(2024, 1).unwrap();
        let feb = YearMonth::new(2024, 2).unwrap();
        let mar = YearMonth::new(2024, 3).unwrap();
        let old = Event::new(EventId::from("old"), ymd(2024, 3, 3), None, "Moved".into(), Category::General);
        cache.store_month(jan, Vec::new());
        cache.store_month(feb, Vec::new());
        cache.store_month(mar, vec![old]);
        cache.store_day(ymd(2024, 2, 1), Vec::new());
        cache.store_day(ymd(2024, 2, 20), Vec::new());

        // The event now spans January 30 to February 2: its old month goes away as well
        let moved = Event::new(EventId::from("old"), ymd(2024, 1, 30), Some(ymd(2024, 2, 2)), "Moved".into(), Category::General);
        cache.invalidate_event(&moved);

        assert!(cache.month(jan).is_none());
        assert!(cache.month(feb).is_none());
        assert!(cache.month(mar).is_none());
        assert!(cache.day(ymd(2024, 2, 1)).is_none());
        assert!(cache.day(ymd(2024, 2, 20)).is_some());
    }
}
