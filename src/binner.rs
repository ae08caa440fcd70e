//! Binning of events onto the cells of a month grid
//!
//! A cell shows two rows of markers: one for single-day events and one for period events.
//! Each row tells *whether* a category has something on that day, not how many things.

use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;
use chrono::{Duration, NaiveDate};

use crate::error::ScheduleError;
use crate::event::{Category, Event};
use crate::month::MonthCell;

bitflags! {
    /// A set of event categories
    pub struct CategorySet: u8 {
        const MEAL = 1;
        const WORKOUT = 2;
        const GENERAL = 4;
    }
}

impl CategorySet {
    pub fn has(&self, category: Category) -> bool {
        self.contains(CategorySet::from(category))
    }

    /// The categories of this set, in display order
    pub fn categories(&self) -> Vec<Category> {
        Category::ALL.iter().copied().filter(|c| self.has(*c)).collect()
    }
}

impl From<Category> for CategorySet {
    fn from(category: Category) -> Self {
        match category {
            Category::Meal => CategorySet::MEAL,
            Category::Workout => CategorySet::WORKOUT,
            Category::General => CategorySet::GENERAL,
        }
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        CategorySet::empty()
    }
}

/// The markers of a single calendar cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellMarkers {
    /// Categories of the events that start and end on this day
    pub single_day: CategorySet,
    /// Categories of the multi-day events that include this day
    pub period: CategorySet,
}

impl CellMarkers {
    pub fn is_empty(&self) -> bool {
        self.single_day.is_empty() && self.period.is_empty()
    }
}

/// The result of [`bin_events`]
#[derive(Debug, Default)]
pub struct EventBins {
    /// One entry per dated cell of the grid, filler cells excluded
    pub cells: BTreeMap<NaiveDate, CellMarkers>,
    /// Events that were left out because their range is invalid
    pub warnings: Vec<ScheduleError>,
}

impl EventBins {
    /// Markers of `date`. Dates outside of the grid have no markers
    pub fn markers(&self, date: NaiveDate) -> CellMarkers {
        self.cells.get(&date).copied().unwrap_or_default()
    }
}

/// Compute the markers of every dated cell of `cells`.
///
/// Events may start before or end after the month the cells belong to: only the days they
/// share with the grid are marked. Events that end before they start are excluded and
/// reported in [`EventBins::warnings`].
pub fn bin_events<'a, I>(events: I, cells: &[MonthCell]) -> EventBins
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut bins = EventBins::default();
    for date in cells.iter().filter_map(|c| c.date) {
        bins.cells.insert(date, CellMarkers::default());
    }
    let (grid_first, grid_last) = match (bins.cells.keys().next(), bins.cells.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return bins,
    };

    for event in events {
        let (start, end) = match event.span() {
            Ok(span) => span,
            Err(err) => {
                log::warn!("Not displaying event {:?}: {}", event.title(), err);
                bins.warnings.push(err);
                continue;
            },
        };
        let flag = CategorySet::from(event.category());

        if start == end {
            if let Some(markers) = bins.cells.get_mut(&start) {
                markers.single_day.insert(flag);
            }
            continue;
        }

        // Only walk the days the event shares with the grid
        let from = start.max(grid_first);
        let to = end.min(grid_last);
        if from > to {
            continue;
        }
        for (_, markers) in bins.cells.range_mut(from..=to) {
            markers.period.insert(flag);
        }
    }

    bins
}

/// Most days a single event adds to [`highlighted_dates`]
pub const MAX_HIGHLIGHTED_DAYS: i64 = 366;

/// Every date covered by at least one event, e.g. to highlight search results on the calendar.
///
/// Events longer than [`MAX_HIGHLIGHTED_DAYS`] only have their first days highlighted.
pub fn highlighted_dates<'a, I>(events: I) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut dates = BTreeSet::new();
    for event in events {
        let (start, end) = match event.span() {
            Ok(span) => span,
            Err(err) => {
                log::warn!("Not highlighting event {:?}: {}", event.title(), err);
                continue;
            },
        };
        let last = if (end - start).num_days() >= MAX_HIGHLIGHTED_DAYS {
            log::warn!("Event {:?} spans {} to {}, only highlighting {} days of it", event.title(), start, end, MAX_HIGHLIGHTED_DAYS);
            start + Duration::days(MAX_HIGHLIGHTED_DAYS - 1)
        } else {
            end
        };
        let mut current = start;
        while current <= last {
            dates.insert(current);
            current = match current.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
    }
    dates
}

/// The events visible on `date`, sorted by time of day
pub fn day_agenda<'a, I>(events: I, date: NaiveDate) -> Vec<&'a Event>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut agenda: Vec<&Event> = events.into_iter()
        .filter(|e| e.covers(date))
        .collect();
    agenda.sort_by(|a, b| {
        a.time().cmp(&b.time())
            .then(a.start_date().cmp(&b.start_date()))
            .then(a.id().cmp(b.id()))
    });
    agenda
}
