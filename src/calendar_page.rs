//! The schedule page: a month calendar with markers, a selected day and a search box
//!
//! The page owns the events of the visible month. They are only replaced by the completion
//! of the latest month fetch, and only edited locally after a write succeeded.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;

use crate::binner::{bin_events, highlighted_dates, CellMarkers, EventBins};
use crate::error::Result;
use crate::event::{Event, EventDraft};
use crate::month::{MonthCell, YearMonth};
use crate::selection::{Mount, SelectionBus, Signal, SignalKind};
use crate::traits::ScheduleSource;

/// Where the data shown by a view comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing was fetched yet
    Idle,
    /// A fetch is in flight
    Loading,
    Ready,
    /// The last fetch failed. The view is empty, fetching again is the way to retry
    Failed(String),
}

impl LoadState {
    pub fn is_failed(&self) -> bool {
        matches!(self, LoadState::Failed(_))
    }
}

#[derive(Debug)]
struct PageState {
    month: YearMonth,
    selected: NaiveDate,
    events: Vec<Event>,
    load: LoadState,
    /// Set when the events should be fetched again
    stale: bool,
    search_results: Vec<Event>,
    highlighted: BTreeSet<NaiveDate>,
}

impl PageState {
    fn switch_month(&mut self, month: YearMonth, generation: &AtomicU64) {
        if month == self.month {
            return;
        }
        self.month = month;
        self.events.clear();
        self.load = LoadState::Idle;
        self.stale = true;
        // Responses for the previous month must not land in this one
        generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// One cell of a rendered month
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellView {
    pub date: Option<NaiveDate>,
    pub markers: CellMarkers,
    pub is_selected: bool,
    pub is_highlighted: bool,
}

/// Everything needed to draw the calendar
#[derive(Clone, Debug, PartialEq)]
pub struct MonthView {
    pub month: YearMonth,
    pub selected: NaiveDate,
    pub load: LoadState,
    pub cells: Vec<CellView>,
}

impl MonthView {
    pub fn weeks(&self) -> std::slice::Chunks<'_, CellView> {
        self.cells.chunks(crate::month::DAYS_PER_WEEK)
    }
}

/// The controller of the schedule page
pub struct CalendarPage<S>
where
    S: ScheduleSource + Send + Sync,
{
    source: Arc<S>,
    bus: SelectionBus,
    state: Arc<Mutex<PageState>>,
    generation: Arc<AtomicU64>,
    _mount: Mount,
}

fn lock_state(state: &Mutex<PageState>) -> MutexGuard<'_, PageState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S> CalendarPage<S>
where
    S: ScheduleSource + Send + Sync,
{
    /// Mount the page on `bus`, showing the month of `today`, with `today` selected
    pub fn new(source: Arc<S>, bus: &SelectionBus, today: NaiveDate) -> Self {
        let state = Arc::new(Mutex::new(PageState {
            month: YearMonth::of(today),
            selected: today,
            events: Vec::new(),
            load: LoadState::Idle,
            stale: true,
            search_results: Vec::new(),
            highlighted: BTreeSet::new(),
        }));
        let generation = Arc::new(AtomicU64::new(0));

        let mut mount = bus.mount();
        {
            let state = Arc::clone(&state);
            let generation = Arc::clone(&generation);
            // Follow the memo panel, without selecting anything in return
            mount.on(SignalKind::DateChanged, move |signal| {
                if let Signal::DateChanged(date) = signal {
                    let mut st = lock_state(&state);
                    st.selected = *date;
                    st.switch_month(YearMonth::of(*date), &generation);
                }
            });
        }
        {
            let state = Arc::clone(&state);
            mount.on(SignalKind::ScheduleUpdated, move |_| {
                lock_state(&state).stale = true;
            });
        }

        Self { source, bus: bus.clone(), state, generation, _mount: mount }
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        lock_state(&self.state)
    }

    pub fn month(&self) -> YearMonth { self.lock().month }
    pub fn selected(&self) -> NaiveDate { self.lock().selected }
    pub fn load_state(&self) -> LoadState { self.lock().load.clone() }
    pub fn events(&self) -> Vec<Event> { self.lock().events.clone() }

    /// Whether the events should be fetched again (see [`Self::refresh_if_needed`])
    pub fn needs_refresh(&self) -> bool { self.lock().stale }

    /// The user clicked on a day. This tells the memo panel to open it
    pub fn select_date(&self, date: NaiveDate) {
        {
            let mut st = self.lock();
            st.selected = date;
            st.switch_month(YearMonth::of(date), &self.generation);
        }
        self.bus.publish(Signal::DateSelected(date));
    }

    /// Show another month. Its events have to be fetched (see [`Self::fetch_month`])
    pub fn set_month(&self, month: YearMonth) {
        self.lock().switch_month(month, &self.generation);
    }

    pub fn next_month(&self) {
        let next = self.month().next();
        self.set_month(next);
    }

    pub fn prev_month(&self) {
        let prev = self.month().prev();
        self.set_month(prev);
    }

    /// Fetch the events of the visible month.
    ///
    /// Returns whether the response was applied: it is discarded if another fetch was
    /// issued (or another month shown) in the meantime. A failed fetch empties the month
    /// and leaves the page in [`LoadState::Failed`].
    pub async fn fetch_month(&self) -> bool {
        let (month, ticket) = {
            let mut st = self.lock();
            st.load = LoadState::Loading;
            (st.month, self.generation.fetch_add(1, Ordering::SeqCst) + 1)
        };

        let result = self.source.list_month(month).await;

        let mut st = self.lock();
        if self.generation.load(Ordering::SeqCst) != ticket {
            log::debug!("Discarding an outdated response for {}", month);
            return false;
        }
        match result {
            Ok(events) => {
                log::info!("Showing {} events for {}", events.len(), month);
                st.events = events;
                st.load = LoadState::Ready;
            },
            Err(err) => {
                log::warn!("Unable to fetch the events of {}: {}", month, err);
                st.events.clear();
                st.load = LoadState::Failed(err.to_string());
            },
        }
        st.stale = false;
        true
    }

    /// Show `month` and fetch its events
    pub async fn load_month(&self, month: YearMonth) -> bool {
        self.set_month(month);
        self.fetch_month().await
    }

    /// Fetch the events again if the month changed or a refresh hint was received
    pub async fn refresh_if_needed(&self) -> bool {
        if self.needs_refresh() {
            self.fetch_month().await
        } else {
            false
        }
    }

    /// The empty grid of the visible month
    pub fn grid(&self) -> Vec<MonthCell> {
        self.month().grid()
    }

    /// The markers of the visible month
    pub fn bins(&self) -> EventBins {
        let st = self.lock();
        bin_events(&st.events, &st.month.grid())
    }

    /// Render the visible month
    pub fn view(&self) -> MonthView {
        let st = self.lock();
        let grid = st.month.grid();
        let bins = bin_events(&st.events, &grid);
        let cells = grid.iter()
            .map(|cell| CellView {
                date: cell.date,
                markers: cell.date.map(|d| bins.markers(d)).unwrap_or_default(),
                is_selected: cell.date == Some(st.selected),
                is_highlighted: cell.date.map(|d| st.highlighted.contains(&d)).unwrap_or(false),
            })
            .collect();

        MonthView {
            month: st.month,
            selected: st.selected,
            load: st.load.clone(),
            cells,
        }
    }

    /// Search every event by title and memo, and highlight every day the results cover.
    ///
    /// A blank query clears the search. A failed search clears it as well, and returns the error
    pub async fn search(&self, query: &str) -> Result<usize> {
        if query.trim().is_empty() {
            self.clear_search();
            return Ok(0);
        }

        match self.source.search(query).await {
            Ok(results) => {
                let mut st = self.lock();
                st.highlighted = highlighted_dates(&results);
                st.search_results = results;
                Ok(st.search_results.len())
            },
            Err(err) => {
                log::warn!("Search for {:?} failed: {}", query, err);
                self.clear_search();
                Err(err)
            },
        }
    }

    pub fn clear_search(&self) {
        let mut st = self.lock();
        st.highlighted.clear();
        st.search_results.clear();
    }

    pub fn search_results(&self) -> Vec<Event> {
        self.lock().search_results.clone()
    }

    /// The highlighted days, in chronological order
    pub fn highlighted_dates(&self) -> Vec<NaiveDate> {
        self.lock().highlighted.iter().copied().collect()
    }

    /// Add an event from the page form.
    ///
    /// On success, the event is shown right away if it overlaps the visible month.
    /// On failure, nothing changes on the page.
    pub async fn add_event(&self, draft: EventDraft) -> Result<Event> {
        let event = match self.source.create(draft).await {
            Ok(event) => event,
            Err(err) => {
                log::error!("Unable to save the event: {}", err);
                return Err(err);
            },
        };

        let mut st = self.lock();
        if event.overlaps(st.month.first_day(), st.month.last_day()) {
            st.events.push(event.clone());
        }
        Ok(event)
    }
}

impl<S> std::fmt::Debug for CalendarPage<S>
where
    S: ScheduleSource + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarPage")
            .field("state", &*self.lock())
            .finish()
    }
}
