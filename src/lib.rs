//! This crate provides the scheduling core of a diet, fitness and scheduling assistant.
//!
//! It builds Sunday-first month grids in the [`month`] module, and bins (possibly multi-day) events onto them in the [`binner`] module,
//! so that every cell knows which categories have single-day events and which have periods.
//!
//! Events come from a schedule server, through the REST client of the [`client`] module. \
//! Because the server may not be reachable, the last known listings are kept in a local [`cache`]. \
//! These two "data sources" (actual client and local cache) are merged into a [`Provider`](provider::Provider),
//! that falls back to the cache when the server cannot be reached.
//!
//! The [`calendar_page`] and [`memo_panel`] modules drive the two views of the schedule page.
//! They never reference each other: they stay synchronized through the signals of the [`selection`] module.

pub mod error;
pub use error::{Result, ScheduleError};
pub mod traits;

pub mod month;
pub use month::{MonthCell, YearMonth};
pub mod event;
pub use event::{Category, Event, EventDraft, EventId, EventPatch};
pub mod binner;
pub mod selection;

pub mod client;
pub mod cache;
pub mod provider;
pub use provider::Provider;
pub mod memory_store;
pub mod mock_behaviour;

pub mod calendar_page;
pub use calendar_page::CalendarPage;
pub mod memo_panel;
pub use memo_panel::MemoPanel;

pub mod config;
pub mod utils;
