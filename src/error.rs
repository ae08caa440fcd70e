//! Error types of this crate

use chrono::NaiveDate;
use thiserror::Error;

use crate::event::EventId;

/// Everything that can go wrong while building, binning or fetching schedules
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// A year-month string is not a valid `YYYY-MM`
    #[error("Invalid month '{0}'. Expected YYYY-MM")]
    InvalidMonthFormat(String),

    /// An event ends before it starts
    #[error("Event {id} has an invalid range: ends on {end} but starts on {start}")]
    InvalidEventRange {
        id: EventId,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// A date string is not a valid `YYYY-MM-DD`
    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    /// An event draft or patch cannot be sent as is (e.g. a blank title)
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// The server could not be reached, refused the request or answered with an error
    #[error("Network error: {0}")]
    Network(String),

    /// The server does not know this id (anymore)
    #[error("No event with id {0}")]
    NotFound(EventId),

    /// The local cache could not be read or written
    #[error("Cache error: {0}")]
    Cache(String),
}

impl ScheduleError {
    /// Whether this error comes from the transport (and may go away on a later attempt)
    pub fn is_network(&self) -> bool {
        matches!(self, ScheduleError::Network(_))
    }
}

impl From<reqwest::Error> for ScheduleError {
    fn from(err: reqwest::Error) -> Self {
        ScheduleError::Network(err.to_string())
    }
}

impl From<std::io::Error> for ScheduleError {
    fn from(err: std::io::Error) -> Self {
        ScheduleError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for ScheduleError {
    fn from(err: serde_json::Error) -> Self {
        ScheduleError::Cache(err.to_string())
    }
}

/// Result type alias for schedule operations
pub type Result<T> = std::result::Result<T, ScheduleError>;
