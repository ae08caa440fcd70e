//! Schedule events, as stored by the schedule server

use std::fmt::{Display, Formatter};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, ScheduleError};

/// Time of day used when the server sends none
pub const DEFAULT_TIME: &str = "09:00";



/// The opaque id the server assigns to an event.
///
/// The server sends integers, but nothing here relies on that.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId {
    content: String,
}

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Generate a random EventId
    pub fn random() -> Self {
        let random = uuid::Uuid::new_v4().to_hyphenated().to_string();
        Self { content: random }
    }
}

impl From<String> for EventId {
    fn from(content: String) -> Self {
        Self { content }
    }
}
impl From<&str> for EventId {
    fn from(content: &str) -> Self {
        Self { content: content.to_string() }
    }
}
impl From<u64> for EventId {
    fn from(content: u64) -> Self {
        Self { content: content.to_string() }
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

/// Used to support serde
impl Serialize for EventId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.content)
    }
}
/// Used to support serde. Accepts both JSON strings and JSON integers
impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<EventId, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Integer(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => EventId::from(s),
            RawId::Integer(i) => EventId::from(i.to_string()),
        })
    }
}



/// The closed classification of an event. It decides which marker a calendar cell shows
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Meal,
    Workout,
    General,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Meal, Category::Workout, Category::General];

    /// The value the server uses for this category
    pub fn wire_name(&self) -> &'static str {
        match self {
            Category::Meal => "식사",
            Category::Workout => "운동",
            Category::General => "일반",
        }
    }
}

/// Used to support serde
impl Serialize for Category {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.wire_name())
    }
}
/// Used to support serde. Unknown kinds are read as [`Category::General`], like the server does
impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Category, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.trim() {
            "식사" | "meal" => Category::Meal,
            "운동" | "workout" => Category::Workout,
            "일반" | "general" => Category::General,
            other => {
                log::warn!("Unknown event kind {:?}, using {}", other, Category::General);
                Category::General
            },
        })
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::General
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Meal => write!(f, "meal"),
            Category::Workout => write!(f, "workout"),
            Category::General => write!(f, "general"),
        }
    }
}



/// A schedule entry: a meal, a workout or anything else, over one day or a period of days
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    #[serde(rename = "date")]
    start_date: NaiveDate,
    #[serde(default)]
    end_date: Option<NaiveDate>,
    title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    memo: String,
    #[serde(rename = "kind", default, deserialize_with = "null_as_default")]
    category: Category,
    #[serde(default = "default_time", with = "hhmm")]
    time: NaiveTime,
}

impl Event {
    pub fn new(id: EventId, start_date: NaiveDate, end_date: Option<NaiveDate>, title: String, category: Category) -> Self {
        Self {
            id, start_date, end_date, title, category,
            memo: String::new(),
            time: default_time(),
        }
    }

    pub fn with_memo(mut self, memo: &str) -> Self {
        self.memo = memo.to_string();
        self
    }

    pub fn with_time(mut self, time: NaiveTime) -> Self {
        self.time = time;
        self
    }

    pub fn id(&self) -> &EventId { &self.id }
    pub fn start_date(&self) -> NaiveDate { self.start_date }
    pub fn end_date(&self) -> Option<NaiveDate> { self.end_date }
    pub fn title(&self) -> &str { &self.title }
    pub fn memo(&self) -> &str { &self.memo }
    pub fn category(&self) -> Category { self.category }
    pub fn time(&self) -> NaiveTime { self.time }

    /// The inclusive range of dates this event is visible on.
    ///
    /// Fails if the event ends before it starts
    pub fn span(&self) -> Result<(NaiveDate, NaiveDate)> {
        match self.end_date {
            None => Ok((self.start_date, self.start_date)),
            Some(end) if end >= self.start_date => Ok((self.start_date, end)),
            Some(end) => Err(ScheduleError::InvalidEventRange {
                id: self.id.clone(),
                start: self.start_date,
                end,
            }),
        }
    }

    /// Whether this event lasts more than one day
    pub fn is_period(&self) -> bool {
        match self.end_date {
            Some(end) => end > self.start_date,
            None => false,
        }
    }

    /// Whether this event is visible on `date`. Events with an invalid range are never visible
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.overlaps(date, date)
    }

    /// Whether this event is visible on at least one day of `[first, last]`
    pub fn overlaps(&self, first: NaiveDate, last: NaiveDate) -> bool {
        match self.span() {
            Ok((start, end)) => start <= last && end >= first,
            Err(_) => false,
        }
    }

    /// Apply a partial update, the way the server does
    pub fn apply(&mut self, patch: &EventPatch) {
        if let Some(date) = patch.start_date { self.start_date = date; }
        if let Some(end) = patch.end_date { self.end_date = Some(end); }
        if let Some(title) = &patch.title { self.title = title.clone(); }
        if let Some(memo) = &patch.memo { self.memo = memo.clone(); }
        if let Some(category) = patch.category { self.category = category; }
        if let Some(time) = patch.time { self.time = time; }
    }
}



/// The body of an event creation request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    #[serde(rename = "date")]
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub title: String,
    pub memo: String,
    #[serde(rename = "kind")]
    pub category: Category,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
}

impl EventDraft {
    /// A single-day draft at the default time, with an empty memo
    pub fn new(start_date: NaiveDate, title: &str, category: Category) -> Self {
        Self {
            start_date,
            end_date: None,
            title: title.to_string(),
            memo: String::new(),
            category,
            time: default_time(),
        }
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_memo(mut self, memo: &str) -> Self {
        self.memo = memo.to_string();
        self
    }

    pub fn at(mut self, time: NaiveTime) -> Self {
        self.time = time;
        self
    }

    /// Check this draft can be sent to the server
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ScheduleError::InvalidEvent("the title must not be empty".to_string()));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(ScheduleError::InvalidEventRange {
                    id: EventId::from("<draft>"),
                    start: self.start_date,
                    end,
                });
            }
        }
        Ok(())
    }

    /// The event the server would return for this draft
    pub fn into_event(self, id: EventId) -> Event {
        Event {
            id,
            start_date: self.start_date,
            // The server stores the start date when no end date is given
            end_date: Some(self.end_date.unwrap_or(self.start_date)),
            title: self.title,
            memo: self.memo,
            category: self.category,
            time: self.time,
        }
    }
}



/// The body of a partial update request. Only the `Some` fields are sent
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    #[serde(rename = "date", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(rename = "kind", skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(with = "hhmm_opt", skip_serializing_if = "Option::is_none", default)]
    pub time: Option<NaiveTime>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Check this patch, applied to `current`, still makes a valid event
    pub fn validate_against(&self, current: &Event) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ScheduleError::InvalidEvent("the title must not be empty".to_string()));
            }
        }
        let mut patched = current.clone();
        patched.apply(self);
        patched.span().map(|_| ())
    }

    /// Check the fields of this patch are consistent with each other
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ScheduleError::InvalidEvent("the title must not be empty".to_string()));
            }
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ScheduleError::InvalidEventRange {
                    id: EventId::from("<patch>"),
                    start,
                    end,
                });
            }
        }
        Ok(())
    }
}



/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ScheduleError::InvalidDate(s.to_string()))
}

fn default_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_else(NaiveTime::default)
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

/// `HH:MM` times. Missing, null or empty values fall back to [`DEFAULT_TIME`]
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format("%H:%M"))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(super::default_time()),
            Some(s) => super::parse_time(s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}', expected HH:MM", s))),
        }
    }
}

mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => serializer.collect_str(&t.format("%H:%M")),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_time(s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}', expected HH:MM", s))),
        }
    }
}
