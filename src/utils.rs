///! Some utility functions

use chrono::Datelike;

use crate::binner::CategorySet;
use crate::calendar_page::{CellView, LoadState, MonthView};
use crate::event::{Category, Event};
use crate::month::DAYS_PER_WEEK;

const CELL_WIDTH: usize = 9;
const WEEKDAYS: [&str; DAYS_PER_WEEK] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// The letter of a category: upper case for single-day events, lower case for periods
pub fn marker_char(category: Category, period: bool) -> char {
    let c = match category {
        Category::Meal => 'M',
        Category::Workout => 'W',
        Category::General => 'G',
    };
    if period { c.to_ascii_lowercase() } else { c }
}

fn markers_text(set: CategorySet, period: bool) -> String {
    set.categories().into_iter().map(|c| marker_char(c, period)).collect()
}

fn cell_text(cell: &CellView) -> String {
    let date = match cell.date {
        None => return " ".repeat(CELL_WIDTH),
        Some(date) => date,
    };

    let selected = if cell.is_selected { '>' } else { ' ' };
    let highlighted = if cell.is_highlighted { '*' } else { ' ' };
    let text = format!("{}{:>2}{}{}{}",
        selected, date.day(), highlighted,
        markers_text(cell.markers.single_day, false),
        markers_text(cell.markers.period, true),
    );
    format!("{:<width$}", text, width = CELL_WIDTH)
}

/// Render a month as text, one line per week.
///
/// `>` marks the selected day, `*` the search highlights. Markers follow the day number:
/// `M`/`W`/`G` for single-day meals, workouts and other events, `m`/`w`/`g` for periods.
pub fn render_month(view: &MonthView) -> String {
    let mut out = format!("{}\n", view.month.first_day().format("%B %Y"));
    for name in WEEKDAYS.iter() {
        out.push_str(&format!("{:<width$}", name, width = CELL_WIDTH));
    }
    out = out.trim_end().to_string();
    out.push('\n');

    for week in view.weeks() {
        let line: String = week.iter().map(cell_text).collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }

    match &view.load {
        LoadState::Failed(err) => out.push_str(&format!("(unable to load the events: {})\n", err)),
        LoadState::Loading => out.push_str("(loading...)\n"),
        LoadState::Idle | LoadState::Ready => (),
    }
    out
}

/// A debug utility that pretty-prints events
pub fn print_events(events: &[Event]) {
    for event in events {
        print_event(event);
    }
}

pub fn print_event(event: &Event) {
    let range = match event.end_date() {
        Some(end) if end != event.start_date() => format!("{} → {}", event.start_date(), end),
        _ => event.start_date().to_string(),
    };
    println!("    {} {} {}\t{}\t{}",
        marker_char(event.category(), event.is_period()),
        event.time().format("%H:%M"),
        event.title(),
        range,
        event.id(),
    );
}


#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;

    use crate::binner::{bin_events, CellMarkers};
    use crate::event::EventId;
    use crate::month::YearMonth;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn february_view(events: &[Event]) -> MonthView {
        let month = YearMonth::new(2024, 2).unwrap();
        let grid = month.grid();
        let bins = bin_events(events, &grid);
        let cells = grid.iter().map(|cell| CellView {
            date: cell.date,
            markers: cell.date.map(|d| bins.markers(d)).unwrap_or_else(CellMarkers::default),
            is_selected: cell.date == Some(ymd(2024, 2, 10)),
            is_highlighted: cell.date == Some(ymd(2024, 2, 14)),
        }).collect();
        MonthView { month, selected: ymd(2024, 2, 10), load: LoadState::Ready, cells }
    }

    #[test]
    fn test_render_month() {
        let events = vec![
            Event::new(EventId::from(1u64), ymd(2024, 2, 10), Some(ymd(2024, 2, 12)), "Diet".into(), Category::Meal),
            Event::new(EventId::from(2u64), ymd(2024, 2, 10), None, "Run".into(), Category::Workout),
        ];
        let text = render_month(&february_view(&events));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "February 2024");
        assert!(lines[1].starts_with("Sun      Mon"));
        // Title, weekdays, then 5 weeks
        assert_eq!(lines.len(), 7);
        // February 10th is the last cell of the second week
        assert!(lines[3].ends_with(">10 Wm"));
        assert!(lines[4].starts_with(" 11 m     12 m     13"));
        assert!(lines[4].contains(" 14*"));
    }

    #[test]
    fn test_render_failure() {
        let mut view = february_view(&[]);
        view.load = LoadState::Failed("Network error: timeout".to_string());
        let text = render_month(&view);
        assert!(text.ends_with("(unable to load the events: Network error: timeout)\n"));
    }

    #[test]
    fn test_marker_char() {
        assert_eq!(marker_char(Category::Meal, false), 'M');
        assert_eq!(marker_char(Category::General, true), 'g');
    }
}
