//! Print a month of the schedule server as text
//!
//! Usage: `print-month [YYYY-MM] [YYYY-MM-DD]`
//!
//! The second argument lists the events of a day as well.
//! The server URL is read from `PLANNER_API_URL`, the bearer token from `PLANNER_API_TOKEN`.

use std::sync::Arc;

use planner_calendar::cache::Cache;
use planner_calendar::calendar_page::CalendarPage;
use planner_calendar::client::Client;
use planner_calendar::config;
use planner_calendar::event::parse_date;
use planner_calendar::month::YearMonth;
use planner_calendar::selection::SelectionBus;
use planner_calendar::traits::ScheduleSource;
use planner_calendar::Provider;

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Ok(url) = std::env::var(config::URL_ENV_VAR) {
        if let Ok(mut base_url) = config::API_BASE_URL.lock() {
            *base_url = url;
        }
    }

    let mut args = std::env::args().skip(1);
    let today = chrono::Local::now().naive_local().date();
    let month = match args.next() {
        None => YearMonth::of(today),
        Some(arg) => match arg.parse::<YearMonth>() {
            Ok(month) => month,
            Err(err) => {
                log::error!("{}", err);
                std::process::exit(1);
            },
        },
    };
    let day = match args.next().map(|arg| parse_date(&arg)) {
        None => None,
        Some(Ok(day)) => Some(day),
        Some(Err(err)) => {
            log::error!("{}", err);
            std::process::exit(1);
        },
    };

    let client = match Client::from_config() {
        Ok(client) => client,
        Err(err) => {
            log::error!("Unable to create a client: {}", err);
            std::process::exit(1);
        },
    };
    let cache = Cache::from_file_or_new(&config::cache_file());
    let provider = Arc::new(Provider::new(client, cache));

    let bus = SelectionBus::new();
    let page = CalendarPage::new(Arc::clone(&provider), &bus, day.unwrap_or(today));
    page.load_month(month).await;
    print!("{}", planner_calendar::utils::render_month(&page.view()));

    if let Some(day) = day {
        println!("---- {} -----", day);
        match provider.list_by_date(day, None).await {
            Ok(events) => planner_calendar::utils::print_events(&events),
            Err(err) => log::error!("Unable to fetch the events of {}: {}", day, err),
        }
    }
}
