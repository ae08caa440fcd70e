//! This module provides a client to connect to the schedule server

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::error::{Result, ScheduleError};
use crate::event::{Category, Event, EventDraft, EventId, EventPatch};
use crate::month::YearMonth;
use crate::traits::ScheduleSource;

static MONTH_PATH: &str = "api/schedule/month";
static ITEMS_PATH: &str = "api/schedule/items";
static SEARCH_PATH: &str = "api/schedule/search";

#[derive(Deserialize)]
struct ItemsReply {
    #[serde(default)]
    items: Vec<Event>,
}

#[derive(Deserialize)]
struct ItemReply {
    item: Event,
}



/// A schedule source that fetches its data from the schedule server
#[derive(Debug)]
pub struct Client {
    base_url: Url,
    token: Option<String>,
    http: reqwest::Client,
}

impl Client {
    /// Create a client. This does not start a connection
    pub fn new<S: AsRef<str>>(base_url: S, token: Option<String>) -> Result<Self> {
        let mut base_url = Url::parse(base_url.as_ref())
            .map_err(|err| ScheduleError::Network(format!("invalid server URL {:?}: {}", base_url.as_ref(), err)))?;
        // Keep the last path segment when joining relative paths
        if base_url.path().ends_with('/') == false {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(crate::config::request_timeout())
            .build()?;

        Ok(Self {
            base_url,
            token: token.as_deref().and_then(crate::config::usable_token),
            http,
        })
    }

    /// Create a client for [`API_BASE_URL`](crate::config::API_BASE_URL), with the token from the environment
    pub fn from_config() -> Result<Self> {
        Self::new(crate::config::api_base_url(), crate::config::api_token())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path)
            .map_err(|err| ScheduleError::Network(format!("unable to build URL for {}: {}", path, err)))
    }

    fn item_endpoint(&self, id: &EventId) -> Result<Url> {
        let mut url = self.endpoint(ITEMS_PATH)?;
        url.path_segments_mut()
            .map_err(|_| ScheduleError::Network(format!("{} cannot be a base URL", self.base_url)))?
            .push(id.as_str());
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, id: Option<&EventId>) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        log::debug!("{} {}", status, response.url());

        if status.is_success() {
            return Ok(response);
        }
        match (status, id) {
            (StatusCode::NOT_FOUND, Some(id)) => Err(ScheduleError::NotFound(id.clone())),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(ScheduleError::Network(format!("Unexpected HTTP status code {:?}: {}", status, body.trim())))
            },
        }
    }

    async fn get_items(&self, url: Url) -> Result<Vec<Event>> {
        let response = self.send(self.request(Method::GET, url), None).await?;
        let reply: ItemsReply = response.json().await?;
        Ok(reply.items)
    }
}

#[async_trait]
impl ScheduleSource for Client {
    async fn list_month(&self, month: YearMonth) -> Result<Vec<Event>> {
        let mut url = self.endpoint(MONTH_PATH)?;
        url.query_pairs_mut().append_pair("month", &month.to_string());
        let items = self.get_items(url).await?;
        log::info!("Fetched {} events for {}", items.len(), month);
        Ok(items)
    }

    async fn list_by_date(&self, date: NaiveDate, kind: Option<Category>) -> Result<Vec<Event>> {
        let mut url = self.endpoint(ITEMS_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("date", &date.format("%Y-%m-%d").to_string());
            if let Some(kind) = kind {
                query.append_pair("kind", kind.wire_name());
            }
        }
        let items = self.get_items(url).await?;
        log::info!("Fetched {} events for {}", items.len(), date);
        Ok(items)
    }

    async fn create(&self, draft: EventDraft) -> Result<Event> {
        draft.validate()?;
        let url = self.endpoint(ITEMS_PATH)?;
        let response = self.send(self.request(Method::POST, url).json(&draft), None).await?;
        let reply: ItemReply = response.json().await?;
        log::info!("Created event {} ({:?})", reply.item.id(), reply.item.title());
        Ok(reply.item)
    }

    async fn update(&self, id: &EventId, patch: EventPatch) -> Result<Event> {
        patch.validate()?;
        let url = self.item_endpoint(id)?;
        let response = self.send(self.request(Method::PUT, url).json(&patch), Some(id)).await?;
        let reply: ItemReply = response.json().await?;
        log::info!("Updated event {}", id);
        Ok(reply.item)
    }

    async fn delete(&self, id: &EventId) -> Result<()> {
        let url = self.item_endpoint(id)?;
        self.send(self.request(Method::DELETE, url), Some(id)).await?;
        log::info!("Deleted event {}", id);
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<Event>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let mut url = self.endpoint(SEARCH_PATH)?;
        url.query_pairs_mut().append_pair("query", query);
        self.get_items(url).await
    }
}
