//! News feed widget: polls the news endpoint and renders the result into one
//! container. Every refresh fully replaces the container's children.

pub mod schedule;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use metrics::{counter, gauge};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info, warn};

use crate::config::WidgetConfig;
use crate::dom::{Container, Document, Element};
use crate::error::WidgetError;
use crate::fetch::{FetchError, FetchRequest, HttpFetch};
use crate::telemetry::ensure_metrics_described;

pub const LOADING_TEXT: &str = "Loading news…";
pub const EMPTY_TEXT: &str = "No news available right now.";
pub const ERROR_PREFIX: &str = "Unable to load news";

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    /// RFC 3339 as sent by the service; kept raw so a bad value still renders.
    #[serde(default, alias = "publishedAt", deserialize_with = "null_as_default")]
    pub published_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewsResponse {
    #[serde(default)]
    pub items: Option<Vec<NewsItem>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsState {
    Loading,
    Displaying(usize),
    Empty,
    Failed(String),
}

/// Local wall-clock rendering of `published_at`; unparseable input is shown
/// verbatim.
pub fn format_published(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string();
    }
    // Naive timestamps are taken as UTC.
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        let dt: DateTime<Utc> = DateTime::from_naive_utc_and_offset(naive, Utc);
        return dt.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string();
    }
    raw.to_string()
}

fn placeholder(text: &str) -> Element {
    Element::new("p").with_class("news-placeholder").with_text(text)
}

fn error_block(err: &FetchError) -> Element {
    Element::new("p")
        .with_class("news-error")
        .with_attr("style", "color:red")
        .with_text(format!("{ERROR_PREFIX}: {err}"))
}

pub fn render_item(item: &NewsItem) -> Element {
    let meta = format!(
        "{} · Sources: {}",
        format_published(&item.published_at),
        item.sources.join(", ")
    );
    Element::new("article")
        .with_class("news-item")
        .with_child(Element::new("h3").with_text(item.title.as_str()))
        .with_child(
            Element::new("p")
                .with_class("news-summary")
                .with_text(item.summary.as_str()),
        )
        .with_child(
            Element::new("a")
                .with_attr("href", item.url.as_str())
                .with_attr("target", "_blank")
                .with_attr("rel", "noopener noreferrer")
                .with_text("Read more"),
        )
        .with_child(Element::new("small").with_class("news-meta").with_text(meta))
}

/// One block per item in input order, or the "no news" placeholder.
pub fn render(items: Option<&[NewsItem]>) -> Vec<Element> {
    match items {
        Some(items) if !items.is_empty() => items.iter().map(render_item).collect(),
        _ => vec![placeholder(EMPTY_TEXT)],
    }
}

pub struct NewsFeedWidget {
    container: Container,
    fetch: Arc<dyn HttpFetch>,
    url: String,
    timeout: Duration,
    state: Mutex<NewsState>,
}

impl NewsFeedWidget {
    /// Bind to `#news` (or the configured id), creating the container when the
    /// host markup lacks it.
    pub fn attach(
        document: &Document,
        config: &WidgetConfig,
        fetch: Arc<dyn HttpFetch>,
    ) -> Result<Self, WidgetError> {
        let id = &config.news_container_id;
        let (container, created) = document
            .get_or_create_container(id)
            .ok_or_else(|| WidgetError::NotAContainer(id.clone()))?;
        if created {
            warn!(
                target: "news",
                id = %id,
                "news container missing from host document; created one"
            );
        }
        Self::new(container, config, fetch)
    }

    pub fn new(
        container: Container,
        config: &WidgetConfig,
        fetch: Arc<dyn HttpFetch>,
    ) -> Result<Self, WidgetError> {
        ensure_metrics_described();
        Ok(Self {
            container,
            fetch,
            url: config.news_url()?.to_string(),
            timeout: config.news_timeout(),
            state: Mutex::new(NewsState::Loading),
        })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn state(&self) -> NewsState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, next: NewsState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    async fn load(&self) -> Result<Vec<NewsItem>, FetchError> {
        let req = FetchRequest::get(self.url.as_str()).with_timeout(self.timeout);
        let resp = self.fetch.fetch(req).await?;
        let body: NewsResponse = resp.json()?;
        Ok(body.items.unwrap_or_default())
    }

    /// Loading → Displaying | Empty | Failed. Never returns an error; failures
    /// are rendered in place and logged.
    pub async fn refresh(&self) -> NewsState {
        self.set_state(NewsState::Loading);
        self.container.replace_children(vec![placeholder(LOADING_TEXT)]);
        counter!("news_refresh_total").increment(1);

        let next = match self.load().await {
            Ok(items) => {
                self.container.replace_children(render(Some(items.as_slice())));
                gauge!("news_items_rendered").set(items.len() as f64);
                info!(target: "news", items = items.len(), "news refreshed");
                if items.is_empty() {
                    NewsState::Empty
                } else {
                    NewsState::Displaying(items.len())
                }
            }
            Err(e) => {
                error!(target: "news", error = %e, url = %self.url, "news refresh failed");
                counter!("news_refresh_errors_total").increment(1);
                self.container.replace_children(vec![error_block(&e)]);
                NewsState::Failed(e.to_string())
            }
        };

        self.set_state(next.clone());
        next
    }
}
