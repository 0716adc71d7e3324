// tests/news_widget.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use common::{config_for, network_err, ok_json, ScriptedFetch};
use pole_position_widgets::fetch::{FetchError, FetchRequest, FetchResponse, HttpFetch, Method};
use pole_position_widgets::news::{self, NewsFeedWidget, NewsState, EMPTY_TEXT, LOADING_TEXT};
use pole_position_widgets::{Container, Document, WidgetError};

fn grid_payload() -> serde_json::Value {
    json!({
        "items": [
            {
                "title": "Pole for Leclerc in Monaco",
                "summary": "A record lap around the principality.",
                "url": "https://f1.example/monaco-pole",
                "published_at": "2025-05-24T14:05:00Z",
                "sources": ["FIA", "Autosport"]
            },
            {
                "title": "Rain expected at Spa",
                "summary": "Teams prepare intermediates.",
                "url": "https://f1.example/spa-rain",
                "published_at": "2025-07-26T09:00:00Z",
                "sources": ["Motorsport.com"]
            }
        ]
    })
}

#[test]
fn attach_creates_missing_container_exactly_once() {
    let doc = Document::new();
    let cfg = config_for("http://bot.local");
    let fetch: Arc<dyn HttpFetch> = ScriptedFetch::new(vec![]);

    let first = NewsFeedWidget::attach(&doc, &cfg, fetch.clone()).expect("attach");
    let second = NewsFeedWidget::attach(&doc, &cfg, fetch).expect("attach again");

    assert_eq!(doc.count_by_id("news"), 1);
    assert!(first.container().ptr_eq(second.container()));
}

#[test]
fn attach_uses_existing_container() {
    let doc = Document::new();
    let host = Container::new("news");
    doc.append_container(host.clone());

    let w = NewsFeedWidget::attach(&doc, &config_for("http://bot.local"), ScriptedFetch::new(vec![]))
        .unwrap();
    assert!(w.container().ptr_eq(&host));
    assert_eq!(doc.count_by_id("news"), 1);
}

#[tokio::test]
async fn refresh_renders_items_in_order() {
    let fetch = ScriptedFetch::new(vec![ok_json(grid_payload())]);
    let container = Container::new("news");
    let w = NewsFeedWidget::new(container.clone(), &config_for("http://bot.local"), fetch.clone())
        .unwrap();

    assert_eq!(w.refresh().await, NewsState::Displaying(2));

    let blocks = container.children();
    assert_eq!(blocks.len(), 2);
    let first = blocks[0].text_content();
    assert!(first.contains("Pole for Leclerc in Monaco"));
    assert!(first.contains("A record lap around the principality."));
    assert!(first.contains("Sources: FIA, Autosport"));
    assert!(first.contains(&news::format_published("2025-05-24T14:05:00Z")));
    assert_eq!(
        blocks[0].find_tag("a").and_then(|a| a.attr("href")),
        Some("https://f1.example/monaco-pole")
    );
    assert!(blocks[1].text_content().contains("Rain expected at Spa"));

    let reqs = fetch.requests();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].method, Method::Get);
    assert_eq!(reqs[0].url, "http://bot.local/news?limit=20");
    assert_eq!(reqs[0].timeout, Duration::from_millis(15_000));
}

#[tokio::test]
async fn empty_or_missing_items_render_placeholder() {
    let fetch = ScriptedFetch::new(vec![ok_json(json!({ "items": [] })), ok_json(json!({}))]);
    let container = Container::new("news");
    let w = NewsFeedWidget::new(container.clone(), &config_for("http://bot.local"), fetch).unwrap();

    for _ in 0..2 {
        assert_eq!(w.refresh().await, NewsState::Empty);
        let children = container.children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].text(), Some(EMPTY_TEXT));
        assert!(!children[0].has_class("news-item"));
    }
}

#[tokio::test]
async fn failure_renders_red_error_and_later_refresh_replaces_it() {
    let fetch = ScriptedFetch::new(vec![
        Err(FetchError::Timeout {
            after: Duration::from_millis(15_000),
        }),
        ok_json(grid_payload()),
    ]);
    let container = Container::new("news");
    let w = NewsFeedWidget::new(container.clone(), &config_for("http://bot.local"), fetch).unwrap();

    let state = w.refresh().await;
    assert!(matches!(&state, NewsState::Failed(msg) if msg.contains("timed out")));
    let children = container.children();
    assert_eq!(children.len(), 1);
    assert!(children[0].has_class("news-error"));
    assert_eq!(children[0].attr("style"), Some("color:red"));
    assert!(children[0]
        .text()
        .unwrap_or_default()
        .contains("request timed out after 15000 ms"));

    assert_eq!(w.refresh().await, NewsState::Displaying(2));
    assert_eq!(container.len(), 2);
    assert!(container.children().iter().all(|c| c.has_class("news-item")));
}

#[tokio::test]
async fn undecodable_payload_is_a_failure() {
    let fetch = ScriptedFetch::new(vec![Ok(FetchResponse {
        status: 200,
        body: b"<html>maintenance</html>".to_vec(),
    })]);
    let container = Container::new("news");
    let w = NewsFeedWidget::new(container.clone(), &config_for("http://bot.local"), fetch).unwrap();

    assert!(matches!(w.refresh().await, NewsState::Failed(_)));
    assert!(container.children()[0].has_class("news-error"));
}

#[tokio::test]
async fn network_error_sets_failed_state() {
    let fetch = ScriptedFetch::new(vec![network_err("connection reset")]);
    let w = NewsFeedWidget::new(Container::new("news"), &config_for("http://bot.local"), fetch)
        .unwrap();
    w.refresh().await;
    assert_eq!(
        w.state(),
        NewsState::Failed("network error: connection reset".into())
    );
}

#[test]
fn attach_rejects_id_held_by_another_element() {
    let doc = Document::new();
    doc.append_form("news");

    let err = NewsFeedWidget::attach(&doc, &config_for("http://bot.local"), ScriptedFetch::new(vec![]))
        .err()
        .expect("id conflict");
    assert!(matches!(err, WidgetError::NotAContainer(id) if id == "news"));
    assert_eq!(doc.count_by_id("news"), 1);
}

/// Holds the response until released.
struct GatedFetch {
    gate: Notify,
}

#[async_trait]
impl HttpFetch for GatedFetch {
    async fn fetch(&self, _req: FetchRequest) -> Result<FetchResponse, FetchError> {
        self.gate.notified().await;
        Ok(FetchResponse {
            status: 200,
            body: grid_payload().to_string().into_bytes(),
        })
    }
}

#[tokio::test]
async fn loading_placeholder_is_shown_while_request_is_pending() {
    let fetch = Arc::new(GatedFetch {
        gate: Notify::new(),
    });
    let container = Container::new("news");
    let w = Arc::new(
        NewsFeedWidget::new(container.clone(), &config_for("http://bot.local"), fetch.clone())
            .unwrap(),
    );
    container.replace_children(render_stale());

    let pending = {
        let w = w.clone();
        tokio::spawn(async move { w.refresh().await })
    };
    while container.children().first().and_then(|c| c.text()) != Some(LOADING_TEXT) {
        tokio::task::yield_now().await;
    }

    assert_eq!(w.state(), NewsState::Loading);
    let children = container.children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].text(), Some(LOADING_TEXT));

    fetch.gate.notify_one();
    assert_eq!(pending.await.unwrap(), NewsState::Displaying(2));
    assert_eq!(container.len(), 2);
}

fn render_stale() -> Vec<pole_position_widgets::Element> {
    news::render(Some(&[news::NewsItem {
        title: "Old headline".into(),
        ..Default::default()
    }]))
}
