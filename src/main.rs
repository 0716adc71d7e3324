//! Headless host page for the news and chat widgets.
//!
//! Builds a document with the chat markup only (the news container is created
//! by the widget), starts the news schedule and feeds stdin lines to the chat
//! widget. `/news` prints the current news container, `/quit` or EOF exits.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pole_position_widgets::chat::{self, ChatWidget};
use pole_position_widgets::fetch::{HttpFetch, TimeBoundedFetch};
use pole_position_widgets::news::{schedule::spawn_schedule, NewsFeedWidget};
use pole_position_widgets::{Document, Sender, WidgetConfig};

/// Compact logs on stderr. Active in debug builds, or anywhere with
/// WIDGETS_LOG=1.
fn enable_tracing() {
    let flag = std::env::var("WIDGETS_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    if !(flag || cfg!(debug_assertions)) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news=info,chat=info,fetch=warn,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    enable_tracing();

    let config = WidgetConfig::load_default()
        .context("loading widget config")?
        .apply_env_overrides();
    tracing::info!(
        base_url = %config.base_url,
        refresh_ms = config.refresh_interval_ms,
        "widgets starting"
    );

    let fetch: Arc<dyn HttpFetch> = Arc::new(TimeBoundedFetch::new());
    let document = Document::new();
    chat::mount_markup(&document);

    let news = Arc::new(NewsFeedWidget::attach(&document, &config, fetch.clone())?);
    let chat = ChatWidget::attach(&document, &config, fetch)?;
    let schedule = spawn_schedule(news.clone(), config.refresh_interval());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else { break };
                match line.trim() {
                    "/quit" => break,
                    "/news" => println!("{}", news.container().to_html()),
                    _ => {
                        let seen = chat.history().len();
                        chat.input().set_value(line.as_str());
                        let ctrl_c = async {
                            let _ = tokio::signal::ctrl_c().await;
                        };
                        if chat.submit_or_cancel(ctrl_c).await.is_none() {
                            break;
                        }
                        for msg in chat.history().into_iter().skip(seen) {
                            let who = match msg.sender {
                                Sender::User => "you",
                                Sender::Bot => "bot",
                            };
                            println!("{who}> {}", msg.text);
                        }
                    }
                }
            }
        }
    }

    schedule.cancel();
    tracing::info!(state = ?news.state(), "widgets stopped");
    Ok(())
}
