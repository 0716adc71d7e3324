// src/telemetry.rs
use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series carry descriptions once a
/// recorder is installed by the host).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_refresh_total", "News refresh attempts.");
        describe_counter!(
            "news_refresh_errors_total",
            "News refreshes that ended in the failed state."
        );
        describe_gauge!("news_items_rendered", "Items shown by the last news refresh.");
        describe_counter!("chat_messages_total", "Chat messages submitted by the user.");
        describe_counter!(
            "chat_errors_total",
            "Chat submissions answered with a failure message."
        );
        describe_counter!(
            "fetch_timeouts_total",
            "Requests aborted because they exceeded their deadline."
        );
    });
}
