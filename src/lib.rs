// src/lib.rs
// Public library surface for the host binary and integration tests.

pub mod chat;
pub mod config;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod news;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::chat::{ChatMessage, ChatWidget, Sender, SubmitOutcome};
pub use crate::config::WidgetConfig;
pub use crate::dom::{Container, Document, Element, InputControl};
pub use crate::error::WidgetError;
pub use crate::fetch::{FetchError, FetchRequest, FetchResponse, HttpFetch, TimeBoundedFetch};
pub use crate::news::schedule::{spawn_schedule, RefreshSchedule};
pub use crate::news::{NewsFeedWidget, NewsItem, NewsState};
