//! Chat widget: posts the user's text to the bot endpoint and appends both
//! sides of the exchange to an append-only log.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::WidgetConfig;
use crate::dom::{Container, Document, Element, InputControl, Submission};
use crate::error::WidgetError;
use crate::fetch::{FetchError, FetchRequest, HttpFetch};
use crate::telemetry::ensure_metrics_described;

pub const FORM_ID: &str = "chat-form";
pub const INPUT_ID: &str = "chat-input";
pub const MESSAGES_ID: &str = "chat-messages";

/// Shown when the bot answers without a usable `reply`.
pub const FALLBACK_REPLY: &str = "Sorry, I don't have an answer for that.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn css_class(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
        }
    }

    pub fn to_element(&self) -> Element {
        Element::new("div")
            .with_class("message")
            .with_class(self.sender.css_class())
            .with_text(self.text.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub reply: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input: nothing sent, nothing appended.
    Ignored,
    /// A previous request is still pending.
    Busy,
    Replied,
    Failed,
}

pub fn failure_text(err: &FetchError) -> String {
    format!("Error: the bot could not answer ({err})")
}

/// Re-enables and focuses the input when a submission ends, including when
/// the submit future is dropped while the request is still pending.
struct InputRelease<'a>(&'a InputControl);

impl Drop for InputRelease<'_> {
    fn drop(&mut self) {
        self.0.set_disabled(false);
        self.0.focus();
    }
}

/// Add the chat markup the widget expects to a bare document.
pub fn mount_markup(document: &Document) {
    document.append_form(FORM_ID);
    document.append_input(InputControl::new(INPUT_ID));
    document.append_container(Container::new(MESSAGES_ID));
}

pub struct ChatWidget {
    log: Container,
    input: InputControl,
    fetch: Arc<dyn HttpFetch>,
    url: String,
    timeout: Duration,
    history: Mutex<Vec<ChatMessage>>,
}

impl ChatWidget {
    /// Bind to `#chat-form`, `#chat-input` and `#chat-messages`. Unlike the
    /// news widget, missing chat markup is an error.
    pub fn attach(
        document: &Document,
        config: &WidgetConfig,
        fetch: Arc<dyn HttpFetch>,
    ) -> Result<Self, WidgetError> {
        if !document.has_element(FORM_ID) {
            return Err(WidgetError::MissingElement(FORM_ID.into()));
        }
        let input = document
            .input_by_id(INPUT_ID)
            .ok_or_else(|| WidgetError::MissingElement(INPUT_ID.into()))?;
        let log = document
            .container_by_id(MESSAGES_ID)
            .ok_or_else(|| WidgetError::MissingElement(MESSAGES_ID.into()))?;
        Self::new(log, input, config, fetch)
    }

    pub fn new(
        log: Container,
        input: InputControl,
        config: &WidgetConfig,
        fetch: Arc<dyn HttpFetch>,
    ) -> Result<Self, WidgetError> {
        ensure_metrics_described();
        Ok(Self {
            log,
            input,
            fetch,
            url: config.chat_url()?.to_string(),
            timeout: config.chat_timeout(),
            history: Mutex::new(Vec::new()),
        })
    }

    pub fn input(&self) -> &InputControl {
        &self.input
    }

    pub fn log(&self) -> &Container {
        &self.log
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.history_guard().clone()
    }

    fn history_guard(&self) -> MutexGuard<'_, Vec<ChatMessage>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(&self, msg: ChatMessage) {
        self.log.append(msg.to_element());
        self.log.scroll_to_bottom();
        self.history_guard().push(msg);
    }

    async fn ask(&self, text: &str) -> Result<ChatReply, FetchError> {
        let body = serde_json::to_value(ChatRequest { message: text })
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        let req = FetchRequest::post_json(self.url.as_str(), body).with_timeout(self.timeout);
        self.fetch.fetch(req).await?.json()
    }

    /// Handle one form submission.
    pub async fn submit(&self) -> SubmitOutcome {
        let text = match self.input.take_submission() {
            Submission::Disabled => {
                debug!(target: "chat", "submission while a request is pending; ignored");
                return SubmitOutcome::Busy;
            }
            Submission::Blank => return SubmitOutcome::Ignored,
            Submission::Text(t) => t,
        };
        let _release = InputRelease(&self.input);

        counter!("chat_messages_total").increment(1);
        self.append(ChatMessage::user(text.as_str()));

        let outcome = match self.ask(&text).await {
            Ok(reply) => {
                let answer = reply
                    .reply
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_REPLY.to_string());
                self.append(ChatMessage::bot(answer));
                SubmitOutcome::Replied
            }
            Err(e) => {
                warn!(target: "chat", error = %e, url = %self.url, "chat request failed");
                counter!("chat_errors_total").increment(1);
                self.append(ChatMessage::bot(failure_text(&e)));
                SubmitOutcome::Failed
            }
        };
        outcome
    }

    /// `submit()` raced against `cancel`. Returns `None` when `cancel` wins;
    /// the pending request is dropped and the input is released.
    pub async fn submit_or_cancel<F>(&self, cancel: F) -> Option<SubmitOutcome>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            outcome = self.submit() => Some(outcome),
            _ = cancel => {
                debug!(target: "chat", "submission cancelled while pending");
                None
            }
        }
    }
}
