// src/error.rs
use thiserror::Error;

/// Failures while wiring a widget to its host document.
///
/// Request-time failures never surface here; they are rendered into the
/// widget's own container instead (see [`crate::fetch::FetchError`]).
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("required element #{0} is missing from the host document")]
    MissingElement(String),

    #[error("element #{0} exists but is not a container")]
    NotAContainer(String),

    #[error("invalid endpoint url: {0}")]
    Endpoint(#[from] url::ParseError),
}
