//! Error types for paperbot

use thiserror::Error;

/// Convenience Result type using paperbot [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for paperbot
///
/// Resolution errors (`UnsupportedSource`, `NotImplemented`, `FetchStatus`,
/// `Http`) are contained to the URL that produced them: the dispatcher skips
/// the item and carries on with its siblings.
#[derive(Error, Debug)]
pub enum Error {
    /// URL host is not one of the known paper-hosting sites
    #[error("unsupported source URL: {0}")]
    UnsupportedSource(String),

    /// Host is recognized but has no extractor
    #[error("no extractor implemented for {0}")]
    NotImplemented(&'static str),

    /// Remote page answered with a non-2xx status
    #[error("fetch of {url} failed with status {status}")]
    FetchStatus { url: String, status: u16 },

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Slack Web API or RTM negotiation failure
    #[error("Slack API error: {0}")]
    Slack(String),

    /// RTM socket failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Translation backend failure
    #[error("translation error: {0}")]
    Translate(String),
}
