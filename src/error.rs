//! Error types for the scraping core.

use std::time::Duration;
use thiserror::Error;

/// Failures raised inside the scraping core.
///
/// Only `BrowserLaunch` is allowed to reach a caller as a hard failure; every
/// other variant is contained at the boundary that produced it.
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("browser session error: {0}")]
    Session(String),

    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out after {timeout:?} waiting for `{selector}`")]
    SelectorWaitTimeout { selector: String, timeout: Duration },

    #[error("pagination stalled on page {page}: {reason}")]
    PaginationStalled { page: u32, reason: String },

    #[error("failed to extract {section}: {reason}")]
    Extraction { section: &'static str, reason: String },

    #[error("failed to fetch details for player {id}: {reason}")]
    DetailFetch { id: String, reason: String },

    #[error("page script failed: {0}")]
    Script(String),

    #[error("roster scrape produced no players: {0}")]
    EmptyRoster(String),
}

impl ScrapeError {
    pub fn extraction(section: &'static str, reason: impl Into<String>) -> Self {
        Self::Extraction {
            section,
            reason: reason.into(),
        }
    }

    /// Whether this error comes from the browser failing to start.
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, Self::BrowserLaunch(_))
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
