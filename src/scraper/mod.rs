//! Web scraper for asia-basket.com
//!
//! Provides the shared headless browser, page navigation, in-page pagination,
//! HTML parsing and the result cache behind the roster and player endpoints.

pub mod browser;
pub mod cache;
pub mod navigator;
pub mod orchestrator;
pub mod page;
pub mod pagination;
pub mod parsers;

#[cfg(test)]
pub(crate) mod testing;

pub use browser::{BrowserManager, ChromeLauncher, SessionProvider};
pub use cache::{ResultCache, RosterSnapshot};
pub use orchestrator::{Fetched, OrchestratorSettings, ScrapeOrchestrator, Source};

/// Base URL for asia-basket.com
pub const BASE_URL: &str = "https://www.asia-basket.com";

/// Build player profile URL; the name segment is ignored by the site
pub fn player_url(base_url: &str, player_id: &str) -> String {
    format!("{}/player/_/{}", base_url.trim_end_matches('/'), player_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_url() {
        assert_eq!(
            player_url(BASE_URL, "9423"),
            "https://www.asia-basket.com/player/_/9423"
        );
        assert_eq!(
            player_url("http://localhost:9000/", "1"),
            "http://localhost:9000/player/_/1"
        );
    }
}
