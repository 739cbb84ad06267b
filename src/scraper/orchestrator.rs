//! Roster and player-detail fetches: cache, browser session, navigation,
//! pagination and extraction tied together.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::browser::{Session, SessionProvider};
use super::cache::{ResultCache, RosterSnapshot};
use super::navigator::{Navigator, NavigatorSettings};
use super::pagination::{PaginationDriver, PaginationSettings};
use super::parsers::{
    PlayerDetail, PlayerParser, RosterParser, ROSTER_TABLE_SELECTOR, STATS_CONTAINER_SELECTOR,
};
use super::player_url;
use crate::config::AppConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::retry::{retry, RetryConfig};

/// Where a response payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Cache,
    Scrape,
    ErrorFallback,
}

/// Result of a fetch together with how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    /// Scraped by this call
    Fresh(T),
    /// Served from a live cache entry
    Cached(T),
    /// Expired cache entry served because scraping failed
    Stale { data: T, reason: String },
    /// Placeholder built because scraping failed
    Degraded { data: T, reason: String },
}

impl<T> Fetched<T> {
    pub fn source(&self) -> Source {
        match self {
            Self::Fresh(_) => Source::Scrape,
            Self::Cached(_) | Self::Stale { .. } => Source::Cache,
            Self::Degraded { .. } => Source::ErrorFallback,
        }
    }

    pub fn data(&self) -> &T {
        match self {
            Self::Fresh(data) | Self::Cached(data) => data,
            Self::Stale { data, .. } | Self::Degraded { data, .. } => data,
        }
    }

    /// Why the payload is not a fresh or cached result
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Stale { reason, .. } | Self::Degraded { reason, .. } => Some(reason),
            Self::Fresh(_) | Self::Cached(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub base_url: String,
    pub roster_url: String,
    pub roster_wait: Duration,
    pub detail_wait: Duration,
    pub navigator: NavigatorSettings,
    pub pagination: PaginationSettings,
    pub launch_retry: RetryConfig,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let scraper = &config.scraper;
        Self {
            base_url: scraper.base_url.trim_end_matches('/').to_string(),
            roster_url: scraper.roster_url(),
            roster_wait: scraper.roster_selector_timeout(),
            detail_wait: scraper.detail_selector_timeout(),
            navigator: NavigatorSettings::from_config(scraper),
            pagination: PaginationSettings::from_config(scraper),
            launch_retry: RetryConfig::from_settings(&config.retry),
        }
    }
}

/// Entry point for the HTTP layer and the CLI
pub struct ScrapeOrchestrator {
    provider: Arc<dyn SessionProvider>,
    cache: Arc<ResultCache>,
    navigator: Navigator,
    settings: OrchestratorSettings,
}

impl ScrapeOrchestrator {
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        cache: Arc<ResultCache>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            provider,
            cache,
            navigator: Navigator::new(settings.navigator.clone()),
            settings,
        }
    }

    #[cfg(test)]
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Fetch the full roster.
    ///
    /// Fails only when no browser can be launched, or nothing was scraped,
    /// and no previous roster is resident in the cache.
    pub async fn fetch_roster(&self) -> ScrapeResult<Fetched<Arc<RosterSnapshot>>> {
        if let Some(entry) = self.cache.roster.get(&()) {
            info!(
                "Cache hit! Returning {} cached players from {}",
                entry.data.players.len(),
                entry.cached_at.to_rfc3339()
            );
            return Ok(Fetched::Cached(entry.data));
        }
        info!("Cache miss or expired, scraping roster");

        let session = match self.acquire_session().await {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to launch browser after retries: {}", e);
                return self.stale_roster(e);
            }
        };

        let snapshot = match self.scrape_roster(session.as_ref()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Roster scrape failed: {}", e);
                return self.stale_roster(e);
            }
        };

        if snapshot.players.is_empty() {
            let e = ScrapeError::EmptyRoster(format!(
                "no rows on {}, check selectors or page load state",
                self.settings.roster_url
            ));
            warn!("{}", e);
            return self.stale_roster(e);
        }

        info!(
            "Finished scraping. Total players scraped: {} (expected {:?}, partial {})",
            snapshot.players.len(),
            snapshot.expected,
            snapshot.partial
        );
        Ok(Fetched::Fresh(self.cache.roster.put((), snapshot)))
    }

    /// Fetch one player's detail record. Never fails: scraping errors yield
    /// a placeholder record with `source = error-fallback`.
    pub async fn fetch_detail(&self, id: &str) -> Fetched<Arc<PlayerDetail>> {
        let key = id.to_string();
        if let Some(entry) = self.cache.details.get(&key) {
            info!("Returning cached data for player ID: {}", id);
            return Fetched::Cached(entry.data);
        }
        info!("Cache miss for player ID: {}, proceeding with scraping", id);

        match self.scrape_detail(id).await {
            Ok(detail) if detail.has_content() => {
                info!("Scraping complete for player ID: {}", id);
                Fetched::Fresh(self.cache.details.put(key, detail))
            }
            Ok(mut detail) => {
                warn!("Nothing extracted for player {}, not caching", id);
                detail.name = Some(placeholder_name(id));
                Fetched::Fresh(Arc::new(detail))
            }
            Err(e) => {
                let e = ScrapeError::DetailFetch {
                    id: key,
                    reason: e.to_string(),
                };
                error!("{}", e);
                let reason = format!("Failed to fetch complete details: {}", e);
                Fetched::Degraded {
                    data: Arc::new(PlayerDetail::fallback(id, reason.clone())),
                    reason,
                }
            }
        }
    }

    /// Close the browser and drop cached results
    pub async fn shutdown(&self) {
        self.provider.release().await;
        self.cache.clear();
    }

    async fn acquire_session(&self) -> ScrapeResult<Arc<dyn Session>> {
        retry(&self.settings.launch_retry, "Browser launch", || {
            self.provider.acquire()
        })
        .await
    }

    async fn scrape_roster(&self, session: &dyn Session) -> ScrapeResult<RosterSnapshot> {
        let page = self
            .navigator
            .load(
                session,
                &self.settings.roster_url,
                ROSTER_TABLE_SELECTOR,
                self.settings.roster_wait,
            )
            .await?;

        let first = RosterParser::parse(&page.html);
        info!("Scraped {} players from page 1", first.players.len());
        if !page.ready && first.players.is_empty() {
            warn!("Roster table never rendered, skipping pagination");
            page.close().await;
            return Ok(RosterSnapshot {
                players: Vec::new(),
                expected: first.marker.map(|m| m.total),
                partial: false,
            });
        }

        let outcome = PaginationDriver::new(page.tab.as_ref(), &self.settings.pagination)
            .run(first)
            .await;
        page.close().await;
        info!(
            "Collected {} pages of {:?} players",
            outcome.pages_collected, outcome.expected
        );

        Ok(RosterSnapshot {
            players: outcome.players,
            expected: outcome.expected,
            partial: outcome.partial,
        })
    }

    async fn scrape_detail(&self, id: &str) -> ScrapeResult<PlayerDetail> {
        let session = self.acquire_session().await?;
        let url = player_url(&self.settings.base_url, id);
        let html = self
            .navigator
            .open(
                session.as_ref(),
                &url,
                STATS_CONTAINER_SELECTOR,
                self.settings.detail_wait,
            )
            .await?;

        Ok(PlayerParser::parse(&html, id, &self.settings.base_url))
    }

    /// Serve the resident roster regardless of age, or give up with `cause`
    fn stale_roster(&self, cause: ScrapeError) -> ScrapeResult<Fetched<Arc<RosterSnapshot>>> {
        match self.cache.roster.get_stale(&()) {
            Some(entry) if !entry.data.players.is_empty() => {
                warn!(
                    "Serving {} stale players cached at {}",
                    entry.data.players.len(),
                    entry.cached_at.to_rfc3339()
                );
                let reason = if cause.is_launch_failure() {
                    "Browser launch failed, using cached data".to_string()
                } else {
                    format!("Scrape failed, using cached data: {}", cause)
                };
                Ok(Fetched::Stale {
                    data: entry.data,
                    reason,
                })
            }
            _ => Err(cause),
        }
    }
}

fn placeholder_name(id: &str) -> String {
    format!("Player {}", id)
}
