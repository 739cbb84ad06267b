//! Roster pagination driven through the site's in-page JavaScript hook.
//!
//! The roster page never changes URL: a client-side function re-renders the
//! table in place, and the "Showing A - B of N Players" marker is the only
//! signal that a new page has arrived.

use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::navigator::wait_for_selector;
use super::page::{PaginationTrigger, Tab};
use super::parsers::{
    RosterEntry, RosterPage, RosterParser, ROSTER_TABLE_SELECTOR, SHOWING_MARKER_SELECTOR,
};
use crate::config::ScraperConfig;
use crate::error::{ScrapeError, ScrapeResult};

#[derive(Debug, Clone)]
pub struct PaginationSettings {
    pub page_size: u32,
    pub function: String,
    /// How long to wait for the marker to change after triggering a page
    pub marker_timeout: Duration,
    /// How long to wait for the table after the marker changed
    pub table_timeout: Duration,
    pub poll_interval: Duration,
}

impl PaginationSettings {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            page_size: config.page_size.max(1),
            function: config.pagination_function.clone(),
            marker_timeout: config.pagination_timeout(),
            table_timeout: config.roster_selector_timeout(),
            poll_interval: config.poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    AwaitingFirstPage,
    HasTotal { pages: u32 },
    Advancing { page: u32 },
    PageReady { page: u32 },
    Complete { partial: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationOutcome {
    pub players: Vec<RosterEntry>,
    /// Site-reported total; `None` when the marker could not be read
    pub expected: Option<u32>,
    pub partial: bool,
    pub pages_collected: u32,
}

/// Number of pages for `total` rows
pub fn total_pages(total: u32, page_size: u32) -> u32 {
    total.div_ceil(page_size.max(1))
}

/// Row offset the pagination hook expects for a 1-based page
pub fn page_offset(page: u32, page_size: u32) -> u32 {
    page.saturating_sub(1) * page_size
}

/// Walks pages 2..N of an already loaded roster tab.
///
/// A page that does not arrive, arrives empty, or starts at the wrong row
/// ends the walk with `partial = true`. The failing page is never retried and
/// its rows are never mixed into the result.
pub struct PaginationDriver<'a> {
    tab: &'a dyn Tab,
    settings: &'a PaginationSettings,
    state: PaginationState,
    /// Marker text of the last accepted page
    last_marker: Option<String>,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(tab: &'a dyn Tab, settings: &'a PaginationSettings) -> Self {
        Self {
            tab,
            settings,
            state: PaginationState::AwaitingFirstPage,
            last_marker: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> PaginationState {
        self.state
    }

    fn transition(&mut self, next: PaginationState) {
        debug!("Pagination {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    pub async fn run(&mut self, first_page: RosterPage) -> PaginationOutcome {
        let mut players = first_page.players;
        let mut pages_collected = 1;
        self.last_marker = first_page.marker_text;

        let Some(marker) = first_page.marker else {
            warn!(
                "Could not determine total number of players from {:?}, returning first page only",
                self.last_marker
            );
            self.transition(PaginationState::Complete { partial: false });
            return PaginationOutcome {
                players,
                expected: None,
                partial: false,
                pages_collected,
            };
        };

        let pages = total_pages(marker.total, self.settings.page_size);
        info!("Total players found: {}, pages to scrape: {}", marker.total, pages);
        self.transition(PaginationState::HasTotal { pages });

        let mut partial = false;
        for page in 2..=pages {
            self.transition(PaginationState::Advancing { page });
            match self.advance(page).await {
                Ok(rows) => {
                    pages_collected += 1;
                    players.extend(rows);
                    debug!("Page {} collected, total now {}", page, players.len());
                    self.transition(PaginationState::PageReady { page });
                }
                Err(e) => {
                    warn!("{}. Stopping pagination with {} players", e, players.len());
                    partial = true;
                    break;
                }
            }
        }

        self.transition(PaginationState::Complete { partial });
        PaginationOutcome {
            players,
            expected: Some(marker.total),
            partial,
            pages_collected,
        }
    }

    /// Trigger `page`, wait for it to render and extract its rows
    async fn advance(&mut self, page: u32) -> ScrapeResult<Vec<RosterEntry>> {
        let known = self.last_marker.clone().unwrap_or_default();
        let before = match self.tab.text_of(SHOWING_MARKER_SELECTOR).await {
            Ok(Some(text)) if !text.is_empty() => text,
            Ok(_) => known,
            Err(e) => {
                debug!("Could not read marker before page {}: {}", page, e);
                known
            }
        };

        let offset = page_offset(page, self.settings.page_size);
        debug!("Triggering page {} (offset {}), marker {:?}", page, offset, before);
        let trigger = self
            .tab
            .invoke_pagination(&self.settings.function, offset)
            .await
            .map_err(|e| ScrapeError::PaginationStalled {
                page,
                reason: e.to_string(),
            })?;
        match trigger {
            PaginationTrigger::Function => {}
            PaginationTrigger::LinkClick => {
                warn!(
                    "{} not found on the page, clicked pagination link instead",
                    self.settings.function
                );
            }
            PaginationTrigger::Unavailable => {
                return Err(ScrapeError::PaginationStalled {
                    page,
                    reason: "pagination mechanism not found".to_string(),
                });
            }
        }

        let after = self.wait_for_marker_change(page, &before).await?;
        debug!("Content update detected for page {}: {:?}", page, after);

        if let Err(e) = wait_for_selector(
            self.tab,
            ROSTER_TABLE_SELECTOR,
            self.settings.table_timeout,
            self.settings.poll_interval,
        )
        .await
        {
            warn!("{} on page {}", e, page);
        }

        let html = self
            .tab
            .content()
            .await
            .map_err(|e| ScrapeError::PaginationStalled {
                page,
                reason: e.to_string(),
            })?;
        let parsed = RosterParser::parse(&html);

        // The marker must show this page's first row, not just any change
        let first_row = offset + 1;
        match parsed.marker.and_then(|m| m.first) {
            Some(first) if first == first_row => {}
            shown => {
                return Err(ScrapeError::PaginationStalled {
                    page,
                    reason: format!(
                        "marker shows rows from {:?}, expected {}",
                        shown, first_row
                    ),
                });
            }
        }

        if parsed.players.is_empty() {
            return Err(ScrapeError::PaginationStalled {
                page,
                reason: "no players found after the page changed".to_string(),
            });
        }

        debug!(
            "Scraped {} players from page {} (rows {} to {:?})",
            parsed.players.len(),
            page,
            first_row,
            parsed.marker.and_then(|m| m.last)
        );
        self.last_marker = parsed.marker_text.or(Some(after));
        Ok(parsed.players)
    }

    async fn wait_for_marker_change(&self, page: u32, before: &str) -> ScrapeResult<String> {
        let poll = async {
            loop {
                match self.tab.text_of(SHOWING_MARKER_SELECTOR).await {
                    Ok(Some(text)) if !text.is_empty() && text != before => return text,
                    Ok(_) => {}
                    Err(e) => debug!("Marker probe failed on page {}: {}", page, e),
                }
                sleep(self.settings.poll_interval).await;
            }
        };

        match timeout(self.settings.marker_timeout, poll).await {
            Ok(text) => Ok(text),
            Err(_) => {
                let current = self
                    .tab
                    .text_of(SHOWING_MARKER_SELECTOR)
                    .await
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| "N/A".to_string());
                Err(ScrapeError::PaginationStalled {
                    page,
                    reason: format!(
                        "marker unchanged after {:?} (still {:?})",
                        self.settings.marker_timeout, current
                    ),
                })
            }
        }
    }
}
