//! Tab setup, navigation and DOM readiness waits.

use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::browser::Session;
use super::page::Tab;
use crate::config::ScraperConfig;
use crate::error::{ScrapeError, ScrapeResult};

#[derive(Debug, Clone)]
pub struct NavigatorSettings {
    pub user_agent: String,
    pub navigation_timeout: Duration,
    pub poll_interval: Duration,
}

impl NavigatorSettings {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            navigation_timeout: config.navigation_timeout(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// A navigated tab and the DOM captured after the readiness wait.
///
/// The tab stays open so the caller can keep driving it; call
/// [`LoadedPage::close`] when done.
pub struct LoadedPage {
    pub tab: Box<dyn Tab>,
    pub html: String,
    /// Whether the wait selector appeared before its timeout
    pub ready: bool,
}

impl LoadedPage {
    pub async fn close(self) {
        self.tab.close().await;
    }
}

pub struct Navigator {
    settings: NavigatorSettings,
}

impl Navigator {
    pub fn new(settings: NavigatorSettings) -> Self {
        Self { settings }
    }

    /// Open `url` in a fresh tab and wait up to `wait` for `wait_selector`.
    ///
    /// Navigation and selector timeouts are tolerated: the DOM present at
    /// that point is returned. The tab is closed on every error path.
    pub async fn load(
        &self,
        session: &dyn Session,
        url: &str,
        wait_selector: &str,
        wait: Duration,
    ) -> ScrapeResult<LoadedPage> {
        let tab = session.open_tab().await?;
        let captured = self
            .prepare_and_capture(tab.as_ref(), url, wait_selector, wait)
            .await;
        match captured {
            Ok((html, ready)) => Ok(LoadedPage { tab, html, ready }),
            Err(e) => {
                tab.close().await;
                Err(e)
            }
        }
    }

    /// Like [`Navigator::load`] but only the DOM is kept; the tab is closed
    /// before returning.
    pub async fn open(
        &self,
        session: &dyn Session,
        url: &str,
        wait_selector: &str,
        wait: Duration,
    ) -> ScrapeResult<String> {
        let LoadedPage { tab, html, .. } = self.load(session, url, wait_selector, wait).await?;
        tab.close().await;
        Ok(html)
    }

    async fn prepare_and_capture(
        &self,
        tab: &dyn Tab,
        url: &str,
        wait_selector: &str,
        wait: Duration,
    ) -> ScrapeResult<(String, bool)> {
        if let Err(e) = tab.set_user_agent(&self.settings.user_agent).await {
            warn!("Could not set user agent: {}", e);
        }
        if let Err(e) = tab.block_non_essential_resources().await {
            warn!("Resource blocking unavailable, loading full page: {}", e);
        }

        info!("Navigating to {}", url);
        let navigated = timeout(self.settings.navigation_timeout, tab.navigate(url))
            .await
            .unwrap_or_else(|_| {
                Err(ScrapeError::NavigationTimeout {
                    url: url.to_string(),
                    timeout: self.settings.navigation_timeout,
                })
            });
        match navigated {
            Ok(()) => {}
            Err(e @ ScrapeError::NavigationTimeout { .. }) => {
                warn!("{}, proceeding with available DOM", e);
            }
            Err(e) => return Err(e),
        }

        let ready =
            match wait_for_selector(tab, wait_selector, wait, self.settings.poll_interval).await {
                Ok(()) => {
                    debug!("Found `{}` on {}", wait_selector, url);
                    true
                }
                Err(e) => {
                    warn!("{}, proceeding with available data", e);
                    false
                }
            };

        let html = tab.content().await?;
        Ok((html, ready))
    }
}

/// Poll until `selector` matches or `wait` elapses
pub async fn wait_for_selector(
    tab: &dyn Tab,
    selector: &str,
    wait: Duration,
    poll_interval: Duration,
) -> ScrapeResult<()> {
    let poll = async {
        loop {
            match tab.exists(selector).await {
                Ok(true) => return,
                Ok(false) => {}
                Err(e) => debug!("Selector probe for `{}` failed: {}", selector, e),
            }
            sleep(poll_interval).await;
        }
    };

    timeout(wait, poll)
        .await
        .map_err(|_| ScrapeError::SelectorWaitTimeout {
            selector: selector.to_string(),
            timeout: wait,
        })
}
