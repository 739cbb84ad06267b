//! Browser tab abstraction and its chromiumoxide implementation.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
    RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, ResourceType, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{EventDomContentEventFired, NavigateParams};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{ScrapeError, ScrapeResult};

/// How the in-page pagination hook was driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationTrigger {
    /// The named function was called directly
    Function,
    /// Fallback: a link whose `onclick` references the function was clicked
    LinkClick,
    /// Neither the function nor a matching link exists
    Unavailable,
}

/// One browser tab.
///
/// Implementations must release the tab when dropped without `close`.
#[async_trait]
pub trait Tab: Send + Sync {
    async fn set_user_agent(&self, user_agent: &str) -> ScrapeResult<()>;

    /// Abort every request that is not a document, script, XHR or fetch
    async fn block_non_essential_resources(&self) -> ScrapeResult<()>;

    /// Navigate and wait for DOMContentLoaded; subresources may still load
    async fn navigate(&self, url: &str) -> ScrapeResult<()>;

    async fn exists(&self, selector: &str) -> ScrapeResult<bool>;

    /// Trimmed text of the first match, `None` when nothing matches
    async fn text_of(&self, selector: &str) -> ScrapeResult<Option<String>>;

    async fn invoke_pagination(&self, function: &str, offset: u32)
        -> ScrapeResult<PaginationTrigger>;

    /// Serialized DOM as it is right now
    async fn content(&self) -> ScrapeResult<String>;

    async fn close(self: Box<Self>);
}

/// Resource types a scrape actually needs
fn is_essential(resource_type: &ResourceType) -> bool {
    matches!(
        resource_type,
        ResourceType::Document | ResourceType::Script | ResourceType::Xhr | ResourceType::Fetch
    )
}

#[derive(Deserialize)]
struct TextProbe {
    found: bool,
    text: String,
}

/// Map a CDP failure during navigation. A CDP request timeout is reported
/// as a navigation timeout so callers can keep the partially loaded DOM.
fn navigation_error(url: &str, error: CdpError, request_timeout: Duration) -> ScrapeError {
    match error {
        CdpError::Timeout => ScrapeError::NavigationTimeout {
            url: url.to_string(),
            timeout: request_timeout,
        },
        other => ScrapeError::Navigation {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}

/// A chromiumoxide page
pub struct ChromeTab {
    page: Option<Page>,
    interceptor: Mutex<Option<JoinHandle<()>>>,
    /// CDP request timeout the browser was launched with
    request_timeout: Duration,
}

impl ChromeTab {
    pub fn new(page: Page, request_timeout: Duration) -> Self {
        Self {
            page: Some(page),
            interceptor: Mutex::new(None),
            request_timeout,
        }
    }

    fn page(&self) -> ScrapeResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| ScrapeError::Session("tab already closed".to_string()))
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> ScrapeResult<T> {
        let result = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| ScrapeError::Script(e.to_string()))?;
        result
            .into_value::<T>()
            .map_err(|e| ScrapeError::Script(format!("unexpected script result: {}", e)))
    }

    fn stop_interceptor(&self) {
        let handle = self
            .interceptor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl Tab for ChromeTab {
    async fn set_user_agent(&self, user_agent: &str) -> ScrapeResult<()> {
        self.page()?
            .set_user_agent(SetUserAgentOverrideParams::new(user_agent))
            .await
            .map_err(|e| ScrapeError::Session(format!("failed to set user agent: {}", e)))?;
        Ok(())
    }

    async fn block_non_essential_resources(&self) -> ScrapeResult<()> {
        let page = self.page()?.clone();

        let mut paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| ScrapeError::Session(format!("failed to listen for requests: {}", e)))?;

        page.execute(EnableParams {
            patterns: Some(vec![RequestPattern {
                url_pattern: Some("*".to_string()),
                resource_type: None,
                request_stage: Some(RequestStage::Request),
            }]),
            handle_auth_requests: None,
        })
        .await
        .map_err(|e| ScrapeError::Session(format!("failed to enable interception: {}", e)))?;

        let handle = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let request_id = event.request_id.clone();
                let reply = if is_essential(&event.resource_type) {
                    page.execute(ContinueRequestParams::new(request_id))
                        .await
                        .map(|_| ())
                } else {
                    page.execute(FailRequestParams::new(request_id, ErrorReason::BlockedByClient))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = reply {
                    debug!("Intercepted request could not be answered: {}", e);
                }
            }
        });

        let previous = self
            .interceptor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        Ok(())
    }

    async fn navigate(&self, url: &str) -> ScrapeResult<()> {
        let page = self.page()?;

        // Subscribe first so the event cannot fire before we listen
        let mut dom_ready = page
            .event_listener::<EventDomContentEventFired>()
            .await
            .map_err(|e| navigation_error(url, e, self.request_timeout))?;

        let response = page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| navigation_error(url, e, self.request_timeout))?;
        if let Some(reason) = response.result.error_text.clone() {
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                reason,
            });
        }

        match dom_ready.next().await {
            Some(_) => Ok(()),
            None => Err(ScrapeError::Navigation {
                url: url.to_string(),
                reason: "tab closed before DOMContentLoaded".to_string(),
            }),
        }
    }

    async fn exists(&self, selector: &str) -> ScrapeResult<bool> {
        self.eval(format!(
            "document.querySelector({}) !== null",
            js_string(selector)
        ))
        .await
    }

    async fn text_of(&self, selector: &str) -> ScrapeResult<Option<String>> {
        let probe: TextProbe = self
            .eval(format!(
                r#"(() => {{
                    const el = document.querySelector({});
                    return {{ found: el !== null, text: el ? (el.textContent || '').trim() : '' }};
                }})()"#,
                js_string(selector)
            ))
            .await?;
        Ok(probe.found.then_some(probe.text))
    }

    async fn invoke_pagination(
        &self,
        function: &str,
        offset: u32,
    ) -> ScrapeResult<PaginationTrigger> {
        let name = js_string(function);
        let outcome: String = self
            .eval(format!(
                r#"(() => {{
                    const name = {name};
                    if (typeof window[name] === 'function') {{
                        window[name]({offset});
                        return 'function';
                    }}
                    const link = document.querySelector('a[onclick*="' + name + '"]');
                    if (link) {{
                        link.click();
                        return 'click';
                    }}
                    return 'missing';
                }})()"#,
            ))
            .await?;

        Ok(match outcome.as_str() {
            "function" => PaginationTrigger::Function,
            "click" => PaginationTrigger::LinkClick,
            _ => PaginationTrigger::Unavailable,
        })
    }

    async fn content(&self) -> ScrapeResult<String> {
        self.page()?
            .content()
            .await
            .map_err(|e| ScrapeError::Session(format!("failed to get page content: {}", e)))
    }

    async fn close(self: Box<Self>) {
        let mut tab = self;
        tab.stop_interceptor();
        if let Some(page) = tab.page.take() {
            if let Err(e) = page.close().await {
                debug!("Page close error: {}", e);
            }
        }
    }
}

impl Drop for ChromeTab {
    fn drop(&mut self) {
        self.stop_interceptor();
        if let Some(page) = self.page.take() {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    let _ = page.close().await;
                });
            }
        }
    }
}
