//! Scripted browser fakes for driving the scraping core without Chrome.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::browser::{Session, SessionProvider};
use super::page::{PaginationTrigger, Tab};
use crate::error::{ScrapeError, ScrapeResult};

/// How navigation to a document behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Navigation {
    Ok,
    Fail,
    Hang,
    /// The browser reports a timeout after the DOM has arrived
    TimedOut,
}

/// A site document: `pages[0]` loads on navigation, `pages[k]` is swapped in
/// when the pagination hook is called with offset `k * page_size`.
#[derive(Debug, Clone)]
pub(crate) struct FakeDocument {
    pub pages: Vec<String>,
    pub page_size: u32,
    /// Index of the page whose transition never happens
    pub stall_at: Option<usize>,
    pub trigger: PaginationTrigger,
    pub navigation: Navigation,
    /// Number of leading `text_of` calls that fail
    pub failing_marker_reads: u32,
}

impl FakeDocument {
    pub fn single(html: impl Into<String>) -> Self {
        Self::paged(vec![html.into()])
    }

    pub fn paged(pages: Vec<String>) -> Self {
        Self {
            pages,
            page_size: 15,
            stall_at: None,
            trigger: PaginationTrigger::Function,
            navigation: Navigation::Ok,
            failing_marker_reads: 0,
        }
    }

    pub fn stalling_at(mut self, page_index: usize) -> Self {
        self.stall_at = Some(page_index);
        self
    }

    pub fn with_trigger(mut self, trigger: PaginationTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_navigation(mut self, navigation: Navigation) -> Self {
        self.navigation = navigation;
        self
    }

    pub fn with_failing_marker_reads(mut self, count: u32) -> Self {
        self.failing_marker_reads = count;
        self
    }
}

/// Counters shared by every tab a fake session opens
#[derive(Debug, Default)]
pub(crate) struct TabLog {
    pub opened: AtomicU32,
    pub closed: AtomicU32,
    pub navigations: Mutex<Vec<String>>,
    pub pagination_calls: Mutex<Vec<u32>>,
}

impl TabLog {
    pub fn opened(&self) -> u32 {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> u32 {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn navigations_to(&self, url: &str) -> usize {
        self.navigations
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

/// URL to document map standing in for the target site
#[derive(Debug, Default)]
pub(crate) struct FakeSite {
    documents: Mutex<HashMap<String, FakeDocument>>,
    pub log: TabLog,
}

impl FakeSite {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, document: FakeDocument) {
        self.documents
            .lock()
            .unwrap()
            .insert(url.to_string(), document);
    }

    pub fn tab(self: &Arc<Self>) -> FakeTab {
        self.log.opened.fetch_add(1, Ordering::SeqCst);
        FakeTab {
            site: Arc::clone(self),
            current: Mutex::new(None),
            text_reads: AtomicU32::new(0),
        }
    }
}

struct Loaded {
    document: FakeDocument,
    page: usize,
}

pub(crate) struct FakeTab {
    site: Arc<FakeSite>,
    current: Mutex<Option<Loaded>>,
    text_reads: AtomicU32,
}

impl FakeTab {
    fn html(&self) -> String {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(|loaded| loaded.document.pages[loaded.page].clone())
            .unwrap_or_else(|| "<html><head></head><body></body></html>".to_string())
    }
}

fn first_match_text(html: &str, css: &str) -> ScrapeResult<Option<String>> {
    let selector = Selector::parse(css)
        .map_err(|e| ScrapeError::Script(format!("bad selector {}: {:?}", css, e)))?;
    let document = Html::parse_document(html);
    let text = document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string());
    Ok(text)
}

#[async_trait]
impl Tab for FakeTab {
    async fn set_user_agent(&self, _user_agent: &str) -> ScrapeResult<()> {
        Ok(())
    }

    async fn block_non_essential_resources(&self) -> ScrapeResult<()> {
        Ok(())
    }

    async fn navigate(&self, url: &str) -> ScrapeResult<()> {
        self.site.log.navigations.lock().unwrap().push(url.to_string());
        let document = self.site.documents.lock().unwrap().get(url).cloned();
        let Some(document) = document else {
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        };

        match document.navigation {
            Navigation::Ok => {}
            Navigation::Fail => {
                return Err(ScrapeError::Navigation {
                    url: url.to_string(),
                    reason: "net::ERR_CONNECTION_RESET".to_string(),
                })
            }
            Navigation::Hang => {
                // DOM is there, the load event never fires
                *self.current.lock().unwrap() = Some(Loaded {
                    document: document.clone(),
                    page: 0,
                });
                std::future::pending::<()>().await;
            }
            Navigation::TimedOut => {
                *self.current.lock().unwrap() = Some(Loaded {
                    document: document.clone(),
                    page: 0,
                });
                return Err(ScrapeError::NavigationTimeout {
                    url: url.to_string(),
                    timeout: std::time::Duration::from_secs(45),
                });
            }
        }

        *self.current.lock().unwrap() = Some(Loaded { document, page: 0 });
        Ok(())
    }

    async fn exists(&self, selector: &str) -> ScrapeResult<bool> {
        Ok(first_match_text(&self.html(), selector)?.is_some())
    }

    async fn text_of(&self, selector: &str) -> ScrapeResult<Option<String>> {
        let failing = self
            .current
            .lock()
            .unwrap()
            .as_ref()
            .map_or(0, |loaded| loaded.document.failing_marker_reads);
        if self.text_reads.fetch_add(1, Ordering::SeqCst) < failing {
            return Err(ScrapeError::Script("execution context destroyed".to_string()));
        }
        first_match_text(&self.html(), selector)
    }

    async fn invoke_pagination(
        &self,
        _function: &str,
        offset: u32,
    ) -> ScrapeResult<PaginationTrigger> {
        self.site.log.pagination_calls.lock().unwrap().push(offset);
        let mut current = self.current.lock().unwrap();
        let Some(loaded) = current.as_mut() else {
            return Ok(PaginationTrigger::Unavailable);
        };
        if loaded.document.trigger == PaginationTrigger::Unavailable {
            return Ok(PaginationTrigger::Unavailable);
        }

        let target = (offset / loaded.document.page_size) as usize;
        if loaded.document.stall_at != Some(target) && target < loaded.document.pages.len() {
            loaded.page = target;
        }
        Ok(loaded.document.trigger)
    }

    async fn content(&self) -> ScrapeResult<String> {
        Ok(self.html())
    }

    async fn close(self: Box<Self>) {
        self.site.log.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct FakeSession {
    site: Arc<FakeSite>,
}

#[async_trait]
impl Session for FakeSession {
    async fn open_tab(&self) -> ScrapeResult<Box<dyn Tab>> {
        Ok(Box::new(self.site.tab()))
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn shutdown(&self) {}
}

/// Session provider whose launches can be made to fail
pub(crate) struct FakeProvider {
    session: Arc<FakeSession>,
    pub fail_launch: AtomicBool,
    pub acquires: AtomicU32,
    pub released: AtomicBool,
}

impl FakeProvider {
    pub fn new(site: &Arc<FakeSite>) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::new(FakeSession {
                site: Arc::clone(site),
            }),
            fail_launch: AtomicBool::new(false),
            acquires: AtomicU32::new(0),
            released: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_launch.store(failing, Ordering::SeqCst);
    }

    pub fn acquires(&self) -> u32 {
        self.acquires.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    async fn acquire(&self) -> ScrapeResult<Arc<dyn Session>> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(ScrapeError::BrowserLaunch(
                "Failed to launch the browser process".to_string(),
            ));
        }
        Ok(Arc::clone(&self.session) as Arc<dyn Session>)
    }

    async fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
