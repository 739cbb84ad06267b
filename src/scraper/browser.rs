//! Shared headless browser, launched once and reused across requests.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as ChromeBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::CloseParams;
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::page::{ChromeTab, Tab};
use crate::config::ScraperConfig;
use crate::error::{ScrapeError, ScrapeResult};

/// A running browser that can open tabs
#[async_trait]
pub trait Session: Send + Sync {
    async fn open_tab(&self) -> ScrapeResult<Box<dyn Tab>>;

    /// False once the browser process has gone away
    fn is_connected(&self) -> bool;

    async fn shutdown(&self);
}

/// Starts a browser process
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    async fn launch(&self) -> ScrapeResult<Arc<dyn Session>>;
}

/// Hands out the shared browser session
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn acquire(&self) -> ScrapeResult<Arc<dyn Session>>;

    /// Close the browser; only used at shutdown
    async fn release(&self);
}

type LaunchFuture = Shared<BoxFuture<'static, ScrapeResult<Arc<dyn Session>>>>;

enum Slot {
    Idle,
    Launching { generation: u64, launch: LaunchFuture },
    Ready(Arc<dyn Session>),
}

/// Lazily launched, single-flight browser handle.
///
/// Concurrent `acquire` calls while a launch is in flight all await that one
/// launch and observe its outcome. A disconnected browser is dropped and the
/// next `acquire` launches a fresh one. Launch failures are not retried here.
pub struct BrowserManager<L: Launcher> {
    launcher: Arc<L>,
    slot: Mutex<Slot>,
    generation: AtomicU64,
}

impl<L: Launcher> BrowserManager<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher: Arc::new(launcher),
            slot: Mutex::new(Slot::Idle),
            generation: AtomicU64::new(0),
        }
    }

    /// Existing session, or the in-flight launch to wait on
    fn current_or_launch(&self) -> Result<Arc<dyn Session>, (u64, LaunchFuture)> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        match &*slot {
            Slot::Ready(session) if session.is_connected() => return Ok(Arc::clone(session)),
            Slot::Ready(_) => {
                info!("Browser disconnected, will create new instance on this request");
            }
            Slot::Launching { generation, launch } => return Err((*generation, launch.clone())),
            Slot::Idle => {}
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let launcher = Arc::clone(&self.launcher);
        let launch = async move { launcher.launch().await }.boxed().shared();
        *slot = Slot::Launching {
            generation,
            launch: launch.clone(),
        };
        debug!("Starting browser launch #{}", generation);
        Err((generation, launch))
    }

    fn settle(&self, generation: u64, result: &ScrapeResult<Arc<dyn Session>>) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        let owns_slot = matches!(&*slot, Slot::Launching { generation: g, .. } if *g == generation);
        if owns_slot {
            *slot = match result {
                Ok(session) => Slot::Ready(Arc::clone(session)),
                Err(_) => Slot::Idle,
            };
        }
    }
}

#[async_trait]
impl<L: Launcher> SessionProvider for BrowserManager<L> {
    async fn acquire(&self) -> ScrapeResult<Arc<dyn Session>> {
        let (generation, launch) = match self.current_or_launch() {
            Ok(session) => return Ok(session),
            Err(pending) => pending,
        };

        let result = launch.await;
        self.settle(generation, &result);
        if let Err(e) = &result {
            error!("Failed to launch browser: {}", e);
        }
        result
    }

    async fn release(&self) {
        let previous = {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *slot, Slot::Idle)
        };

        let session = match previous {
            Slot::Ready(session) => Some(session),
            Slot::Launching { launch, .. } => launch.await.ok(),
            Slot::Idle => None,
        };
        if let Some(session) = session {
            info!("Closing browser");
            session.shutdown().await;
        }
    }
}

/// Headroom between the navigation bound and the CDP request timeout, so
/// the navigator's own timeout fires first
const REQUEST_TIMEOUT_HEADROOM: Duration = Duration::from_secs(15);

/// Launches headless Chrome via chromiumoxide
pub struct ChromeLauncher {
    chrome_executable: Option<String>,
    request_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            chrome_executable: config.chrome_executable.clone(),
            request_timeout: config.navigation_timeout() + REQUEST_TIMEOUT_HEADROOM,
        }
    }
}

#[async_trait]
impl Launcher for ChromeLauncher {
    async fn launch(&self) -> ScrapeResult<Arc<dyn Session>> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .arg("--headless=new")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--mute-audio")
            .window_size(1920, 1080)
            .request_timeout(self.request_timeout);
        if let Some(path) = &self.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| ScrapeError::BrowserLaunch(format!("invalid browser config: {}", e)))?;

        let (browser, mut handler) = ChromeBrowser::launch(config)
            .await
            .map_err(|e| ScrapeError::BrowserLaunch(e.to_string()))?;

        let connected = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&connected);
        // Handler must keep running for the browser to work; it ends on disconnect
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {}", e);
                }
            }
            flag.store(false, Ordering::SeqCst);
            warn!("Browser disconnected, will create new instance on next request");
        });

        info!("Headless browser launched");
        Ok(Arc::new(ChromeSession {
            browser,
            handler: handler_task,
            connected,
            request_timeout: self.request_timeout,
        }))
    }
}

/// A live Chrome process
pub struct ChromeSession {
    browser: ChromeBrowser,
    handler: JoinHandle<()>,
    connected: Arc<AtomicBool>,
    request_timeout: Duration,
}

#[async_trait]
impl Session for ChromeSession {
    async fn open_tab(&self) -> ScrapeResult<Box<dyn Tab>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Session(format!("failed to create new page: {}", e)))?;
        Ok(Box::new(ChromeTab::new(page, self.request_timeout)))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.handler.is_finished()
    }

    async fn shutdown(&self) {
        if let Err(e) = self.browser.execute(CloseParams::default()).await {
            debug!("Browser close error: {}", e);
        }
        self.connected.store(false, Ordering::SeqCst);
        self.handler.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    struct StubSession {
        connected: AtomicBool,
        shutdowns: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Session for StubSession {
        async fn open_tab(&self) -> ScrapeResult<Box<dyn Tab>> {
            Err(ScrapeError::Session("stub has no tabs".to_string()))
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct StubLauncher {
        launches: Arc<AtomicU32>,
        shutdowns: Arc<AtomicU32>,
        fail: Arc<AtomicBool>,
        last: Arc<Mutex<Option<Arc<StubSession>>>>,
    }

    impl StubLauncher {
        fn new() -> Self {
            Self {
                launches: Arc::new(AtomicU32::new(0)),
                shutdowns: Arc::new(AtomicU32::new(0)),
                fail: Arc::new(AtomicBool::new(false)),
                last: Arc::new(Mutex::new(None)),
            }
        }
    }

    #[async_trait]
    impl Launcher for StubLauncher {
        async fn launch(&self) -> ScrapeResult<Arc<dyn Session>> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(ScrapeError::BrowserLaunch("no chrome".to_string()));
            }
            let session = Arc::new(StubSession {
                connected: AtomicBool::new(true),
                shutdowns: Arc::clone(&self.shutdowns),
            });
            *self.last.lock().unwrap() = Some(Arc::clone(&session));
            Ok(session)
        }
    }

    #[tokio::test]
    async fn test_concurrent_acquire_launches_once() {
        let launcher = StubLauncher::new();
        let launches = Arc::clone(&launcher.launches);
        let manager = Arc::new(BrowserManager::new(launcher));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&manager);
                tokio::spawn(async move { m.acquire().await })
            })
            .collect();

        let mut sessions = Vec::new();
        for handle in handles {
            sessions.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(launches.load(Ordering::SeqCst), 1);
        assert!(sessions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));

        // Established handle is reused
        let again = manager.acquire().await.unwrap();
        assert!(Arc::ptr_eq(&again, &sessions[0]));
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_launch_failure() {
        let launcher = StubLauncher::new();
        launcher.fail.store(true, Ordering::SeqCst);
        let launches = Arc::clone(&launcher.launches);
        let fail = Arc::clone(&launcher.fail);
        let manager = Arc::new(BrowserManager::new(launcher));

        let (a, b) = tokio::join!(manager.acquire(), manager.acquire());
        assert!(a.err().is_some_and(|e| e.is_launch_failure()));
        assert!(b.err().is_some_and(|e| e.is_launch_failure()));
        assert_eq!(launches.load(Ordering::SeqCst), 1);

        // A failed launch is not remembered; the next caller tries again
        fail.store(false, Ordering::SeqCst);
        assert!(manager.acquire().await.is_ok());
        assert_eq!(launches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disconnect_triggers_relaunch() {
        let launcher = StubLauncher::new();
        let launches = Arc::clone(&launcher.launches);
        let last = Arc::clone(&launcher.last);
        let manager = BrowserManager::new(launcher);

        let first = manager.acquire().await.unwrap();
        last.lock()
            .unwrap()
            .as_ref()
            .unwrap()
            .connected
            .store(false, Ordering::SeqCst);

        let second = manager.acquire().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(launches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_release_shuts_down_browser() {
        let launcher = StubLauncher::new();
        let launches = Arc::clone(&launcher.launches);
        let shutdowns = Arc::clone(&launcher.shutdowns);
        let manager = BrowserManager::new(launcher);

        manager.release().await;
        assert_eq!(shutdowns.load(Ordering::SeqCst), 0);

        manager.acquire().await.unwrap();
        manager.release().await;
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);

        manager.acquire().await.unwrap();
        assert_eq!(launches.load(Ordering::SeqCst), 2);
    }
}
