//! Configuration for the hoops API.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Scraper configuration: target site, browser identity and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_roster_path")]
    pub roster_path: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Rows per roster page, fixed by the site
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_roster_selector_timeout_secs")]
    pub roster_selector_timeout_secs: u64,
    #[serde(default = "default_detail_selector_timeout_secs")]
    pub detail_selector_timeout_secs: u64,
    #[serde(default = "default_pagination_timeout_secs")]
    pub pagination_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Name of the in-page JavaScript function that swaps roster pages
    #[serde(default = "default_pagination_function")]
    pub pagination_function: String,
    /// Chrome binary override; autodetected when unset
    #[serde(default)]
    pub chrome_executable: Option<String>,
}

fn default_base_url() -> String {
    crate::scraper::BASE_URL.to_string()
}

fn default_roster_path() -> String {
    "/Mongolia/basketball-Players.aspx".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}

fn default_page_size() -> u32 {
    15
}

fn default_navigation_timeout_secs() -> u64 {
    30
}

fn default_roster_selector_timeout_secs() -> u64 {
    15
}

fn default_detail_selector_timeout_secs() -> u64 {
    20
}

fn default_pagination_timeout_secs() -> u64 {
    20
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_pagination_function() -> String {
    "xSUBMITPage".to_string()
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            roster_path: default_roster_path(),
            user_agent: default_user_agent(),
            page_size: default_page_size(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            roster_selector_timeout_secs: default_roster_selector_timeout_secs(),
            detail_selector_timeout_secs: default_detail_selector_timeout_secs(),
            pagination_timeout_secs: default_pagination_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            pagination_function: default_pagination_function(),
            chrome_executable: None,
        }
    }
}

impl ScraperConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn roster_selector_timeout(&self) -> Duration {
        Duration::from_secs(self.roster_selector_timeout_secs)
    }

    pub fn detail_selector_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_selector_timeout_secs)
    }

    pub fn pagination_timeout(&self) -> Duration {
        Duration::from_secs(self.pagination_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn roster_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.roster_path)
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_roster_ttl_secs")]
    pub roster_ttl_secs: u64,
    #[serde(default = "default_detail_ttl_secs")]
    pub detail_ttl_secs: u64,
}

fn default_roster_ttl_secs() -> u64 {
    60 * 60
}

fn default_detail_ttl_secs() -> u64 {
    6 * 60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            roster_ttl_secs: default_roster_ttl_secs(),
            detail_ttl_secs: default_detail_ttl_secs(),
        }
    }
}

/// Retry policy for browser session acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts, including the first
    #[serde(default = "default_launch_attempts")]
    pub launch_attempts: u32,
    #[serde(default = "default_launch_delay_ms")]
    pub launch_delay_ms: u64,
}

fn default_launch_attempts() -> u32 {
    3
}

fn default_launch_delay_ms() -> u64 {
    1000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            launch_attempts: default_launch_attempts(),
            launch_delay_ms: default_launch_delay_ms(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (HOOPS_SERVER__PORT, etc.)
            .add_source(
                config::Environment::with_prefix("HOOPS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
