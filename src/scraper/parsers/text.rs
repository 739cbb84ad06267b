//! Text helpers shared by the extractors.

use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

use crate::error::{ScrapeError, ScrapeResult};

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").expect("valid number regex")
});

/// Parse a CSS selector, mapping failure to an extraction error for `section`.
pub fn selector(section: &'static str, css: &str) -> ScrapeResult<Selector> {
    Selector::parse(css)
        .map_err(|e| ScrapeError::extraction(section, format!("bad selector `{}`: {}", css, e)))
}

/// Trimmed text content of an element and its descendants
pub fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed attribute value, `None` when missing or blank
pub fn element_attr(element: &ElementRef, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// "Position: Guard" -> "Guard". Text without a colon is returned trimmed.
pub fn value_after_colon(text: &str) -> String {
    match text.split_once(':') {
        Some((_, value)) => value.trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Parse the leading number of `text`, ignoring trailing units such as `%`.
///
/// Returns `None` when no number is present rather than defaulting to zero.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    LEADING_NUMBER
        .find(trimmed)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Final path segment of a URL, without query string or fragment.
///
/// `.../player/A--Bathuyag/757769` -> `757769`. Returns `None` when the
/// segment is empty.
pub fn last_path_segment(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Prefix site-relative URLs with `base` (scheme and host).
pub fn absolute_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    if let Some(rest) = url.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    let base = base.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{}{}", base, url)
    } else {
        format!("{}/{}", base, url)
    }
}
