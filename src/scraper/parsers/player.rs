//! Player profile parser for asia-basket.com detail pages.
//!
//! Each section is extracted independently. A section that fails is logged
//! and left out of the record; the others are still attempted.

use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};

use super::advanced::{AdvancedStats, AdvancedStatsParser};
use super::schema::{LayoutRow, CAREER_HISTORY};
use super::stats::{AverageStatsRow, GameLogEntry, StatsParser, SummaryStatsRow};
use super::text::{absolute_url, element_attr, element_text, selector, value_after_colon};
use crate::error::ScrapeResult;

const NAME_SELECTOR: &str = "h1.player-title.pltitlebigger";
const IMAGE_SELECTOR: &str = "img.plfacejpg";
const INFO_BOX_SELECTOR: &str = "div.player-left div.player-details";
const POSITION_SELECTOR: &str = ".pld_pos";
const HEIGHT_SELECTOR: &str = ".pld_height";
const AGE_SELECTOR: &str = ".pld_born";
const NATIONALITY_SELECTOR: &str = ".pld_nationality";
const BIO_SELECTOR: &str = "div.player-left div.player-bio";
const CAREER_ROW_SELECTOR: &str = "table.career-history tbody tr, table.team-history tbody tr";

static PROFILE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*basketball profile").expect("valid suffix regex"));

/// One season in the player's career
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CareerEntry {
    pub year: String,
    pub team: String,
    pub league: String,
}

/// Full player record. Every section is optional; absent sections are
/// omitted from JSON instead of being emitted empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDetail {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub career_history: Option<Vec<CareerEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_logs: Option<Vec<GameLogEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_stats: Option<Vec<SummaryStatsRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_stats: Option<Vec<AverageStatsRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced_stats: Option<AdvancedStats>,
    /// Set only on degraded records built after a failed fetch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlayerDetail {
    /// Minimal record returned when scraping the player page failed
    pub fn fallback(id: &str, error: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            name: Some(format!("Player {}", id)),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Whether anything beyond the identifier was extracted
    pub fn has_content(&self) -> bool {
        self.name.is_some()
            || self.position.is_some()
            || self.height.is_some()
            || self.age.is_some()
            || self.nationality.is_some()
            || self.image_url.is_some()
            || self.bio.is_some()
            || self.career_history.is_some()
            || self.game_logs.is_some()
            || self.summary_stats.is_some()
            || self.average_stats.is_some()
            || self.advanced_stats.is_some()
    }

    /// Names of the populated fields, for logging
    pub fn populated_fields(&self) -> Vec<&'static str> {
        let flags = [
            ("name", self.name.is_some()),
            ("position", self.position.is_some()),
            ("height", self.height.is_some()),
            ("age", self.age.is_some()),
            ("nationality", self.nationality.is_some()),
            ("imageUrl", self.image_url.is_some()),
            ("bio", self.bio.is_some()),
            ("careerHistory", self.career_history.is_some()),
            ("gameLogs", self.game_logs.is_some()),
            ("summaryStats", self.summary_stats.is_some()),
            ("averageStats", self.average_stats.is_some()),
            ("advancedStats", self.advanced_stats.is_some()),
        ];
        std::iter::once("id")
            .chain(flags.into_iter().filter(|(_, set)| *set).map(|(n, _)| n))
            .collect()
    }
}

/// Header fields from the profile box
#[derive(Debug, Default)]
struct BasicInfo {
    name: Option<String>,
    image_url: Option<String>,
    position: Option<String>,
    height: Option<String>,
    age: Option<String>,
    nationality: Option<String>,
    bio: Option<String>,
}

/// Parser for player detail pages
pub struct PlayerParser;

impl PlayerParser {
    /// Parse a player page. `base_url` makes relative image URLs absolute.
    pub fn parse(html: &str, player_id: &str, base_url: &str) -> PlayerDetail {
        let document = Html::parse_document(html);
        debug!("Starting comprehensive scrape for player {}", player_id);

        let basic = section("basic info", Self::parse_basic_info(&document, base_url))
            .unwrap_or_default();

        let detail = PlayerDetail {
            id: player_id.to_string(),
            name: basic.name,
            position: basic.position,
            height: basic.height,
            age: basic.age,
            nationality: basic.nationality,
            image_url: basic.image_url,
            bio: basic.bio,
            career_history: section("career history", Self::parse_career_history(&document))
                .and_then(non_empty),
            game_logs: section("game logs", StatsParser::game_logs(&document)).and_then(non_empty),
            summary_stats: section("summary stats", StatsParser::summary(&document))
                .and_then(non_empty),
            average_stats: section("average stats", StatsParser::averages(&document))
                .and_then(non_empty),
            advanced_stats: section("advanced stats", AdvancedStatsParser::parse(&document))
                .flatten(),
            error: None,
        };

        debug!(
            "Completed scraping for player {}, found data fields: {}",
            player_id,
            detail.populated_fields().join(", ")
        );
        detail
    }

    fn parse_basic_info(document: &Html, base_url: &str) -> ScrapeResult<BasicInfo> {
        let mut info = BasicInfo::default();

        let name_selector = selector("basic info", NAME_SELECTOR)?;
        if let Some(element) = document.select(&name_selector).next() {
            let raw = element_text(&element);
            let cleaned = PROFILE_SUFFIX_RE.replace(&raw, "").trim().to_string();
            if !cleaned.is_empty() {
                info.name = Some(cleaned);
            }
        }

        let image_selector = selector("basic info", IMAGE_SELECTOR)?;
        info.image_url = document
            .select(&image_selector)
            .next()
            .and_then(|img| element_attr(&img, "src"))
            .map(|src| absolute_url(base_url, &src));

        let info_box_selector = selector("basic info", INFO_BOX_SELECTOR)?;
        if let Some(info_box) = document.select(&info_box_selector).next() {
            let labelled = |css: &str| -> ScrapeResult<Option<String>> {
                let field_selector = selector("basic info", css)?;
                Ok(info_box
                    .select(&field_selector)
                    .next()
                    .map(|el| value_after_colon(&element_text(&el))))
            };
            info.position = labelled(POSITION_SELECTOR)?;
            info.height = labelled(HEIGHT_SELECTOR)?;
            info.age = labelled(AGE_SELECTOR)?;
            info.nationality = labelled(NATIONALITY_SELECTOR)?;
        }

        let bio_selector = selector("basic info", BIO_SELECTOR)?;
        info.bio = document
            .select(&bio_selector)
            .next()
            .map(|el| element_text(&el))
            .filter(|text| !text.is_empty());

        Ok(info)
    }

    fn parse_career_history(document: &Html) -> ScrapeResult<Vec<CareerEntry>> {
        let row_selector = selector("career history", CAREER_ROW_SELECTOR)?;
        let td_selector = selector("career history", "td")?;

        Ok(document
            .select(&row_selector)
            .filter_map(|row| LayoutRow::new(&CAREER_HISTORY, row.select(&td_selector).collect()))
            .map(|row| CareerEntry {
                year: row.text("year"),
                team: row.text("team"),
                league: row.text("league"),
            })
            .filter(|entry| !entry.year.is_empty() && !entry.team.is_empty())
            .collect())
    }
}

/// Contain a section failure: log it and omit the section.
fn section<T>(name: &str, result: ScrapeResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Error scraping {}: {}", name, e);
            None
        }
    }
}

fn non_empty<T>(rows: Vec<T>) -> Option<Vec<T>> {
    if rows.is_empty() {
        None
    } else {
        Some(rows)
    }
}
