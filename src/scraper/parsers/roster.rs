//! Roster table parser for asia-basket.com player listings.

use regex::Regex;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};

use super::schema::{LayoutRow, ROSTER};
use super::text::{element_attr, element_text, last_path_segment, selector};
use crate::error::ScrapeResult;

/// Table that holds roster rows; also the readiness signal for roster pages
pub const ROSTER_TABLE_SELECTOR: &str = "table#players.dataTable, table.authorstable";

/// Cell holding the "Showing 1 - 15 of 42 Players" marker
pub const SHOWING_MARKER_SELECTOR: &str = r#"td[width="34%"]"#;

const ROSTER_ROW_SELECTOR: &str = "table.dataTable#players tbody tr, table.authorstable tbody tr";

static TOTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"of\s+(\d+)\s+Players").expect("valid total regex"));
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Showing\s+(\d+)\s*[-–—]\s*(\d+)").expect("valid range regex")
});

/// One row of the league roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
    pub profile_url: String,
    pub team: String,
    pub league: String,
    pub nationality: String,
    pub age: String,
    pub height: String,
    pub position: String,
}

/// Parsed "Showing A - B of N Players" marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowingMarker {
    pub first: Option<u32>,
    pub last: Option<u32>,
    pub total: u32,
}

/// Everything extracted from one roster page
#[derive(Debug, Clone, Default)]
pub struct RosterPage {
    pub players: Vec<RosterEntry>,
    /// Raw marker text, kept to detect page transitions
    pub marker_text: Option<String>,
    pub marker: Option<ShowingMarker>,
}

/// Parser for roster listing pages
pub struct RosterParser;

impl RosterParser {
    /// Parse players and the pagination marker from a roster page
    pub fn parse(html: &str) -> RosterPage {
        let document = Html::parse_document(html);

        let players = match Self::parse_players(&document) {
            Ok(players) => players,
            Err(e) => {
                warn!("Roster rows could not be extracted: {}", e);
                Vec::new()
            }
        };

        let marker_text = Self::marker_text(&document);
        let marker = marker_text.as_deref().and_then(Self::parse_marker);

        RosterPage {
            players,
            marker_text,
            marker,
        }
    }

    fn parse_players(document: &Html) -> ScrapeResult<Vec<RosterEntry>> {
        let row_selector = selector("roster", ROSTER_ROW_SELECTOR)?;
        let th_selector = selector("roster", "th")?;
        let td_selector = selector("roster", "td")?;
        let a_selector = selector("roster", "a")?;

        let mut players = Vec::new();
        for row in document.select(&row_selector) {
            if row.select(&th_selector).next().is_some() {
                continue;
            }
            let Some(row) = LayoutRow::new(&ROSTER, row.select(&td_selector).collect()) else {
                continue;
            };
            if let Some(player) = Self::parse_row(&row, &a_selector) {
                players.push(player);
            }
        }

        Ok(players)
    }

    fn parse_row(row: &LayoutRow, a_selector: &scraper::Selector) -> Option<RosterEntry> {
        let link: ElementRef = row.cell("name")?.select(a_selector).next()?;
        let name = element_text(&link);
        let profile_url = element_attr(&link, "href")?;
        if name.is_empty() {
            return None;
        }

        let Some(id) = last_path_segment(&profile_url) else {
            debug!("Dropping roster row for {}: no id in {}", name, profile_url);
            return None;
        };

        Some(RosterEntry {
            id,
            name,
            profile_url,
            team: row.text("team"),
            league: row.text("league"),
            nationality: row.text("nationality"),
            age: row.text("age"),
            height: row.text("height"),
            position: row.text("position"),
        })
    }

    fn marker_text(document: &Html) -> Option<String> {
        let marker_selector = selector("roster marker", SHOWING_MARKER_SELECTOR).ok()?;
        document
            .select(&marker_selector)
            .next()
            .map(|el| element_text(&el))
    }

    /// Parse marker text; `None` when the total cannot be read
    pub fn parse_marker(text: &str) -> Option<ShowingMarker> {
        let total = TOTAL_RE.captures(text)?[1].parse().ok()?;
        let (first, last) = match RANGE_RE.captures(text) {
            Some(caps) => (caps[1].parse().ok(), caps[2].parse().ok()),
            None => (None, None),
        };

        Some(ShowingMarker { first, last, total })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a roster page the way asia-basket.com lays it out.
    pub(crate) fn roster_html(first: u32, total: u32, rows: &[(&str, &str)]) -> String {
        let last = first + rows.len() as u32 - 1;
        let body: String = rows
            .iter()
            .map(|(id, name)| {
                format!(
                    r#"<tr><td><a href="https://www.asia-basket.com/player/{name}/{id}">{name}</a></td>
                    <td>Khasyn Khuleguud</td><td>Mongolia - MNBL</td><td>Mongolia</td>
                    <td>24</td><td>198</td><td>F</td></tr>"#,
                    id = id,
                    name = name
                )
            })
            .collect();
        format!(
            r#"<html><body>
            <table><tr><td width="34%">Showing {first} - {last} of {total} Players</td></tr></table>
            <table id="players" class="dataTable">
              <thead><tr><th>Name</th><th>Team</th><th>League</th><th>Nat</th><th>Age</th><th>Height</th><th>Pos</th></tr></thead>
              <tbody>{body}</tbody>
            </table></body></html>"#,
        )
    }

    #[test]
    fn test_parse_roster_page() {
        let html = roster_html(1, 42, &[("757769", "A--Bathuyag"), ("757770", "B--Dorj")]);
        let page = RosterParser::parse(&html);

        assert_eq!(page.players.len(), 2);
        let first = &page.players[0];
        assert_eq!(first.id, "757769");
        assert_eq!(first.name, "A--Bathuyag");
        assert_eq!(
            first.profile_url,
            "https://www.asia-basket.com/player/A--Bathuyag/757769"
        );
        assert_eq!(first.team, "Khasyn Khuleguud");
        assert_eq!(first.league, "Mongolia - MNBL");
        assert_eq!(first.nationality, "Mongolia");
        assert_eq!(first.age, "24");
        assert_eq!(first.height, "198");
        assert_eq!(first.position, "F");

        assert_eq!(
            page.marker,
            Some(ShowingMarker {
                first: Some(1),
                last: Some(2),
                total: 42
            })
        );
        assert_eq!(page.marker_text.as_deref(), Some("Showing 1 - 2 of 42 Players"));
    }

    #[test]
    fn test_short_and_unlinked_rows_are_dropped() {
        let html = r#"<html><body>
        <table class="authorstable"><tbody>
          <tr><td><a href="/player/Short/1">Short</a></td><td>Team</td></tr>
          <tr><td>No link</td><td>T</td><td>L</td><td>N</td><td>20</td><td>190</td><td>G</td></tr>
          <tr><td><a href="/player/Trailing/">Trailing</a></td><td>T</td><td>L</td><td>N</td><td>20</td><td>190</td><td>G</td></tr>
          <tr><td><a href="/player/Good/55">Good</a></td><td>T</td><td>L</td><td>N</td><td>20</td><td>190</td><td>G</td></tr>
        </tbody></table></body></html>"#;

        let page = RosterParser::parse(html);
        assert_eq!(page.players.len(), 1);
        assert_eq!(page.players[0].id, "55");
        assert!(page.marker.is_none());
    }

    #[test]
    fn test_ids_are_non_empty_and_from_final_segment() {
        let html = roster_html(16, 42, &[("100", "X"), ("200", "Y"), ("300", "Z")]);
        let page = RosterParser::parse(&html);

        for player in &page.players {
            assert!(!player.id.is_empty());
            assert!(player.profile_url.ends_with(&format!("/{}", player.id)));
        }
    }

    #[test]
    fn test_parse_marker_variants() {
        assert_eq!(
            RosterParser::parse_marker("Showing 1–15 of 42 Players").map(|m| m.total),
            Some(42)
        );
        assert_eq!(
            RosterParser::parse_marker("Showing 31 - 42 of 42 Players"),
            Some(ShowingMarker {
                first: Some(31),
                last: Some(42),
                total: 42
            })
        );
        assert_eq!(
            RosterParser::parse_marker("of 7 Players").map(|m| (m.first, m.total)),
            Some((None, 7))
        );
        assert!(RosterParser::parse_marker("No players found").is_none());
    }

    #[test]
    fn test_empty_document() {
        let page = RosterParser::parse("<html></html>");
        assert!(page.players.is_empty());
        assert!(page.marker_text.is_none());
    }
}
