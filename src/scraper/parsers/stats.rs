//! Game log and season stats tables on player pages.
//!
//! The site renders every stats table as `table.my_Title` and tells them
//! apart only by the text of their `tr.my_Headers` row.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use super::schema::{LayoutRow, TableLayout, AVERAGE_STATS, GAME_LOG, SUMMARY_STATS};
use super::text::{element_attr, element_text, selector};
use crate::error::ScrapeResult;

/// Container the detail page renders its stats tables into
pub const STATS_CONTAINER_SELECTOR: &str = "div.dvgamesstats";

const GAME_LOG_HEADER: &str = "Details";
const SUMMARY_HEADER: &str = "Summary";
const AVERAGE_HEADER: &str = "AVERAGES";

/// One game from the player's game-by-game table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GameLogEntry {
    pub date: String,
    pub team: String,
    pub opponent: String,
    /// Final score, e.g. "88-85"
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_score_url: Option<String>,
    pub min: String,
    pub pts: String,
    /// Made-attempted, e.g. "1-4"
    pub fgp2: String,
    pub fgp3: String,
    pub ft: String,
    pub reb_off: String,
    pub reb_def: String,
    pub reb_total: String,
    pub ast: String,
    pub pf: String,
    pub blk: String,
    pub stl: String,
    pub to: String,
    pub rank: String,
}

/// Season totals for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStatsRow {
    pub team: String,
    pub games: String,
    pub min: String,
    pub pts: String,
    pub fgp2: String,
    pub fgp3: String,
    pub ft: String,
    pub reb_off: String,
    pub reb_def: String,
    pub reb_total: String,
    pub ast: String,
    pub pf: String,
    pub blk: String,
    pub stl: String,
    pub to: String,
    pub rank: String,
}

/// Per-game averages for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AverageStatsRow {
    pub team: String,
    pub games: String,
    pub min: String,
    pub pts: String,
    pub fgp2_pct: String,
    pub fgp3_pct: String,
    pub ft_pct: String,
    pub reb_off: String,
    pub reb_def: String,
    pub reb_total: String,
    pub ast: String,
    pub pf: String,
    pub blk: String,
    pub stl: String,
    pub to: String,
    pub rank: String,
}

/// Parser for the stats tables of a player page
pub struct StatsParser;

impl StatsParser {
    /// Game-by-game rows; the table may sit outside the stats container
    pub fn game_logs(document: &Html) -> ScrapeResult<Vec<GameLogEntry>> {
        let section = GAME_LOG.name;
        let table_selector = selector(section, "table.my_Title")?;
        let row_selector = selector(section, "tr.my_pStats1, tr.my_pStats2")?;
        let a_selector = selector(section, "a")?;

        let rows = Self::rows_of(
            document,
            &table_selector,
            GAME_LOG_HEADER,
            &row_selector,
            &GAME_LOG,
        )?;
        Ok(rows
            .iter()
            .map(|row| {
                let link = row.cell("result").and_then(|c| c.select(&a_selector).next());
                GameLogEntry {
                    date: row.text("date"),
                    team: row.text("team"),
                    opponent: row.text("opponent"),
                    result: link.map(|a| element_text(&a)).unwrap_or_default(),
                    box_score_url: link.and_then(|a| element_attr(&a, "href")),
                    min: row.text("min"),
                    pts: row.text("pts"),
                    fgp2: row.text("fgp2"),
                    fgp3: row.text("fgp3"),
                    ft: row.text("ft"),
                    reb_off: row.text("rebOff"),
                    reb_def: row.text("rebDef"),
                    reb_total: row.text("rebTotal"),
                    ast: row.text("ast"),
                    pf: row.text("pf"),
                    blk: row.text("blk"),
                    stl: row.text("stl"),
                    to: row.text("to"),
                    rank: row.text("rank"),
                }
            })
            .collect())
    }

    pub fn summary(document: &Html) -> ScrapeResult<Vec<SummaryStatsRow>> {
        let section = SUMMARY_STATS.name;
        let table_selector = selector(section, "div.dvgamesstats table.my_Title")?;
        let row_selector = selector(section, "tr.my_pStats2")?;

        let rows = Self::rows_of(
            document,
            &table_selector,
            SUMMARY_HEADER,
            &row_selector,
            &SUMMARY_STATS,
        )?;
        Ok(rows
            .iter()
            .map(|row| SummaryStatsRow {
                team: row.text("team"),
                games: row.text("games"),
                min: row.text("min"),
                pts: row.text("pts"),
                fgp2: row.text("fgp2"),
                fgp3: row.text("fgp3"),
                ft: row.text("ft"),
                reb_off: row.text("rebOff"),
                reb_def: row.text("rebDef"),
                reb_total: row.text("rebTotal"),
                ast: row.text("ast"),
                pf: row.text("pf"),
                blk: row.text("blk"),
                stl: row.text("stl"),
                to: row.text("to"),
                rank: row.text("rank"),
            })
            .collect())
    }

    pub fn averages(document: &Html) -> ScrapeResult<Vec<AverageStatsRow>> {
        let section = AVERAGE_STATS.name;
        let table_selector = selector(section, "div.dvgamesstats table.my_Title")?;
        let row_selector = selector(section, "tr.my_pStats1")?;

        let rows = Self::rows_of(
            document,
            &table_selector,
            AVERAGE_HEADER,
            &row_selector,
            &AVERAGE_STATS,
        )?;
        Ok(rows
            .iter()
            .map(|row| AverageStatsRow {
                team: row.text("team"),
                games: row.text("games"),
                min: row.text("min"),
                pts: row.text("pts"),
                fgp2_pct: row.text("fgp2Pct"),
                fgp3_pct: row.text("fgp3Pct"),
                ft_pct: row.text("ftPct"),
                reb_off: row.text("rebOff"),
                reb_def: row.text("rebDef"),
                reb_total: row.text("rebTotal"),
                ast: row.text("ast"),
                pf: row.text("pf"),
                blk: row.text("blk"),
                stl: row.text("stl"),
                to: row.text("to"),
                rank: row.text("rank"),
            })
            .collect())
    }

    /// Layout-checked data rows of every table whose header row mentions `header`
    fn rows_of<'a>(
        document: &'a Html,
        table_selector: &Selector,
        header: &str,
        row_selector: &Selector,
        layout: &'static TableLayout,
    ) -> ScrapeResult<Vec<LayoutRow<'a>>> {
        let td_selector = selector(layout.name, "td")?;
        let header_selector = selector(layout.name, "tr.my_Headers td")?;

        let rows = document
            .select(table_selector)
            .filter(|table| Self::has_header(table, &header_selector, header))
            .flat_map(|table| table.select(row_selector))
            .filter_map(|row| LayoutRow::new(layout, row.select(&td_selector).collect()))
            .collect();

        Ok(rows)
    }

    fn has_header(table: &ElementRef, header_selector: &Selector, header: &str) -> bool {
        table
            .select(header_selector)
            .any(|td| td.text().collect::<String>().contains(header))
    }
}
