//! Advanced stats: the player's share of team production.

use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::schema::{LayoutRow, ADVANCED_STATS};
use super::text::{parse_number, selector};
use crate::error::ScrapeResult;

const ADVANCED_TABLE_SELECTOR: &str = r#"table[id^="offbox"]"#;
const ADVANCED_ROW_SELECTOR: &str = "tr.my_pStats1, tr.adstatscolor";

/// Player value, team value and the player's share.
///
/// A cell that does not hold a number is left `None` rather than zeroed, so
/// "not reported" stays distinguishable from a real zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct StatShare {
    #[serde(rename = "value")]
    pub player_value: Option<f64>,
    #[serde(rename = "team")]
    pub team_value: Option<f64>,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MadeAttempted {
    pub made: StatShare,
    pub attempted: StatShare,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct AdvancedStats {
    pub points: StatShare,
    #[serde(rename = "twoPointFG")]
    pub two_point_fg: MadeAttempted,
    #[serde(rename = "threePointFG")]
    pub three_point_fg: MadeAttempted,
    #[serde(rename = "freeThrows")]
    pub free_throws: MadeAttempted,
    pub assists: StatShare,
}

/// Parser for the `offbox` advanced stats table
pub struct AdvancedStatsParser;

impl AdvancedStatsParser {
    /// `Ok(None)` when the table or its data row is missing or too short
    pub fn parse(document: &Html) -> ScrapeResult<Option<AdvancedStats>> {
        let section = ADVANCED_STATS.name;
        let table_selector = selector(section, ADVANCED_TABLE_SELECTOR)?;
        let row_selector = selector(section, ADVANCED_ROW_SELECTOR)?;
        let td_selector = selector(section, "td")?;

        let Some(table) = document.select(&table_selector).next() else {
            return Ok(None);
        };
        let Some(data_row) = table.select(&row_selector).next() else {
            return Ok(None);
        };

        let cells: Vec<_> = data_row.select(&td_selector).collect();
        let cell_count = cells.len();
        let Some(row) = LayoutRow::new(&ADVANCED_STATS, cells) else {
            warn!(
                "Advanced stats table found but has only {} cells, expected {}+ (layout v{})",
                cell_count, ADVANCED_STATS.required, ADVANCED_STATS.version
            );
            return Ok(None);
        };

        let share = |prefix: &str| StatShare {
            player_value: parse_number(&row.text(prefix)),
            team_value: parse_number(&row.text(&format!("{}_team", prefix))),
            percentage: parse_number(&row.text(&format!("{}_pct", prefix))),
        };

        Ok(Some(AdvancedStats {
            points: share("pts"),
            two_point_fg: MadeAttempted {
                made: share("fg2m"),
                attempted: share("fg2a"),
            },
            three_point_fg: MadeAttempted {
                made: share("fg3m"),
                attempted: share("fg3a"),
            },
            free_throws: MadeAttempted {
                made: share("ftm"),
                attempted: share("fta"),
            },
            assists: share("ast"),
        }))
    }
}
