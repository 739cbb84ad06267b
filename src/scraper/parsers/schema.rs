//! Column layouts of the source site's tables.
//!
//! Column order is a contract with asia-basket.com. Extractors check a row
//! against its layout before indexing and drop rows that are too short.

use scraper::ElementRef;

use super::text::element_text;

/// Expected positional layout of one table
#[derive(Debug, Clone, Copy)]
pub struct TableLayout {
    pub name: &'static str,
    /// Bumped whenever the site's column order changes
    pub version: u32,
    pub columns: &'static [&'static str],
    /// Minimum cell count for a row to be usable
    pub required: usize,
}

impl TableLayout {
    pub fn accepts(&self, cell_count: usize) -> bool {
        cell_count >= self.required
    }

    /// Position of a named column
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }
}

/// A table row whose cell count has been checked against its layout
pub struct LayoutRow<'a> {
    layout: &'static TableLayout,
    cells: Vec<ElementRef<'a>>,
}

impl<'a> LayoutRow<'a> {
    /// `None` when the row is shorter than the layout requires
    pub fn new(layout: &'static TableLayout, cells: Vec<ElementRef<'a>>) -> Option<Self> {
        if layout.accepts(cells.len()) {
            Some(Self { layout, cells })
        } else {
            None
        }
    }

    pub fn cell(&self, column: &str) -> Option<ElementRef<'a>> {
        self.layout
            .position(column)
            .and_then(|i| self.cells.get(i))
            .copied()
    }

    /// Trimmed text of a named column, empty when the cell is missing
    pub fn text(&self, column: &str) -> String {
        self.cell(column)
            .map(|c| element_text(&c))
            .unwrap_or_default()
    }
}

pub const ROSTER: TableLayout = TableLayout {
    name: "roster",
    version: 1,
    columns: &[
        "name",
        "team",
        "league",
        "nationality",
        "age",
        "height",
        "position",
    ],
    required: 7,
};

/// League is optional on career rows
pub const CAREER_HISTORY: TableLayout = TableLayout {
    name: "career history",
    version: 1,
    columns: &["year", "team", "league"],
    required: 2,
};

/// `result` holds the box-score link
pub const GAME_LOG: TableLayout = TableLayout {
    name: "game log",
    version: 1,
    columns: &[
        "date", "team", "opponent", "result", "min", "pts", "fgp2", "fgp3", "ft", "rebOff",
        "rebDef", "rebTotal", "ast", "pf", "blk", "stl", "to", "rank",
    ],
    required: 18,
};

pub const SUMMARY_STATS: TableLayout = TableLayout {
    name: "summary stats",
    version: 1,
    columns: &[
        "team", "games", "min", "pts", "fgp2", "fgp3", "ft", "rebOff", "rebDef", "rebTotal",
        "ast", "pf", "blk", "stl", "to", "rank",
    ],
    required: 16,
};

pub const AVERAGE_STATS: TableLayout = TableLayout {
    name: "average stats",
    version: 1,
    columns: &[
        "team", "games", "min", "pts", "fgp2Pct", "fgp3Pct", "ftPct", "rebOff", "rebDef",
        "rebTotal", "ast", "pf", "blk", "stl", "to", "rank",
    ],
    required: 16,
};

/// Eight categories, each a (player, team, percentage) triple
#[rustfmt::skip]
pub const ADVANCED_STATS: TableLayout = TableLayout {
    name: "advanced stats",
    version: 1,
    columns: &[
        "pts", "pts_team", "pts_pct",
        "fg2m", "fg2m_team", "fg2m_pct",
        "fg2a", "fg2a_team", "fg2a_pct",
        "fg3m", "fg3m_team", "fg3m_pct",
        "fg3a", "fg3a_team", "fg3a_pct",
        "ftm", "ftm_team", "ftm_pct",
        "fta", "fta_team", "fta_pct",
        "ast", "ast_team", "ast_pct",
    ],
    required: 24,
};
