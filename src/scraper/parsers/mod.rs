//! HTML parsers for asia-basket.com pages.

pub mod advanced;
pub mod player;
pub mod roster;
pub mod schema;
pub mod stats;
pub mod text;

pub use player::{PlayerDetail, PlayerParser};
pub use roster::{
    RosterEntry, RosterPage, RosterParser, ROSTER_TABLE_SELECTOR, SHOWING_MARKER_SELECTOR,
};
pub use stats::STATS_CONTAINER_SELECTOR;
