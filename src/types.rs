//! Response types for the Hoops API.

use serde::Serialize;

use crate::scraper::parsers::{PlayerDetail, RosterEntry};
use crate::scraper::{Fetched, RosterSnapshot, Source};

/// Roster response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterResponse {
    pub players: Vec<RosterEntry>,
    pub partial: bool,
    /// Site-reported total; null when the marker was unreadable
    pub expected: Option<u32>,
    pub source: Source,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub total_unknown: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_error: Option<String>,
}

impl<S: AsRef<RosterSnapshot>> From<&Fetched<S>> for RosterResponse {
    fn from(fetched: &Fetched<S>) -> Self {
        let snapshot = fetched.data().as_ref();
        let stale = matches!(fetched, Fetched::Stale { .. });
        Self {
            players: snapshot.players.clone(),
            partial: snapshot.partial || stale,
            expected: snapshot.expected,
            source: fetched.source(),
            total_unknown: !snapshot.total_known(),
            browser_error: fetched.failure().map(str::to_string),
        }
    }
}

/// Player detail response: the record plus its source
#[derive(Debug, Clone, Serialize)]
pub struct PlayerResponse {
    #[serde(flatten)]
    pub detail: PlayerDetail,
    pub source: Source,
}

impl<D: AsRef<PlayerDetail>> From<&Fetched<D>> for PlayerResponse {
    fn from(fetched: &Fetched<D>) -> Self {
        Self {
            detail: fetched.data().as_ref().clone(),
            source: fetched.source(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn snapshot(expected: Option<u32>, partial: bool) -> Arc<RosterSnapshot> {
        Arc::new(RosterSnapshot {
            players: vec![RosterEntry {
                id: "757769".to_string(),
                name: "A--Bathuyag".to_string(),
                ..Default::default()
            }],
            expected,
            partial,
        })
    }

    #[test]
    fn test_roster_response_shape() {
        let fetched = Fetched::Fresh(snapshot(Some(42), false));
        let json = serde_json::to_value(RosterResponse::from(&fetched)).unwrap();

        assert_eq!(json["source"], "scrape");
        assert_eq!(json["expected"], 42);
        assert_eq!(json["partial"], false);
        assert_eq!(json["players"][0]["id"], "757769");
        assert!(json.get("totalUnknown").is_none());
        assert!(json.get("browserError").is_none());
    }

    #[test]
    fn test_stale_roster_is_partial_with_error() {
        let fetched = Fetched::Stale {
            data: snapshot(Some(42), false),
            reason: "Browser launch failed, using cached data".to_string(),
        };
        let json = serde_json::to_value(RosterResponse::from(&fetched)).unwrap();

        assert_eq!(json["source"], "cache");
        assert_eq!(json["partial"], true);
        assert_eq!(
            json["browserError"],
            "Browser launch failed, using cached data"
        );
    }

    #[test]
    fn test_unknown_total() {
        let fetched = Fetched::Cached(snapshot(None, false));
        let json = serde_json::to_value(RosterResponse::from(&fetched)).unwrap();

        assert!(json["expected"].is_null());
        assert_eq!(json["totalUnknown"], true);
    }

    #[test]
    fn test_player_response_flattens_detail() {
        let fetched = Fetched::Degraded {
            data: Arc::new(PlayerDetail::fallback("9423", "Failed to fetch complete details")),
            reason: "Failed to fetch complete details".to_string(),
        };
        let json = serde_json::to_value(PlayerResponse::from(&fetched)).unwrap();

        assert_eq!(json["id"], "9423");
        assert_eq!(json["name"], "Player 9423");
        assert_eq!(json["source"], "error-fallback");
        assert_eq!(json["error"], "Failed to fetch complete details");
        assert!(json.get("gameLogs").is_none());
    }
}
