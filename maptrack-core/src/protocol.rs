//! Wire shapes for the overlay bridge
//!
//! The overlay UI asks for analytics over a JSON message channel. These
//! types pin the request/response shapes so both sides agree on field
//! names; the transport itself lives in the host process.

use serde::{Deserialize, Serialize};

use crate::analytics::{DashboardData, LibraryRow, RankedMap};
use crate::types::TimeRange;

/// A request for range-scoped analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsRequest {
    #[serde(default)]
    pub range: TimeRange,
}

/// Ranked per-map rows for one reporting window.
#[derive(Debug, Clone, Serialize)]
pub struct TopMapsResponse {
    pub range: TimeRange,
    pub maps: Vec<RankedMap>,
}

/// The full dashboard payload for one reporting window.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    pub range: TimeRange,
    pub data: DashboardData,
}

/// The all-time library listing.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryResponse {
    pub rows: Vec<LibraryRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_range_parses_from_wire_token() {
        let req: StatsRequest = serde_json::from_str(r#"{"range":"7d"}"#).unwrap();
        assert_eq!(req.range, TimeRange::Last7Days);
    }

    #[test]
    fn test_request_range_defaults_when_absent() {
        let req: StatsRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.range, TimeRange::Last7Days);
    }

    #[test]
    fn test_response_serializes_range_token() {
        let resp = TopMapsResponse {
            range: TimeRange::Today,
            maps: Vec::new(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""range":"today""#));
    }
}
