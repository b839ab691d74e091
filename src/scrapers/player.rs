//! Per-match history for one player from `element-summary/{id}/`.
//!
//! `history` is already one flat record per match and is kept verbatim.

use super::{array, field, object};
use crate::error::Result;
use crate::models::{ResultEnvelope, ResultSubType};
use serde_json::Value;

pub const PLAYER_STATS: &str = "player_stats";

pub fn path(id: u32) -> String {
    format!("element-summary/{id}/")
}

pub fn parse(raw: &Value) -> Result<ResultEnvelope> {
    let history = array(field(raw, "history", "element-summary payload")?, "history")?
        .iter()
        .map(|row| object(row, "history entry").cloned())
        .collect::<Result<Vec<_>>>()?;
    Ok(ResultEnvelope::new("player").with_sub_type(ResultSubType::new(PLAYER_STATS, history)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use serde_json::json;

    #[test]
    fn test_history_is_kept_verbatim() {
        let raw = json!({
            "fixtures": [ { "id": 99 } ],
            "history": [
                { "element": 1, "fixture": 1, "total_points": 2, "was_home": false, "round": 1 },
                { "element": 1, "fixture": 12, "total_points": 9, "was_home": true, "round": 2 }
            ],
            "history_past": []
        });
        let envelope = parse(&raw).unwrap();
        assert_eq!(envelope.scraper_type(), "player");

        let rows = &envelope.sub_type(PLAYER_STATS).unwrap().records;
        assert_eq!(rows.len(), 2);
        assert_eq!(Value::Object(rows[1].clone()), raw["history"][1]);
    }

    #[test]
    fn test_new_player_has_empty_history() {
        let envelope = parse(&json!({ "history": [] })).unwrap();
        assert!(envelope.sub_type(PLAYER_STATS).unwrap().is_empty());
    }

    #[test]
    fn test_missing_history_is_schema_error() {
        let err = parse(&json!({ "fixtures": [] })).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingKey { ref key, .. } if key == "history"));
    }
}
