//! Live gameweek stats from `event/{gw}/live/`.
//!
//! Each player entry becomes one record: `id`, every field of its `stats`
//! block, and `fixture_id` from the first `explain` entry.

use super::{array, field, object};
use crate::error::{Result, ScrapeError};
use crate::models::{Record, ResultEnvelope, ResultSubType};
use serde_json::Value;

pub const GW_STATS: &str = "gw_stats";

pub fn path(gameweek: u32) -> String {
    format!("event/{gameweek}/live/")
}

pub fn parse(raw: &Value) -> Result<ResultEnvelope> {
    let mut stats = Vec::new();
    for player in array(field(raw, "elements", "live payload")?, "elements")? {
        let mut row = Record::new();
        row.insert("id".to_string(), field(player, "id", "live element")?.clone());
        for (k, v) in object(field(player, "stats", "live element")?, "stats")? {
            row.insert(k.clone(), v.clone());
        }
        let first = array(field(player, "explain", "live element")?, "explain")?
            .first()
            .ok_or_else(|| ScrapeError::missing_key("explain[0]", "live element"))?;
        row.insert(
            "fixture_id".to_string(),
            field(first, "fixture", "explain entry")?.clone(),
        );
        stats.push(row);
    }
    Ok(ResultEnvelope::new("gameweek").with_sub_type(ResultSubType::new(GW_STATS, stats)))
}
