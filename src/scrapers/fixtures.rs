//! Season fixture list from `fixtures/`.
//!
//! The payload is an array of fixture objects. Each is cut down to a fixed
//! set of columns; order follows the source.

use super::{array, project};
use crate::error::Result;
use crate::models::{ResultEnvelope, ResultSubType};
use serde_json::Value;

pub const PATH: &str = "fixtures/";

pub const FIXTURES: &str = "fixtures";

pub const KEEP_KEYS: [&str; 10] = [
    "event",
    "finished",
    "id",
    "kickoff_time",
    "team_a",
    "team_h",
    "team_a_difficulty",
    "team_h_difficulty",
    "team_a_score",
    "team_h_score",
];

pub fn parse(raw: &Value) -> Result<ResultEnvelope> {
    let records = array(raw, "fixtures payload")?
        .iter()
        .map(|fixture| project(fixture, &KEEP_KEYS, "fixture"))
        .collect::<Result<Vec<_>>>()?;
    Ok(ResultEnvelope::new("fixtures").with_sub_type(ResultSubType::new(FIXTURES, records)))
}
