//! General info from `bootstrap-static/`.
//!
//! One payload, three unrelated tables:
//!
//! - `team_map`: team id → name and strength ratings
//! - `gw_deadlines`: gameweek id → deadline timestamp
//! - `element_map`: player id → name fields, team and position
//!
//! Each table is a single record keyed by id, so `team_map.records[0]` holds
//! one entry per team.

use super::{array, field, id_key, project};
use crate::error::Result;
use crate::models::{Record, ResultEnvelope, ResultSubType};
use serde_json::Value;

pub const PATH: &str = "bootstrap-static/";

pub const TEAM_MAP: &str = "team_map";
pub const GW_DEADLINES: &str = "gw_deadlines";
pub const ELEMENT_MAP: &str = "element_map";

const TEAM_FIELDS: &[&str] = &[
    "name",
    "strength",
    "strength_overall_home",
    "strength_overall_away",
    "strength_attack_home",
    "strength_attack_away",
    "strength_defence_home",
    "strength_defence_away",
];

pub fn parse(raw: &Value) -> Result<ResultEnvelope> {
    Ok(ResultEnvelope::new("general")
        .with_sub_type(team_map(raw)?)
        .with_sub_type(gw_deadlines(raw)?)
        .with_sub_type(element_map(raw)?))
}

pub fn team_map(raw: &Value) -> Result<ResultSubType> {
    let mut map = Record::new();
    for team in array(field(raw, "teams", "bootstrap-static")?, "teams")? {
        let id = id_key(field(team, "id", "team")?, "team id")?;
        let info = project(team, TEAM_FIELDS, "team")?;
        map.insert(id, Value::Object(info));
    }
    Ok(ResultSubType::new(TEAM_MAP, vec![map]))
}

pub fn gw_deadlines(raw: &Value) -> Result<ResultSubType> {
    let mut map = Record::new();
    for event in array(field(raw, "events", "bootstrap-static")?, "events")? {
        let id = id_key(field(event, "id", "event")?, "event id")?;
        let deadline = field(event, "deadline_time", "event")?.clone();
        map.insert(id, deadline);
    }
    Ok(ResultSubType::new(GW_DEADLINES, vec![map]))
}

pub fn element_map(raw: &Value) -> Result<ResultSubType> {
    let mut map = Record::new();
    for el in array(field(raw, "elements", "bootstrap-static")?, "elements")? {
        let id = field(el, "id", "element")?;
        let mut info = Record::new();
        info.insert("id".to_string(), id.clone());
        for key in ["web_name", "first_name", "second_name"] {
            info.insert(key.to_string(), field(el, key, "element")?.clone());
        }
        info.insert("team_id".to_string(), field(el, "team", "element")?.clone());
        info.insert(
            "element_type".to_string(),
            field(el, "element_type", "element")?.clone(),
        );
        map.insert(id_key(id, "element id")?, Value::Object(info));
    }
    Ok(ResultSubType::new(ELEMENT_MAP, vec![map]))
}
