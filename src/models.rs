//! The uniform result schema every extractor produces, and the store results
//! are merged into.
//!
//! ```text
//! AggregateStore
//! └── scraper_type ("general", "fixtures", "gameweek", "player")
//!     └── sub_type ("team_map", "fixtures", "gw_stats", ...)
//!         └── [record, record, ...]
//! ```
//!
//! A record is a flat JSON object. Records are never deduplicated: merging the
//! same envelope twice stores its records twice.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One flat row: column name to JSON value.
pub type Record = Map<String, Value>;

/// A named table inside one envelope.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ResultSubType {
    pub sub_type: String,
    /// Empty when the source had nothing for this table; never absent.
    #[serde(default)]
    pub records: Vec<Record>,
}

impl ResultSubType {
    pub fn new(sub_type: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            sub_type: sub_type.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Output of one successful extractor run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    scraper_type: String,
    sub_types: BTreeMap<String, ResultSubType>,
}

impl ResultEnvelope {
    pub fn new(scraper_type: impl Into<String>) -> Self {
        Self {
            scraper_type: scraper_type.into(),
            sub_types: BTreeMap::new(),
        }
    }

    /// Add a table, keyed by its own sub-type name.
    pub fn with_sub_type(mut self, sub_type: ResultSubType) -> Self {
        self.sub_types.insert(sub_type.sub_type.clone(), sub_type);
        self
    }

    pub fn scraper_type(&self) -> &str {
        &self.scraper_type
    }

    #[cfg(test)]
    pub fn sub_type(&self, name: &str) -> Option<&ResultSubType> {
        self.sub_types.get(name)
    }

    pub fn sub_types(&self) -> impl Iterator<Item = &ResultSubType> {
        self.sub_types.values()
    }

    pub fn record_count(&self) -> usize {
        self.sub_types.values().map(ResultSubType::len).sum()
    }
}

/// Everything scraped in one session, keyed by `(scraper_type, sub_type)`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AggregateStore {
    tables: BTreeMap<String, BTreeMap<String, Vec<Record>>>,
}

impl AggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every table of `envelope` onto the matching table in the store,
    /// creating it if needed. Order is preserved; nothing is deduplicated.
    pub fn merge(&mut self, envelope: ResultEnvelope) {
        let tables = self.tables.entry(envelope.scraper_type).or_default();
        for (name, sub_type) in envelope.sub_types {
            tables.entry(name).or_default().extend(sub_type.records);
        }
    }

    pub fn records(&self, scraper_type: &str, sub_type: &str) -> Option<&[Record]> {
        self.tables
            .get(scraper_type)
            .and_then(|t| t.get(sub_type))
            .map(Vec::as_slice)
    }

    pub fn scraper_types(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn sub_types(&self, scraper_type: &str) -> impl Iterator<Item = &str> {
        self.tables
            .get(scraper_type)
            .into_iter()
            .flat_map(|t| t.keys().map(String::as_str))
    }

    pub fn record_count(&self) -> usize {
        self.tables
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    #[cfg(test)]
    pub fn clear(&mut self) {
        self.tables.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    fn fixtures_envelope(ids: &[u64]) -> ResultEnvelope {
        let records = ids.iter().map(|id| record(json!({ "id": id }))).collect();
        ResultEnvelope::new("fixtures").with_sub_type(ResultSubType::new("fixtures", records))
    }

    #[test]
    fn test_merge_concatenates_in_call_order() {
        let mut store = AggregateStore::new();
        store.merge(fixtures_envelope(&[1, 2, 3]));
        store.merge(fixtures_envelope(&[4, 5]));

        let rows = store.records("fixtures", "fixtures").unwrap();
        assert_eq!(rows.len(), 5);
        let ids: Vec<u64> = rows.iter().map(|r| r["id"].as_u64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_merge_does_not_dedupe() {
        let mut store = AggregateStore::new();
        store.merge(fixtures_envelope(&[1]));
        store.merge(fixtures_envelope(&[1]));
        assert_eq!(store.records("fixtures", "fixtures").unwrap().len(), 2);
    }

    #[test]
    fn test_merge_keeps_sub_types_apart() {
        let envelope = ResultEnvelope::new("general")
            .with_sub_type(ResultSubType::new("team_map", vec![record(json!({"1": {}}))]))
            .with_sub_type(ResultSubType::new("gw_deadlines", vec![]));
        assert_eq!(envelope.record_count(), 1);

        let mut store = AggregateStore::new();
        store.merge(envelope);
        assert_eq!(store.records("general", "team_map").unwrap().len(), 1);
        assert_eq!(store.records("general", "gw_deadlines").unwrap().len(), 0);
        assert!(store.records("general", "element_map").is_none());
        assert_eq!(
            store.sub_types("general").collect::<Vec<_>>(),
            vec!["gw_deadlines", "team_map"]
        );
    }

    #[test]
    fn test_store_serializes_as_nested_map() {
        let mut store = AggregateStore::new();
        store.merge(fixtures_envelope(&[7]));
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json, json!({ "fixtures": { "fixtures": [ { "id": 7 } ] } }));
    }

    #[test]
    fn test_clear() {
        let mut store = AggregateStore::new();
        store.merge(fixtures_envelope(&[1]));
        assert!(!store.is_empty());
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.record_count(), 0);
    }

    #[test]
    fn test_sub_type_records_default_to_empty() {
        let sub: ResultSubType = serde_json::from_str(r#"{"sub_type":"fixtures"}"#).unwrap();
        assert!(sub.is_empty());
    }
}
