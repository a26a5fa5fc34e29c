//! Record type definitions

use chrono::{DateTime, SubsecRound, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One credential entry
///
/// Records are plain values: the builder methods consume `self` and return
/// the changed record, and the vault stores its own copy.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier, assigned by the caller at creation
    pub id: String,

    /// User-friendly name
    pub name: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// The secret itself
    #[serde(default)]
    pub value: String,

    /// Associated URLs, in the order the user entered them
    #[serde(default)]
    pub url: Vec<String>,

    /// Created timestamp (Unix milliseconds on the wire)
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,

    /// Last edit timestamp (Unix milliseconds on the wire)
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Create a new record stamped with the current time
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            value: value.into(),
            url: Vec::new(),
            created_at: Some(now_millis()),
            last_modified_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Replace the URL list
    pub fn with_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.url = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Round timestamps to the millisecond precision they are stored with
    pub(crate) fn normalized(mut self) -> Self {
        self.created_at = self.created_at.map(|t| t.trunc_subsecs(3));
        self.last_modified_at = self.last_modified_at.map(|t| t.trunc_subsecs(3));
        self
    }

    /// Stamp the modification time with the current time
    pub(crate) fn touched(mut self) -> Self {
        self.last_modified_at = Some(now_millis());
        self.normalized()
    }
}

/// Current time at stored precision
pub(crate) fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("value", &"[REDACTED]")
            .field("url", &self.url)
            .field("created_at", &self.created_at)
            .field("last_modified_at", &self.last_modified_at)
            .finish()
    }
}

/// Records keyed by id, the unit of encryption
///
/// Serialized as a single JSON object `{ id: record, ... }`. Iteration follows
/// insertion order; replacing a record keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VaultCollection {
    records: IndexMap<String, Record>,
}

impl VaultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    /// Iterate over records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Insert or replace a record (last write wins)
    pub fn upsert(&mut self, record: Record) -> Option<Record> {
        self.records.insert(record.id.clone(), record)
    }

    /// Remove a record, returning it if it was present
    pub fn remove(&mut self, id: &str) -> Option<Record> {
        self.records.shift_remove(id)
    }

    /// Serialize to the JSON document that gets encrypted
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl FromIterator<Record> for VaultCollection {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        let mut collection = Self::new();
        for record in iter {
            collection.upsert(record);
        }
        collection
    }
}

impl<'a> IntoIterator for &'a VaultCollection {
    type Item = &'a Record;
    type IntoIter = indexmap::map::Values<'a, String, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_minimal_record() {
        let json = r#"{"a":{"id":"a","name":"n","value":"v","url":[]}}"#;
        let collection = VaultCollection::from_json(json).unwrap();

        let record = collection.get("a").unwrap();
        assert_eq!(record.name, "n");
        assert_eq!(record.value, "v");
        assert_eq!(record.description, "");
        assert!(record.url.is_empty());
        assert!(record.created_at.is_none());
        assert!(record.last_modified_at.is_none());
    }

    #[test]
    fn test_timestamps_are_milliseconds() {
        let created = Utc.timestamp_millis_opt(1_600_000_000_123).unwrap();
        let mut record = Record::new("id-1", "GitHub", "hunter2");
        record.created_at = Some(created);

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["createdAt"], 1_600_000_000_123i64);
        assert!(json.get("lastModifiedAt").is_none());
    }

    #[test]
    fn test_builders_return_new_values() {
        let original = Record::new("id-1", "GitHub", "hunter2");
        let edited = original
            .clone()
            .with_description("work account")
            .with_urls(["https://github.com"]);

        assert!(original.url.is_empty());
        assert_eq!(edited.url, vec!["https://github.com".to_string()]);
        assert_eq!(edited.description, "work account");
        assert_eq!(edited.id, original.id);
    }

    #[test]
    fn test_upsert_overwrites_and_keeps_position() {
        let mut collection = VaultCollection::new();
        collection.upsert(Record::new("a", "first", "1"));
        collection.upsert(Record::new("b", "second", "2"));
        collection.upsert(Record::new("a", "replaced", "3"));

        assert_eq!(collection.len(), 2);
        let names: Vec<&str> = collection.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["replaced", "second"]);
    }

    #[test]
    fn test_remove_absent_is_none() {
        let mut collection = VaultCollection::new();
        assert!(collection.remove("missing").is_none());
    }

    #[test]
    fn test_json_roundtrip_preserves_order() {
        let collection: VaultCollection = vec![
            Record::new("z", "zeta", "1").with_urls(["https://z.example"]),
            Record::new("a", "alpha", "2"),
        ]
        .into_iter()
        .collect();

        let json = collection.to_json().unwrap();
        let parsed = VaultCollection::from_json(&json).unwrap();

        assert_eq!(parsed, collection);
        assert!(json.find("\"z\"").unwrap() < json.find("\"a\"").unwrap());
    }

    #[test]
    fn test_normalized_survives_json() {
        let mut record = Record::new("id-1", "GitHub", "hunter2");
        record.created_at = Some(Utc.timestamp_nanos(1_600_000_000_123_456_789));
        let record = record.touched();

        let json = serde_json::to_string(&record).unwrap();
        let parsed: Record = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, record);
        assert_eq!(
            record.created_at,
            Utc.timestamp_millis_opt(1_600_000_000_123).single()
        );
    }

    #[test]
    fn test_debug_redacts_value() {
        let record = Record::new("id-1", "GitHub", "hunter2");
        let debug = format!("{:?}", record);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("hunter2"));
    }
}
