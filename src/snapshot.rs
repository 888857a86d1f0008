//! Snapshot wire format (`all.min.json` equivalent).
//!
//! The snapshot is the single consolidated document the builder emits and the
//! loader/worker consume: `{ meta, entries }`. Its shape is the stable wire
//! contract between builds, caches, and clients, so field names here must not
//! change without a `specVersion` bump.

use crate::descriptor::PackageDescriptor;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Self-describing snapshot meta block.
///
/// `generated_at` doubles as the cache-freshness token: two snapshots are
/// "the same" iff their `generatedAt` strings are equal. Ties are treated as
/// not newer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotMeta {
    pub registry_id: String,
    pub spec_version: String,
    /// ISO-8601 build timestamp.
    pub generated_at: String,
    pub source_repo: String,
    pub index_format: String,
    pub entry_count: usize,
}

/// One consolidated registry snapshot.
///
/// Invariant: `meta.entry_count == entries.len()` and `entries` is sorted
/// ascending by lowercase `namespace/name`. The builder establishes both; the
/// lenient ingest path re-derives the count after filtering invalid entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    pub entries: Vec<PackageDescriptor>,
}

impl Snapshot {
    /// Assembles a snapshot, fixing up `entry_count` to match `entries`.
    pub fn new(mut meta: SnapshotMeta, entries: Vec<PackageDescriptor>) -> Self {
        meta.entry_count = entries.len();
        Self { meta, entries }
    }

    /// Lenient ingest of a raw JSON document.
    ///
    /// Missing or junk-shaped `meta`/`entries` degrade to defaults, and
    /// entries without a valid identity are dropped. Never fails; an empty
    /// snapshot is the worst case.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let mut meta: SnapshotMeta = obj
            .get("meta")
            .cloned()
            .and_then(|meta| serde_json::from_value(meta).ok())
            .unwrap_or_default();

        let entries: Vec<PackageDescriptor> = obj
            .get("entries")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(PackageDescriptor::from_value).collect())
            .unwrap_or_default();

        // Declared count may disagree after filtering; the entries are truth.
        meta.entry_count = entries.len();

        Self { meta, entries }
    }

    /// The freshness token, empty when the snapshot carries no meta.
    pub fn version(&self) -> &str {
        &self.meta.generated_at
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use serde_json::json;

    #[test]
    fn round_trips_meta_field_names() {
        let meta = SnapshotMeta {
            registry_id: "package-registry".to_string(),
            spec_version: "1.0.0".to_string(),
            generated_at: "2026-01-01T00:00:00.000Z".to_string(),
            source_repo: "https://example.com/registry".to_string(),
            index_format: "json-per-package".to_string(),
            entry_count: 0,
        };

        let json = serde_json::to_value(&meta).unwrap();
        check!(json["registryId"] == "package-registry");
        check!(json["specVersion"] == "1.0.0");
        check!(json["generatedAt"] == "2026-01-01T00:00:00.000Z");
        check!(json["sourceRepo"] == "https://example.com/registry");
        check!(json["indexFormat"] == "json-per-package");
        check!(json["entryCount"] == 0);
    }

    #[test]
    fn ingest_filters_invalid_entries_and_fixes_count() {
        let value = json!({
            "meta": { "generatedAt": "2026-01-01T00:00:00Z", "entryCount": 99 },
            "entries": [
                { "namespace": "acme", "name": "tree" },
                { "name": "orphan" },
                "junk",
                { "namespace": "acme", "name": "graph" }
            ]
        });

        let snapshot = Snapshot::from_value(&value);
        check!(snapshot.entries.len() == 2);
        check!(snapshot.meta.entry_count == 2);
        check!(snapshot.version() == "2026-01-01T00:00:00Z");
    }

    #[test]
    fn ingest_of_junk_yields_empty_snapshot() {
        check!(Snapshot::from_value(&json!(null)).is_empty());
        check!(Snapshot::from_value(&json!("nope")).is_empty());
        check!(Snapshot::from_value(&json!({ "meta": 3, "entries": 5 })).is_empty());
        check!(Snapshot::from_value(&json!({})).version() == "");
    }

    #[test]
    fn deserialize_goes_through_lenient_ingest() {
        let raw = r#"{ "entries": [ { "namespace": "a", "name": "b" }, 17 ] }"#;
        let snapshot: Snapshot = serde_json::from_str(raw).unwrap();
        check!(snapshot.entries.len() == 1);
        check!(snapshot.meta.entry_count == 1);
    }
}
