//! Typed package descriptor model.
//!
//! Descriptors are authored externally as one JSON file per package, so the
//! parser here is deliberately forgiving: optional fields default to empty
//! rather than failing, and non-string junk inside lists is dropped. The one
//! hard requirement is identity — a descriptor without a non-empty
//! `namespace` and `name` is rejected outright so `undefined`-shaped values
//! can never reach scoring logic.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One version entry inside a descriptor's `versions` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionRecord {
    /// A yanked version is withdrawn and never participates in latest resolution.
    pub yanked: bool,
}

/// Repository reference (`repo.url` in descriptor JSON).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoRef {
    pub url: String,
}

/// One package's metadata record, identity `namespace/name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
    pub namespace: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<RepoRef>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub homepage: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub license: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub readme: String,
    /// Version map keyed by version string. BTreeMap keeps emitted snapshots
    /// byte-stable across rebuilds.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub versions: BTreeMap<String, VersionRecord>,
    /// Resolved latest version; empty when no valid version exists.
    pub latest: String,
}

impl PackageDescriptor {
    /// Parses a raw JSON value into a descriptor.
    ///
    /// Returns `None` when the value is not an object or when `namespace` or
    /// `name` are missing or empty. Everything else degrades to defaults.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let namespace = string_field(obj, "namespace");
        let name = string_field(obj, "name");
        if namespace.is_empty() || name.is_empty() {
            return None;
        }

        let keywords = obj
            .get("keywords")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let repo = obj
            .get("repo")
            .and_then(Value::as_object)
            .map(|repo| RepoRef {
                url: repo
                    .get("url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });

        let versions = obj
            .get("versions")
            .and_then(Value::as_object)
            .map(|versions| {
                versions
                    .iter()
                    .map(|(key, record)| {
                        let yanked = record
                            .get("yanked")
                            .and_then(Value::as_bool)
                            .unwrap_or(false);
                        (key.clone(), VersionRecord { yanked })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            namespace,
            name,
            display_name: string_field(obj, "displayName"),
            description: string_field(obj, "description"),
            keywords,
            repo,
            homepage: string_field(obj, "homepage"),
            license: string_field(obj, "license"),
            readme: string_field(obj, "readme"),
            versions,
            latest: string_field(obj, "latest"),
        })
    }

    /// Unique identity within a snapshot.
    pub fn id(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Display name, falling back to the bare package name.
    pub fn display_name_or_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// Repository URL, empty when no repo reference is present.
    pub fn repo_url(&self) -> &str {
        self.repo.as_ref().map_or("", |repo| repo.url.as_str())
    }

    /// Resolved latest version for display.
    ///
    /// Builder-produced snapshots precompute `latest`; hand-authored entries
    /// without one fall back to the lexically greatest version key.
    pub fn latest_version(&self) -> String {
        if !self.latest.is_empty() {
            return self.latest.clone();
        }
        self.versions.keys().max().cloned().unwrap_or_default()
    }

    /// Keywords joined for substring matching (`"a, b, c"`).
    pub fn joined_keywords(&self) -> String {
        self.keywords.join(", ")
    }
}

fn string_field(obj: &serde_json::Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
