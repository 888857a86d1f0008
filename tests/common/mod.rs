//! Shared test fixtures for integration tests.
//!
//! Each test gets an isolated registry root in a temp directory: a
//! `registry.json` metadata file plus an `index/` directory of per-package
//! descriptor files, mirroring the layout the builder consumes in production.

use std::path::Path;
use tempfile::TempDir;

/// An isolated on-disk registry root.
pub struct RegistryFixture {
    dir: TempDir,
}

#[allow(dead_code)] // Helpers are shared across integration test crates.
impl RegistryFixture {
    /// Creates a root with default metadata and an empty index.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp registry root");
        std::fs::write(
            dir.path().join("registry.json"),
            r#"{
                "id": "test-registry",
                "specVersion": "1.0.0",
                "homepage": "https://example.com/registry",
                "index": { "format": "json-per-package" }
            }"#,
        )
        .expect("write registry.json");
        std::fs::create_dir(dir.path().join("index")).expect("create index dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Overwrites the registry metadata file with raw content.
    pub fn write_metadata(&self, content: &str) {
        std::fs::write(self.path().join("registry.json"), content).expect("write registry.json");
    }

    /// Writes one raw descriptor file into the index directory.
    pub fn write_descriptor(&self, file_name: &str, content: &str) {
        std::fs::write(self.path().join("index").join(file_name), content)
            .expect("write descriptor");
    }

    /// Writes a well-formed descriptor with the given versions.
    pub fn write_package(&self, namespace: &str, name: &str, versions: &[(&str, bool)]) {
        let versions: serde_json::Map<String, serde_json::Value> = versions
            .iter()
            .map(|(version, yanked)| {
                (
                    (*version).to_string(),
                    serde_json::json!({ "yanked": yanked }),
                )
            })
            .collect();

        let descriptor = serde_json::json!({
            "namespace": namespace,
            "name": name,
            "description": format!("{} package", name),
            "versions": versions,
        });

        self.write_descriptor(
            &format!("{}__{}.json", namespace, name),
            &descriptor.to_string(),
        );
    }
}

/// A small three-package snapshot document in wire shape.
#[allow(dead_code)]
pub fn sample_snapshot_value() -> serde_json::Value {
    serde_json::json!({
        "meta": {
            "registryId": "test-registry",
            "specVersion": "1.0.0",
            "generatedAt": "2026-01-01T00:00:00.000Z",
            "sourceRepo": "https://example.com/registry",
            "indexFormat": "json-per-package",
            "entryCount": 3
        },
        "entries": [
            {
                "namespace": "acme", "name": "forest",
                "keywords": ["tree"], "latest": "2.0.0"
            },
            {
                "namespace": "acme", "name": "tree",
                "description": "binary tree",
                "keywords": ["data-structure"],
                "repo": { "url": "https://example.com/acme/tree" },
                "versions": { "1.0.0": {}, "1.2.0": {} },
                "latest": "1.2.0"
            },
            {
                "namespace": "green", "name": "palm-tree",
                "latest": "0.3.0"
            }
        ]
    })
}
