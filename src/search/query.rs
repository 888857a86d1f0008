//! Query execution: parameter clamping, sorting, pagination, and projections.

use crate::descriptor::PackageDescriptor;
use crate::search::scoring::score_entry;
use crate::snapshot::Snapshot;
use crate::version::cmp_latest_desc;
use serde::{Deserialize, Serialize};

/// Hard ceiling on page size.
pub const MAX_LIMIT: usize = 200;
const MIN_LIMIT: usize = 1;
const DEFAULT_LIMIT: usize = 20;

/// Result ordering requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Descending relevance score, ties broken by ascending id.
    #[default]
    Score,
    /// Descending semver-ish precedence of `latest`, ties by descending raw
    /// string, then ascending id.
    Latest,
}

/// How the query was actually answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Non-empty query, scored and filtered.
    Search,
    /// Empty query: every entry, score 0, newest first.
    Browse,
}

/// Clamped, defaulted search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub limit: usize,
    pub offset: usize,
    pub sort: SortMode,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: String::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort: SortMode::default(),
        }
    }
}

impl SearchParams {
    /// Builds params from raw caller input, clamping `limit` to
    /// `[1, 200]` and defaulting absent fields.
    pub fn from_raw(
        query: Option<String>,
        limit: Option<usize>,
        offset: Option<usize>,
        sort: Option<SortMode>,
    ) -> Self {
        Self {
            query: query.unwrap_or_default(),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(MIN_LIMIT, MAX_LIMIT),
            offset: offset.unwrap_or(0),
            sort: sort.unwrap_or_default(),
        }
    }
}

/// Read-only search projection of one entry. Never persisted; recomputed per
/// query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub namespace: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub repo: String,
    pub latest: String,
    pub score: u32,
}

/// One executed query: the page of hits plus the pre-slice match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Full match count before pagination, so callers can build page controls.
    pub total: usize,
    pub hits: Vec<SearchHit>,
    pub mode: QueryMode,
    /// The ordering actually applied (browse overrides the request).
    pub sort: SortMode,
}

/// Executes a search or browse over a memory-resident snapshot.
///
/// A trimmed-empty query is a browse: all entries as score-0 hits, always in
/// `latest` order regardless of the requested sort. A non-empty query keeps
/// only entries scoring above 0 and honors the requested sort mode.
pub fn execute(snapshot: &Snapshot, params: &SearchParams) -> SearchOutcome {
    let query = params.query.trim();

    let (mut hits, mode, sort) = if query.is_empty() {
        let hits = snapshot
            .entries
            .iter()
            .map(|entry| build_hit(entry, 0))
            .collect::<Vec<_>>();
        (hits, QueryMode::Browse, SortMode::Latest)
    } else {
        let query_lower = query.to_lowercase();
        let hits = snapshot
            .entries
            .iter()
            .filter_map(|entry| {
                let score = score_entry(entry, &query_lower);
                (score > 0).then(|| build_hit(entry, score))
            })
            .collect::<Vec<_>>();
        (hits, QueryMode::Search, params.sort)
    };

    sort_hits(&mut hits, sort);

    let total = hits.len();
    let hits = hits
        .into_iter()
        .skip(params.offset)
        .take(params.limit)
        .collect();

    SearchOutcome {
        total,
        hits,
        mode,
        sort,
    }
}

fn sort_hits(hits: &mut [SearchHit], sort: SortMode) {
    match sort {
        SortMode::Score => {
            hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        }
        SortMode::Latest => {
            hits.sort_by(|a, b| {
                cmp_latest_desc(&a.latest, &b.latest).then_with(|| a.id.cmp(&b.id))
            });
        }
    }
}

fn build_hit(entry: &PackageDescriptor, score: u32) -> SearchHit {
    SearchHit {
        id: entry.id(),
        namespace: entry.namespace.clone(),
        name: entry.name.clone(),
        display_name: entry.display_name_or_name().to_string(),
        description: entry.description.clone(),
        repo: entry.repo_url().to_string(),
        latest: entry.latest_version(),
        score,
    }
}

/// Derived per-package stats for the detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageStats {
    pub latest: String,
    pub version_count: usize,
    pub has_readme: bool,
    pub has_repo: bool,
}

/// Fuller projection returned by `getPackage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDetails {
    pub id: String,
    pub namespace: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub repo: String,
    pub homepage: String,
    pub license: String,
    pub latest: String,
    pub stats: PackageStats,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub readme: String,
}

/// Exact-id lookup (`namespace/name`, no fuzzy matching).
pub fn find_package(snapshot: &Snapshot, id: &str) -> Option<PackageDetails> {
    let entry = snapshot.entries.iter().find(|entry| entry.id() == id)?;
    let latest = entry.latest_version();

    Some(PackageDetails {
        id: entry.id(),
        namespace: entry.namespace.clone(),
        name: entry.name.clone(),
        display_name: entry.display_name_or_name().to_string(),
        description: entry.description.clone(),
        keywords: entry.keywords.clone(),
        repo: entry.repo_url().to_string(),
        homepage: entry.homepage.clone(),
        license: entry.license.clone(),
        latest: latest.clone(),
        stats: PackageStats {
            latest,
            version_count: entry.versions.len(),
            has_readme: !entry.readme.is_empty() || !entry.description.is_empty(),
            has_repo: !entry.repo_url().is_empty(),
        },
        readme: entry.readme.clone(),
    })
}
