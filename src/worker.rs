//! Message-driven search worker.
//!
//! The worker owns one snapshot for the lifetime of a `load` message and
//! answers `search` / `getPackage` queries against it. All state lives in a
//! single consumer task reading typed request variants off an mpsc channel,
//! so no locking is needed and every query resolves in one scheduling turn —
//! the snapshot is memory-resident and the handler never awaits I/O.
//!
//! Errors are reported as explicit codes in the response envelope
//! (`registry_not_loaded`, `not_found`), never as panics: no message may
//! leave the worker unable to serve subsequent valid queries.

use crate::search::{
    PackageDetails, QueryMode, SearchHit, SearchParams, SortMode, execute, find_package,
};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// Error code for queries sent before any successful `load`.
pub const ERR_NOT_LOADED: &str = "registry_not_loaded";
/// Error code for an exact-id lookup that matched nothing.
pub const ERR_NOT_FOUND: &str = "not_found";
/// Error code for a message whose `type` tag is unrecognized.
pub const ERR_UNKNOWN_MESSAGE: &str = "unknown_message_type";

const CHANNEL_CAPACITY: usize = 32;

/// Wire request envelope, correlated by shape rather than explicit IDs.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerRequest {
    /// Replace the held snapshot wholesale.
    Load { data: Value },
    /// Scored search or empty-query browse. Junk-typed fields degrade to
    /// their defaults rather than poisoning the whole envelope.
    Search {
        #[serde(default, deserialize_with = "lenient_string")]
        query: Option<String>,
        #[serde(default, deserialize_with = "lenient_usize")]
        limit: Option<usize>,
        #[serde(default, deserialize_with = "lenient_usize")]
        offset: Option<usize>,
        #[serde(default, deserialize_with = "lenient_sort")]
        sort: Option<SortMode>,
    },
    /// Exact-id package lookup.
    GetPackage { id: String },
}

/// Wire response envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerResponse {
    Loaded {
        ok: bool,
        version: String,
    },
    #[serde(rename_all = "camelCase")]
    SearchResult {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        version: String,
        total: usize,
        hits: Vec<SearchHit>,
        query: String,
        offset: usize,
        limit: usize,
        sort: SortMode,
        mode: QueryMode,
    },
    #[serde(rename_all = "camelCase")]
    PackageResult {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        version: String,
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pkg: Option<PackageDetails>,
    },
    Error {
        error: String,
    },
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

fn lenient_usize<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_u64().map(|n| n as usize))
}

fn lenient_sort<'de, D>(deserializer: D) -> Result<Option<SortMode>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value.as_str() {
        Some("latest") => Some(SortMode::Latest),
        _ => None,
    })
}

/// Explicit worker state machine: `Unloaded → Loaded`, re-entered wholesale
/// on every `load` (no merge).
#[derive(Debug, Default)]
pub enum WorkerState {
    #[default]
    Unloaded,
    Loaded(LoadedRegistry),
}

/// Snapshot owned by the worker plus its freshness token.
#[derive(Debug)]
pub struct LoadedRegistry {
    pub snapshot: Snapshot,
    pub version: String,
}

impl WorkerState {
    fn loaded(&self) -> Option<&LoadedRegistry> {
        match self {
            Self::Unloaded => None,
            Self::Loaded(registry) => Some(registry),
        }
    }
}

/// Handles one raw wire message, tolerating unknown or malformed envelopes.
pub fn handle_raw(state: &mut WorkerState, message: &Value) -> WorkerResponse {
    match serde_json::from_value::<WorkerRequest>(message.clone()) {
        Ok(request) => handle_request(state, request),
        Err(_) => WorkerResponse::Error {
            error: ERR_UNKNOWN_MESSAGE.to_string(),
        },
    }
}

/// Handles one typed request against the owned state.
pub fn handle_request(state: &mut WorkerState, request: WorkerRequest) -> WorkerResponse {
    match request {
        WorkerRequest::Load { data } => handle_load(state, &data),
        WorkerRequest::Search {
            query,
            limit,
            offset,
            sort,
        } => handle_search(state, SearchParams::from_raw(query, limit, offset, sort)),
        WorkerRequest::GetPackage { id } => handle_get_package(state, id),
    }
}

fn handle_load(state: &mut WorkerState, data: &Value) -> WorkerResponse {
    if data.is_null() {
        *state = WorkerState::Unloaded;
        tracing::debug!("worker unloaded (null load payload)");
        return WorkerResponse::Loaded {
            ok: false,
            version: String::new(),
        };
    }

    let snapshot = Snapshot::from_value(data);
    let version = snapshot.version().to_string();
    tracing::debug!(
        entries = snapshot.entries.len(),
        version = %version,
        "worker loaded snapshot"
    );
    *state = WorkerState::Loaded(LoadedRegistry {
        snapshot,
        version: version.clone(),
    });

    WorkerResponse::Loaded { ok: true, version }
}

fn handle_search(state: &WorkerState, params: SearchParams) -> WorkerResponse {
    let Some(registry) = state.loaded() else {
        // Echo enough of the request that shape-based correlation still works.
        let mode = if params.query.trim().is_empty() {
            QueryMode::Browse
        } else {
            QueryMode::Search
        };
        return WorkerResponse::SearchResult {
            ok: false,
            error: Some(ERR_NOT_LOADED.to_string()),
            version: String::new(),
            total: 0,
            hits: vec![],
            query: params.query,
            offset: params.offset,
            limit: params.limit,
            sort: params.sort,
            mode,
        };
    };

    let outcome = execute(&registry.snapshot, &params);

    WorkerResponse::SearchResult {
        ok: true,
        error: None,
        version: registry.version.clone(),
        total: outcome.total,
        hits: outcome.hits,
        query: params.query,
        offset: params.offset,
        limit: params.limit,
        sort: outcome.sort,
        mode: outcome.mode,
    }
}

fn handle_get_package(state: &WorkerState, id: String) -> WorkerResponse {
    let Some(registry) = state.loaded() else {
        return WorkerResponse::PackageResult {
            ok: false,
            error: Some(ERR_NOT_LOADED.to_string()),
            version: String::new(),
            id,
            pkg: None,
        };
    };

    match find_package(&registry.snapshot, &id) {
        Some(pkg) => WorkerResponse::PackageResult {
            ok: true,
            error: None,
            version: registry.version.clone(),
            id,
            pkg: Some(pkg),
        },
        None => WorkerResponse::PackageResult {
            ok: false,
            error: Some(ERR_NOT_FOUND.to_string()),
            version: registry.version.clone(),
            id,
            pkg: None,
        },
    }
}

/// Channel handles to a spawned worker task.
#[derive(Debug)]
pub struct WorkerHandle {
    pub requests: mpsc::Sender<Value>,
    pub responses: mpsc::Receiver<WorkerResponse>,
}

/// Spawns the worker as its own task consuming raw wire messages.
///
/// Responses come back on a paired channel in request order. Dropping the
/// request sender shuts the worker down.
pub fn spawn_worker() -> WorkerHandle {
    let (request_tx, mut request_rx) = mpsc::channel::<Value>(CHANNEL_CAPACITY);
    let (response_tx, response_rx) = mpsc::channel::<WorkerResponse>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut state = WorkerState::default();

        while let Some(message) = request_rx.recv().await {
            let response = handle_raw(&mut state, &message);
            if response_tx.send(response).await.is_err() {
                break;
            }
        }

        tracing::debug!("search worker channel closed, stopping");
    });

    WorkerHandle {
        requests: request_tx,
        responses: response_rx,
    }
}
