//! Snapshot search: scoring, sorting, pagination, and package lookup.
//!
//! This is an OR-of-substrings additive model over a memory-resident
//! snapshot, not a tokenized IR engine — intentional simplicity so every
//! query resolves in one pass with no index to maintain.

pub(crate) mod query;
pub(crate) mod scoring;

pub use query::{
    MAX_LIMIT, PackageDetails, PackageStats, QueryMode, SearchHit, SearchOutcome, SearchParams,
    SortMode, execute, find_package,
};
pub use scoring::{contains_icase, score_entry};
