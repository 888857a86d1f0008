//! Relevance scoring for registry search.
//!
//! The score of an entry is the sum of independent weighted boolean
//! contributions, each a case-insensitive substring test of the query
//! against one field:
//!
//! | field             | weight |
//! |-------------------|--------|
//! | `namespace/name`  | 100    |
//! | `name`            | 60     |
//! | `namespace`       | 40     |
//! | `displayName`     | 25     |
//! | `description`     | 20     |
//! | joined keywords   | 15     |
//!
//! An entry scoring 0 matched nothing and is excluded from results.

use crate::descriptor::PackageDescriptor;

const WEIGHT_ID: u32 = 100;
const WEIGHT_NAME: u32 = 60;
const WEIGHT_NAMESPACE: u32 = 40;
const WEIGHT_DISPLAY_NAME: u32 = 25;
const WEIGHT_DESCRIPTION: u32 = 20;
const WEIGHT_KEYWORDS: u32 = 15;

/// Case-insensitive substring test.
///
/// The needle must already be lowercased by the caller; an empty needle
/// matches everything.
pub fn contains_icase(haystack: &str, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(needle_lower)
}

/// Scores one entry against a lowercased, trimmed query.
pub fn score_entry(entry: &PackageDescriptor, query_lower: &str) -> u32 {
    let id = entry.id();
    let mut score = 0;

    if contains_icase(&id, query_lower) {
        score += WEIGHT_ID;
    }
    if contains_icase(&entry.name, query_lower) {
        score += WEIGHT_NAME;
    }
    if contains_icase(&entry.namespace, query_lower) {
        score += WEIGHT_NAMESPACE;
    }
    // Scores the raw displayName; the name fallback applies only to hit
    // projection, not matching.
    if contains_icase(&entry.display_name, query_lower) {
        score += WEIGHT_DISPLAY_NAME;
    }
    if contains_icase(&entry.description, query_lower) {
        score += WEIGHT_DESCRIPTION;
    }
    if contains_icase(&entry.joined_keywords(), query_lower) {
        score += WEIGHT_KEYWORDS;
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;
    use serde_json::json;

    fn tree_entry() -> PackageDescriptor {
        PackageDescriptor::from_value(&json!({
            "namespace": "acme",
            "name": "tree",
            "description": "binary tree",
            "keywords": ["data-structure"]
        }))
        .unwrap()
    }

    #[rstest]
    #[case("Binary TREE", "tree", true)]
    #[case("tree", "", true)]
    #[case("", "", true)]
    #[case("tree", "graph", false)]
    #[case("", "tree", false)]
    fn icase_substring(#[case] haystack: &str, #[case] needle: &str, #[case] expected: bool) {
        check!(contains_icase(haystack, needle) == expected);
    }

    #[test]
    fn name_match_scores_id_name_and_description() {
        // "tree" hits id (100), name (60), and description "binary tree" (20).
        // No displayName is authored, so that field contributes nothing.
        check!(score_entry(&tree_entry(), "tree") == 180);
    }

    #[test]
    fn keyword_only_match_scores_keyword_weight() {
        check!(score_entry(&tree_entry(), "data-structure") == 15);
    }

    #[test]
    fn namespace_match_also_hits_id() {
        // "acme" appears in the id and the namespace.
        check!(score_entry(&tree_entry(), "acme") == 140);
    }

    #[test]
    fn no_match_scores_zero() {
        check!(score_entry(&tree_entry(), "graph") == 0);
    }

    #[test]
    fn explicit_display_name_is_scored_independently() {
        let entry = PackageDescriptor::from_value(&json!({
            "namespace": "acme",
            "name": "vv",
            "displayName": "Viewer"
        }))
        .unwrap();

        check!(score_entry(&entry, "viewer") == 25);
    }
}
