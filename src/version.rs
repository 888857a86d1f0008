//! Semantic version parsing and comparison.
//!
//! Two comparators live here on purpose. [`SemVer`] is the strict grammar used
//! by the index builder to decide which version a package publishes as
//! `latest`. [`cmp_latest_desc`] is the looser component-wise comparator used
//! only to order search hits, which must tolerate malformed version strings
//! that already exist in authored descriptors. Unifying the two would reorder
//! published edge-case versions, so they stay separate.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Strict version grammar: `MAJOR.MINOR.PATCH` with an optional prerelease tag.
static STRICT_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:-([0-9A-Za-z.-]+))?$").expect("valid regex")
});

/// A strictly parsed semantic version.
///
/// Ordering follows standard precedence for the numeric components. Prerelease
/// handling is deliberately simplified: a release with no prerelease tag
/// outranks any prerelease of the same triple, and two prerelease tags compare
/// as plain strings rather than identifier-by-identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
}

impl Ord for SemVer {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

/// Error type for strict version parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a valid semantic version: {0:?}")]
pub struct ParseVersionError(pub String);

impl FromStr for SemVer {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let caps = STRICT_GRAMMAR
            .captures(s)
            .ok_or_else(|| ParseVersionError(s.to_string()))?;

        // Components that overflow u64 are rejected rather than clamped.
        let component = |i: usize| -> std::result::Result<u64, ParseVersionError> {
            caps[i]
                .parse::<u64>()
                .map_err(|_| ParseVersionError(s.to_string()))
        };

        Ok(Self {
            major: component(1)?,
            minor: component(2)?,
            patch: component(3)?,
            prerelease: caps.get(4).map(|m| m.as_str().to_string()),
        })
    }
}

/// Resolves the latest version from `(version, yanked)` pairs.
///
/// Only keys that parse under the strict grammar participate, and yanked
/// records are excluded. Returns `None` when no candidate survives, which the
/// builder maps to an empty `latest`.
pub fn compute_latest_version<'a, I>(versions: I) -> Option<String>
where
    I: IntoIterator<Item = (&'a str, bool)>,
{
    versions
        .into_iter()
        .filter(|(_, yanked)| !yanked)
        .filter_map(|(raw, _)| raw.parse::<SemVer>().ok().map(|parsed| (parsed, raw)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, raw)| raw.to_string())
}

/// Compares two raw version strings for descending "newest first" ordering.
///
/// This is the permissive comparator used to sort search hits by `latest`.
/// The core triple is read component-wise with leading digits only (trailing
/// garbage is ignored, missing or non-numeric components count as 0), and
/// equal triples fall back to a descending comparison of the raw strings.
pub fn cmp_latest_desc(a: &str, b: &str) -> Ordering {
    let pa = loose_triple(a);
    let pb = loose_triple(b);

    for i in 0..3 {
        match pb[i].cmp(&pa[i]) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
    }

    b.cmp(a)
}

fn loose_triple(version: &str) -> [u64; 3] {
    let core = version.split('-').next().unwrap_or("");
    let mut triple = [0u64; 3];

    for (i, part) in core.split('.').take(3).enumerate() {
        let digits: String = part.trim().chars().take_while(char::is_ascii_digit).collect();
        triple[i] = digits.parse().unwrap_or(0);
    }

    triple
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use rstest::rstest;

    #[rstest]
    #[case("1.2.3", 1, 2, 3, None)]
    #[case("0.0.0", 0, 0, 0, None)]
    #[case("10.20.30", 10, 20, 30, None)]
    #[case("1.0.0-alpha", 1, 0, 0, Some("alpha"))]
    #[case("1.0.0-alpha.1", 1, 0, 0, Some("alpha.1"))]
    #[case("2.1.0-rc-2", 2, 1, 0, Some("rc-2"))]
    fn strict_parse_accepts(
        #[case] input: &str,
        #[case] major: u64,
        #[case] minor: u64,
        #[case] patch: u64,
        #[case] prerelease: Option<&str>,
    ) {
        let version: SemVer = input.parse().unwrap();
        check!(version.major == major);
        check!(version.minor == minor);
        check!(version.patch == patch);
        check!(version.prerelease.as_deref() == prerelease);
        check!(version.to_string() == input);
    }

    #[rstest]
    #[case("1.2")]
    #[case("1")]
    #[case("v1.2.3")]
    #[case("1.2.3.4")]
    #[case("1.2.x")]
    #[case("1.2.3-")]
    #[case("1.2.3-beta!")]
    #[case("")]
    #[case("latest")]
    fn strict_parse_rejects(#[case] input: &str) {
        let_assert!(Err(ParseVersionError(raw)) = input.parse::<SemVer>());
        check!(raw == input);
    }

    #[rstest]
    #[case("1.0.0", "0.9.9")]
    #[case("0.2.0", "0.1.9")]
    #[case("0.0.10", "0.0.9")]
    #[case("1.0.0", "1.0.0-rc.1")]
    #[case("1.0.0-beta", "1.0.0-alpha")]
    fn strict_precedence(#[case] greater: &str, #[case] lesser: &str) {
        let a: SemVer = greater.parse().unwrap();
        let b: SemVer = lesser.parse().unwrap();
        check!(a > b);
    }

    #[test]
    fn latest_picks_maximum_and_skips_yanked() {
        let versions = [
            ("1.0.0", false),
            ("1.2.0", false),
            ("2.0.0", true),
            ("1.2.1-rc.1", false),
        ];
        let latest = compute_latest_version(versions);
        check!(latest.as_deref() == Some("1.2.0"));
    }

    #[test]
    fn latest_ignores_invalid_keys() {
        let versions = [("not-a-version", false), ("1.x", false), ("0.3.0", false)];
        check!(compute_latest_version(versions).as_deref() == Some("0.3.0"));
    }

    #[test]
    fn latest_is_none_without_valid_candidates() {
        check!(compute_latest_version([("nightly", false)]).is_none());
        check!(compute_latest_version([("1.0.0", true)]).is_none());
        check!(compute_latest_version([]).is_none());
    }

    #[test]
    fn prerelease_never_beats_release_of_same_triple() {
        let versions = [("1.0.0-zz.99", false), ("1.0.0", false)];
        check!(compute_latest_version(versions).as_deref() == Some("1.0.0"));
    }

    #[rstest]
    #[case("2.0.0", "1.9.9")]
    #[case("0.10.0", "0.9.0")]
    #[case("1.0.1", "1.0.0")]
    #[case("1.0.0", "")]
    #[case("1.0.0", "garbage")]
    fn loose_comparator_orders_newest_first(#[case] newer: &str, #[case] older: &str) {
        check!(cmp_latest_desc(newer, older) == Ordering::Less);
        check!(cmp_latest_desc(older, newer) == Ordering::Greater);
    }

    #[test]
    fn loose_comparator_tolerates_partial_and_suffixed_components() {
        // "1.2" reads as 1.2.0 and "1.2.3rc" reads as 1.2.3.
        check!(cmp_latest_desc("1.2.3rc", "1.2") == Ordering::Less);
        check!(cmp_latest_desc("1.2", "1.2.0") != Ordering::Less);
    }

    #[test]
    fn loose_comparator_breaks_ties_by_descending_raw_string() {
        // Equal triples: "1.0.0-beta" vs "1.0.0-alpha" falls back to string order.
        check!(cmp_latest_desc("1.0.0-beta", "1.0.0-alpha") == Ordering::Less);
        check!(cmp_latest_desc("1.0.0", "1.0.0") == Ordering::Equal);
    }
}
