use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

use crate::history::Tag;

static SEMVER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v?(\d+)\.(\d+)\.(\d+)$").expect("semver pattern is valid"));

/// Parses `vMAJOR.MINOR.PATCH` / `MAJOR.MINOR.PATCH`.
pub fn parse_semver(name: &str) -> Option<(u64, u64, u64)> {
    let caps = SEMVER.captures(name)?;
    let part = |i: usize| caps.get(i)?.as_str().parse::<u64>().ok();
    Some((part(1)?, part(2)?, part(3)?))
}

/// Newest-first comparison of two tag names.
///
/// Two semver names compare by (major, minor, patch), short-circuiting on
/// the first differing component. Any pair involving a non-semver name
/// compares by reverse lexical order of the full strings.
pub fn compare_newest_first(a: &str, b: &str) -> Ordering {
    match (parse_semver(a), parse_semver(b)) {
        (Some(va), Some(vb)) => vb.cmp(&va),
        _ => b.cmp(a),
    }
}

/// Orders tags newest-first with [`compare_newest_first`].
///
/// The comparator is not transitive over mixed semver/non-semver sets, which
/// `slice::sort_by` is allowed to panic on, so this is a stable insertion
/// sort that applies the comparator pairwise.
pub fn order_tags(tags: &[Tag]) -> Vec<Tag> {
    let mut ordered: Vec<Tag> = Vec::with_capacity(tags.len());
    for tag in tags {
        let at = ordered
            .iter()
            .position(|placed| compare_newest_first(&tag.name, &placed.name) == Ordering::Less)
            .unwrap_or(ordered.len());
        ordered.insert(at, tag.clone());
    }
    ordered
}

/// Keeps the `max` most recent tags of an already ordered list.
pub fn cap_tags(mut ordered: Vec<Tag>, max: Option<usize>) -> Vec<Tag> {
    if let Some(max) = max {
        ordered.truncate(max);
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::fixtures::tag;

    fn names(tags: &[Tag]) -> Vec<&str> {
        tags.iter().map(|t| t.name.as_str()).collect()
    }

    fn tags(names: &[&str]) -> Vec<Tag> {
        names
            .iter()
            .map(|n| tag(n, "h", "2024-01-01T00:00:00Z"))
            .collect()
    }

    #[test]
    fn test_parse_semver() {
        assert_eq!(parse_semver("v1.2.3"), Some((1, 2, 3)));
        assert_eq!(parse_semver("10.0.1"), Some((10, 0, 1)));
        assert_eq!(parse_semver("v1.2"), None);
        assert_eq!(parse_semver("v1.2.3-rc1"), None);
        assert_eq!(parse_semver("release-1"), None);
    }

    #[test]
    fn test_numeric_not_lexical_ordering() {
        let ordered = order_tags(&tags(&["v1.2.0", "v1.10.0", "v1.3.0"]));
        assert_eq!(names(&ordered), vec!["v1.10.0", "v1.3.0", "v1.2.0"]);
    }

    #[test]
    fn test_semver_tags_sort_strictly_descending() {
        let ordered = order_tags(&tags(&[
            "v0.9.9", "v2.0.0", "v1.0.10", "1.0.2", "v1.1.0", "v10.0.0", "v1.0.9",
        ]));
        let versions: Vec<_> = ordered
            .iter()
            .map(|t| parse_semver(&t.name).unwrap())
            .collect();
        for pair in versions.windows(2) {
            assert!(pair[0] > pair[1], "{:?} should precede {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_non_semver_tags_use_reverse_lexical_order() {
        let ordered = order_tags(&tags(&["alpha", "gamma", "beta"]));
        assert_eq!(names(&ordered), vec!["gamma", "beta", "alpha"]);
    }

    #[test]
    fn test_mixed_sets_do_not_panic_and_keep_every_tag() {
        let input = tags(&["v1.10.0", "v1.9.0", "v1.5", "release", "v2.0.0"]);
        let ordered = order_tags(&input);
        assert_eq!(
            names(&ordered),
            vec!["v2.0.0", "v1.5", "v1.10.0", "v1.9.0", "release"]
        );
    }

    #[test]
    fn test_mixed_pairs_compare_reverse_lexically() {
        assert_eq!(
            names(&order_tags(&tags(&["release", "v1.0.0"]))),
            vec!["v1.0.0", "release"]
        );
        assert_eq!(
            names(&order_tags(&tags(&["1.0.0", "release"]))),
            vec!["release", "1.0.0"]
        );
        assert_eq!(compare_newest_first("v1.5", "v1.10.0"), Ordering::Less);
        assert_eq!(compare_newest_first("v1.10.0", "v1.9.0"), Ordering::Less);
    }

    #[test]
    fn test_cap_keeps_most_recent() {
        let ordered = order_tags(&tags(&["v1.0.0", "v3.0.0", "v2.0.0"]));
        assert_eq!(names(&cap_tags(ordered.clone(), Some(2))), vec!["v3.0.0", "v2.0.0"]);
        assert_eq!(cap_tags(ordered.clone(), None).len(), 3);
        assert_eq!(cap_tags(ordered, Some(10)).len(), 3);
    }
}
