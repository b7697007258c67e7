use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static TICKET_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\[[A-Z]+-\d+\]|[A-Z]+-\d+\b):?\s*").expect("ticket pattern is valid")
});

static MERGE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Merge (?:branch|pull request)\b[^:]*:\s*").expect("merge pattern is valid")
});

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

const FEATURE_KEYWORDS: &[&str] = &["add", "feature", "implement", "support", "create"];
const BUGFIX_KEYWORDS: &[&str] = &["fix", "bug", "issue", "error", "crash", "resolve"];

/// Changelog group a commit falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Feature,
    BugFix,
    Improvement,
}

impl ChangeKind {
    /// Rendering order of the groups inside a section.
    pub const ALL: [ChangeKind; 3] = [ChangeKind::Feature, ChangeKind::BugFix, ChangeKind::Improvement];

    pub fn heading(self) -> &'static str {
        match self {
            ChangeKind::Feature => "Features",
            ChangeKind::BugFix => "Bug Fixes",
            ChangeKind::Improvement => "Improvements",
        }
    }
}

/// Cleans a raw commit message for display.
///
/// Strips leading ticket references (`ABC-123`, `[ABC-123]:`) and merge
/// phrases (`Merge branch 'x': `, `Merge pull request #1 from y: `),
/// collapses whitespace and capitalizes the first letter. The steps are
/// repeated until nothing changes, so `clean(clean(m)) == clean(m)`.
pub fn clean(raw: &str) -> String {
    let mut current = clean_once(raw);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(raw: &str) -> String {
    let text = raw.trim_start();
    let text = TICKET_PREFIX.replace(text, "");
    let text = MERGE_PREFIX.replace(&text, "");
    let text = WHITESPACE.replace_all(&text, " ");
    capitalize(text.trim())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => text.to_string(),
    }
}

/// Classifies a commit message by keyword.
///
/// Feature keywords are checked before bugfix keywords, so a message that
/// matches both ("Add fix for ...") is a feature.
pub fn classify(raw: &str) -> ChangeKind {
    let lower = raw.to_lowercase();
    if FEATURE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        ChangeKind::Feature
    } else if BUGFIX_KEYWORDS.iter().any(|k| lower.contains(k)) {
        ChangeKind::BugFix
    } else {
        ChangeKind::Improvement
    }
}
