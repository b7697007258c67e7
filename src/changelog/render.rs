use std::fmt::Write;

use super::message::{classify, clean, ChangeKind};
use crate::history::{Commit, Tag};

pub const HEADER: &str = "# Changelog\n\nAll notable changes to this project are documented in this file.\n";

pub const NO_CHANGES: &str = "_No changes in this release._";

const NO_COMMITS: &str = "_No commits found in this repository._";

/// One changelog bullet: `- <cleaned subject> (#<short hash>)`.
pub fn entry(commit: &Commit) -> String {
    format!("- {} (#{})", clean(&commit.short_message), commit.short_hash())
}

/// Features, Bug Fixes and Improvements subsections, skipping empty groups.
pub fn grouped(commits: &[Commit]) -> String {
    let mut out = String::new();
    for kind in ChangeKind::ALL {
        let entries: Vec<String> = commits
            .iter()
            .filter(|c| classify(&c.short_message) == kind)
            .map(entry)
            .collect();
        if entries.is_empty() {
            continue;
        }
        let _ = writeln!(out, "### {}\n", kind.heading());
        for line in entries {
            let _ = writeln!(out, "{line}");
        }
        out.push('\n');
    }
    out
}

/// The `[Unreleased]` section, or nothing when there is no unreleased work.
pub fn unreleased(commits: &[Commit]) -> Option<String> {
    if commits.is_empty() {
        return None;
    }
    Some(format!("## [Unreleased]\n\n{}", grouped(commits)))
}

pub fn release(tag: &Tag, commits: &[Commit]) -> String {
    let heading = format!("## [{}] - {}\n\n", tag.name, tag.date());
    if commits.is_empty() {
        format!("{heading}{NO_CHANGES}\n\n")
    } else {
        format!("{heading}{}", grouped(commits))
    }
}

/// Local rendering of a month, used when the backend could not write it.
pub fn month(month: &str, commits: &[Commit]) -> String {
    format!("## {month}\n\n{}", grouped(commits))
}

pub fn empty_history() -> String {
    format!("{HEADER}\n{NO_COMMITS}\n")
}

/// Prompt asking the backend to write the sections for a group of months.
pub fn month_prompt(months: &[(String, Vec<Commit>)]) -> String {
    let mut prompt = String::from(
        "Write changelog sections for the months of commit history listed below.\n\
         For each month, in the order given, start with a level-two heading of the form \
         `## YYYY-MM`, then group the changes under `### Features`, `### Bug Fixes` and \
         `### Improvements`, leaving out empty groups. Merge closely related commits into a \
         single bullet and keep each bullet's commit reference in the form `(#hash)`.\n\
         Respond with Markdown only, without any introduction or closing remarks.\n",
    );
    for (month, commits) in months {
        let _ = writeln!(prompt, "\nMonth: {month}");
        for commit in commits {
            let _ = writeln!(
                prompt,
                "- [{}] {}",
                commit.short_hash(),
                clean(&commit.short_message)
            );
        }
    }
    prompt
}
