use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::BTreeSet;

/// Number of hash characters shown in changelog entries.
pub const SHORT_HASH_LEN: usize = 7;

/// A single commit as reported by `git log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    /// Full commit hash
    pub hash: String,
    /// Author name (`%an`)
    pub author: String,
    /// Author date with the committer's original offset
    pub timestamp: DateTime<FixedOffset>,
    /// Subject line
    pub short_message: String,
    /// Subject plus body
    pub full_message: String,
}

impl Commit {
    pub fn short_hash(&self) -> &str {
        self.hash.get(..SHORT_HASH_LEN).unwrap_or(&self.hash)
    }

    /// Calendar month of the commit (`YYYY-MM`) in its own offset.
    pub fn month(&self) -> String {
        self.timestamp.format("%Y-%m").to_string()
    }
}

/// A tag resolved to the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
    pub commit_hash: String,
    /// Timestamp of the resolved commit, not of the tag object
    pub timestamp: DateTime<FixedOffset>,
}

impl Tag {
    /// Release date (`YYYY-MM-DD`) used in changelog headings.
    pub fn date(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }
}

/// Everything read from version control for one run.
///
/// Commits are ordered newest-first. Built once by
/// [`HistoryProvider::fetch`](super::HistoryProvider::fetch) and never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct History {
    pub authors: BTreeSet<String>,
    pub commits: Vec<Commit>,
    pub tags: Vec<Tag>,
    pub branches: BTreeSet<String>,
}

impl History {
    pub fn new(commits: Vec<Commit>, tags: Vec<Tag>, branches: BTreeSet<String>) -> Self {
        let authors = commits.iter().map(|c| c.author.clone()).collect();
        Self {
            authors,
            commits,
            tags,
            branches,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Timestamp of the oldest commit.
    pub fn first_commit_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.commits.last().map(|c| c.timestamp)
    }

    /// Timestamp of the newest commit.
    pub fn last_commit_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.commits.first().map(|c| c.timestamp)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    pub fn commit(hash: &str, author: &str, when: &str, message: &str) -> Commit {
        Commit {
            hash: hash.to_string(),
            author: author.to_string(),
            timestamp: ts(when),
            short_message: message.to_string(),
            full_message: message.to_string(),
        }
    }

    pub fn tag(name: &str, hash: &str, when: &str) -> Tag {
        Tag {
            name: name.to_string(),
            commit_hash: hash.to_string(),
            timestamp: ts(when),
        }
    }
}
