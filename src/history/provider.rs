use chrono::{DateTime, FixedOffset};
use log::{debug, info};
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::git::GitRunner;
use super::types::{Commit, History, Tag};
use crate::output::Reporter;

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

/// `%H|%an|%ad|%s|%b` with control-character separators so that bodies
/// containing pipes or newlines survive parsing.
const LOG_FORMAT: &str = "--pretty=format:%H%x1f%an%x1f%ad%x1f%s%x1f%b%x1e";

/// Format emitted by `--date=iso`, e.g. `2024-03-15 10:22:33 +0100`.
const ISO_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Materializes repository history by querying git.
///
/// Every git failure degrades to an empty result; nothing here aborts a run.
pub struct HistoryProvider<G: GitRunner> {
    git: G,
    repo: PathBuf,
}

impl<G: GitRunner> HistoryProvider<G> {
    pub fn new(git: G, repo: impl Into<PathBuf>) -> Self {
        Self {
            git,
            repo: repo.into(),
        }
    }

    #[cfg(test)]
    pub(crate) fn runner(&self) -> &G {
        &self.git
    }

    /// Reads authors, commits, branches and tags.
    ///
    /// A missing path or a directory that is not a git work tree yields an
    /// empty [`History`] and a warning on `reporter`.
    pub async fn fetch(&self, reporter: &dyn Reporter) -> History {
        if !self.repo.is_dir() {
            reporter.warn(&format!(
                "Project path {} does not exist; continuing without history",
                self.repo.display()
            ));
            return History::default();
        }

        if self
            .git(&["rev-parse", "--is-inside-work-tree"])
            .await
            .is_none()
        {
            reporter.warn(&format!(
                "{} is not a git repository; continuing without history",
                self.repo.display()
            ));
            return History::default();
        }

        let commits = self
            .log(&["log", LOG_FORMAT, "--date=iso", "--no-merges"])
            .await;
        let branches = self.branches().await;
        let tags = self.tags(reporter).await;

        info!(
            "Loaded {} commits, {} tags and {} branches from {}",
            commits.len(),
            tags.len(),
            branches.len(),
            self.repo.display()
        );

        History::new(commits, tags, branches)
    }

    /// Commits reachable from `to` but not from `from`, newest-first.
    ///
    /// Without `from`, every commit up to and including `to`.
    pub async fn commits_between(&self, from: Option<&Tag>, to: &Tag) -> Vec<Commit> {
        let range = match from {
            Some(from) => format!("{}..{}", from.commit_hash, to.commit_hash),
            None => to.commit_hash.clone(),
        };
        self.log(&["log", &range, LOG_FORMAT, "--date=iso", "--no-merges"])
            .await
    }

    /// Commits strictly newer than `newest`, the first tag in release
    /// order, or every commit when the repository has no tags.
    pub async fn commits_since_newest_tag(
        &self,
        newest: Option<&Tag>,
        history: &History,
    ) -> Vec<Commit> {
        match newest {
            Some(tag) => {
                let range = format!("{}..HEAD", tag.commit_hash);
                self.log(&["log", &range, LOG_FORMAT, "--date=iso", "--no-merges"])
                    .await
            }
            None => history.commits.clone(),
        }
    }

    async fn git(&self, args: &[&str]) -> Option<String> {
        self.git.run(&self.repo, args).await
    }

    async fn log(&self, args: &[&str]) -> Vec<Commit> {
        self.git(args)
            .await
            .map(|out| parse_log(&out))
            .unwrap_or_default()
    }

    async fn branches(&self) -> BTreeSet<String> {
        self.git(&["branch", "--list", "--no-color"])
            .await
            .map(|out| parse_branches(&out))
            .unwrap_or_default()
    }

    /// Resolves every tag to its commit and that commit's date. Tags that
    /// fail either step are reported and skipped.
    async fn tags(&self, reporter: &dyn Reporter) -> Vec<Tag> {
        let Some(listing) = self.git(&["tag", "-l"]).await else {
            return Vec::new();
        };

        let mut tags = Vec::new();
        for name in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match self.resolve_tag(name).await {
                Ok(tag) => tags.push(tag),
                Err(reason) => reporter.warn(&format!("Skipping tag {name}: {reason}")),
            }
        }
        tags
    }

    async fn resolve_tag(&self, name: &str) -> Result<Tag, String> {
        let commit_hash = self
            .git(&["rev-list", "-n", "1", name])
            .await
            .map(|out| out.trim().to_string())
            .filter(|hash| !hash.is_empty())
            .ok_or_else(|| "could not resolve commit".to_string())?;

        let date = self
            .git(&["show", "-s", "--format=%ad", "--date=iso", &commit_hash])
            .await
            .ok_or_else(|| format!("could not read date of {commit_hash}"))?;

        let timestamp = parse_iso_date(date.trim())
            .ok_or_else(|| format!("unparsable date {:?}", date.trim()))?;

        Ok(Tag {
            name: name.to_string(),
            commit_hash,
            timestamp,
        })
    }
}

pub(crate) fn parse_iso_date(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s, ISO_DATE_FORMAT).ok()
}

pub(crate) fn parse_log(output: &str) -> Vec<Commit> {
    output
        .split(RECORD_SEP)
        .map(|record| record.trim_start_matches(['\n', '\r']))
        .filter(|record| !record.trim().is_empty())
        .filter_map(|record| {
            let fields: Vec<&str> = record.splitn(5, FIELD_SEP).collect();
            let [hash, author, date, subject, body] = fields.as_slice() else {
                debug!("Ignoring malformed log record: {record:?}");
                return None;
            };
            let Some(timestamp) = parse_iso_date(date.trim()) else {
                debug!("Ignoring commit {hash} with unparsable date {date:?}");
                return None;
            };

            let subject = subject.trim();
            let body = body.trim();
            let full_message = if body.is_empty() {
                subject.to_string()
            } else {
                format!("{subject}\n\n{body}")
            };

            Some(Commit {
                hash: hash.trim().to_string(),
                author: author.trim().to_string(),
                timestamp,
                short_message: subject.to_string(),
                full_message,
            })
        })
        .collect()
}

fn parse_branches(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .map(|line| line.trim_start_matches('*').trim())
        .filter(|name| !name.is_empty() && !name.starts_with('('))
        .map(ToString::to_string)
        .collect()
}
