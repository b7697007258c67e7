use log::info;
use std::collections::BTreeMap;
use std::time::Duration;

use super::render;
use super::tags::{cap_tags, order_tags};
use crate::backend::{BatchPlan, Generation, GenerationBackend, RequestOrchestrator};
use crate::history::{Commit, GitRunner, History, HistoryProvider};
use crate::output::Reporter;

#[derive(Debug, Clone, Copy)]
pub struct ChangelogOptions {
    /// Only the N most recent tags get sections
    pub max_tags: Option<usize>,
    /// Months per backend request when there are no tags
    pub months_per_chunk: usize,
    /// Pause between month requests
    pub chunk_delay: Duration,
}

impl Default for ChangelogOptions {
    fn default() -> Self {
        Self {
            max_tags: None,
            months_per_chunk: 2,
            chunk_delay: Duration::ZERO,
        }
    }
}

/// Builds `CHANGELOG.md` content from repository history.
///
/// With tags, sections are rendered locally from each tag's commit delta.
/// Without tags, commits are grouped by month and the backend writes the
/// sections, a few months per request.
pub struct ChangelogSynthesizer<'a, G: GitRunner, B: GenerationBackend> {
    history: &'a HistoryProvider<G>,
    orchestrator: &'a RequestOrchestrator<B>,
    options: ChangelogOptions,
}

impl<'a, G: GitRunner, B: GenerationBackend> ChangelogSynthesizer<'a, G, B> {
    pub fn new(
        history: &'a HistoryProvider<G>,
        orchestrator: &'a RequestOrchestrator<B>,
        options: ChangelogOptions,
    ) -> Self {
        Self {
            history,
            orchestrator,
            options,
        }
    }

    pub async fn synthesize(&self, history: &History, reporter: &dyn Reporter) -> String {
        if history.tags.is_empty() {
            self.by_month(history, reporter).await
        } else {
            self.by_tag(history).await
        }
    }

    async fn by_tag(&self, history: &History) -> String {
        let all = order_tags(&history.tags);
        let newest = all.first().cloned();
        let ordered = cap_tags(all, self.options.max_tags);
        info!(
            "Building changelog from {} of {} tags",
            ordered.len(),
            history.tags.len()
        );

        let mut sections = vec![render::HEADER.to_string()];

        // Measured from the newest tag in release order, not by date, so a
        // later-dated backport cannot pull released work into Unreleased.
        let unreleased = self
            .history
            .commits_since_newest_tag(newest.as_ref(), history)
            .await;
        if let Some(section) = render::unreleased(&unreleased) {
            sections.push(section);
        }

        // Each tag owns the commits since the next-older tag of the capped list.
        for (index, tag) in ordered.iter().enumerate() {
            let previous = ordered.get(index + 1);
            let commits = self.history.commits_between(previous, tag).await;
            sections.push(render::release(tag, &commits));
        }

        join(sections)
    }

    async fn by_month(&self, history: &History, reporter: &dyn Reporter) -> String {
        if history.is_empty() {
            return render::empty_history();
        }

        let months = group_by_month(&history.commits);
        let chunks: Vec<Vec<(String, Vec<Commit>)>> = months
            .chunks(self.options.months_per_chunk.max(1))
            .map(<[_]>::to_vec)
            .collect();
        info!(
            "Building changelog for {} months in {} requests",
            months.len(),
            chunks.len()
        );

        let plan = BatchPlan {
            size: 1,
            delay: self.options.chunk_delay,
        };
        let results = self
            .orchestrator
            .submit_batch(&chunks, chunk_key, |chunk| render::month_prompt(chunk), plan, reporter)
            .await;

        let mut sections = vec![render::HEADER.to_string()];
        for (chunk, (_, generation)) in chunks.iter().zip(results) {
            match generation {
                Generation::Success(text) => sections.push(format!("{}\n\n", text.trim())),
                Generation::Failure { .. } => {
                    for (month, commits) in chunk {
                        sections.push(render::month(month, commits));
                    }
                }
            }
        }

        join(sections)
    }
}

/// Commits grouped by `YYYY-MM`, newest month first, commits newest-first.
pub fn group_by_month(commits: &[Commit]) -> Vec<(String, Vec<Commit>)> {
    let mut months: BTreeMap<String, Vec<Commit>> = BTreeMap::new();
    for commit in commits {
        months.entry(commit.month()).or_default().push(commit.clone());
    }
    months.into_iter().rev().collect()
}

fn chunk_key(chunk: &Vec<(String, Vec<Commit>)>) -> String {
    chunk
        .iter()
        .map(|(month, _)| month.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join(sections: Vec<String>) -> String {
    let mut doc = sections
        .iter()
        .map(|s| s.trim_end())
        .collect::<Vec<_>>()
        .join("\n\n");
    doc.push('\n');
    doc
}
