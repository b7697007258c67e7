use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{RepodocError, Result};

/// Facts about one run, persisted next to the generated documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub project: String,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    /// Source files found by structure analysis (after capping)
    pub files_analyzed: usize,
    /// Files whose documentation was generated successfully
    pub files_documented: usize,
    pub failed_files: Vec<String>,
    pub commits: usize,
    pub tags: usize,
    pub authors: usize,
}

/// Everything a run produced. Sections that were never reached stay `None`.
#[derive(Debug, Clone, Default)]
pub struct Documentation {
    pub overview: Option<String>,
    /// Per-file text keyed by relative path, in processing order
    pub files: IndexMap<String, String>,
    pub changelog: Option<String>,
    pub summary: Option<String>,
    pub metadata: RunMetadata,
}

pub trait OutputWriter: Send + Sync {
    /// Makes sure the destination can be written before any work is done.
    fn prepare(&self) -> Result<()>;

    fn write(&self, docs: &Documentation) -> Result<()>;
}

/// Writes Markdown documents and `metadata.json` into one directory.
pub struct MarkdownWriter {
    dir: PathBuf,
}

impl MarkdownWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_file(&self, relative: &Path, contents: &str) -> Result<()> {
        let path = self.dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RepodocError::Output(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        fs::write(&path, ensure_trailing_newline(contents))
            .map_err(|e| RepodocError::Output(format!("cannot write {}: {e}", path.display())))
    }
}

impl OutputWriter for MarkdownWriter {
    fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            RepodocError::Output(format!("cannot create {}: {e}", self.dir.display()))
        })
    }

    fn write(&self, docs: &Documentation) -> Result<()> {
        self.prepare()?;

        if let Some(overview) = &docs.overview {
            self.write_file(Path::new("OVERVIEW.md"), overview)?;
        }
        if let Some(changelog) = &docs.changelog {
            self.write_file(Path::new("CHANGELOG.md"), changelog)?;
        }
        if let Some(summary) = &docs.summary {
            self.write_file(Path::new("SUMMARY.md"), summary)?;
        }

        for (source, text) in &docs.files {
            let Some(target) = file_doc_path(source) else {
                warn!("Not writing documentation for suspicious path {source:?}");
                continue;
            };
            self.write_file(&target, &format!("# `{source}`\n\n{}", text.trim()))?;
        }

        let metadata = serde_json::to_string_pretty(&docs.metadata)?;
        self.write_file(Path::new("metadata.json"), &metadata)?;

        info!(
            "Wrote documentation for {} files to {}",
            docs.files.len(),
            self.dir.display()
        );
        Ok(())
    }
}

/// `src/lib.rs` → `files/src/lib.rs.md`; paths leaving the tree are refused.
fn file_doc_path(source: &str) -> Option<PathBuf> {
    let source = Path::new(source);
    if !source
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    let mut name = source.file_name()?.to_os_string();
    name.push(".md");
    Some(Path::new("files").join(source.with_file_name(name)))
}

fn ensure_trailing_newline(contents: &str) -> String {
    let mut text = contents.trim_end().to_string();
    text.push('\n');
    text
}
