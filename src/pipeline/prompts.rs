use std::collections::BTreeSet;
use std::fmt::Write;

use crate::history::History;
use crate::structure::FileStructure;

/// Files listed by name in the overview prompt; the rest are counted.
const OVERVIEW_FILE_LIMIT: usize = 150;

/// Changelog characters quoted in the summary prompt.
const SUMMARY_CHANGELOG_CHARS: usize = 4000;

pub fn overview(project: &str, files: &[FileStructure], history: &History) -> String {
    let mut prompt = format!(
        "Write an overview of the software project \"{project}\" in Markdown.\n\
         Describe its purpose, its main components and how they fit together, \
         based on the source layout and history below. Start with a level-one heading.\n"
    );

    let languages: BTreeSet<String> = files.iter().map(|f| f.language.to_string()).collect();
    let _ = writeln!(prompt, "\n## Project facts\n");
    let _ = writeln!(prompt, "- Source files: {}", files.len());
    if !languages.is_empty() {
        let _ = writeln!(
            prompt,
            "- Languages: {}",
            languages.into_iter().collect::<Vec<_>>().join(", ")
        );
    }
    let _ = writeln!(prompt, "- Commits: {}", history.commits.len());
    let _ = writeln!(prompt, "- Contributors: {}", history.authors.len());
    if !history.branches.is_empty() {
        let _ = writeln!(prompt, "- Branches: {}", history.branches.len());
    }
    if !history.tags.is_empty() {
        let _ = writeln!(prompt, "- Releases (tags): {}", history.tags.len());
    }
    if let (Some(first), Some(last)) = (
        history.first_commit_timestamp(),
        history.last_commit_timestamp(),
    ) {
        let _ = writeln!(
            prompt,
            "- Active from {} to {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        );
    }

    let _ = writeln!(prompt, "\n## Source files\n");
    for file in files.iter().take(OVERVIEW_FILE_LIMIT) {
        let _ = writeln!(prompt, "- {}{}", file.path, declared_names(file));
    }
    if files.len() > OVERVIEW_FILE_LIMIT {
        let _ = writeln!(
            prompt,
            "- ... and {} more files",
            files.len() - OVERVIEW_FILE_LIMIT
        );
    }

    if !history.is_empty() {
        let _ = writeln!(prompt, "\n## Recent commits\n");
        for commit in history.commits.iter().take(20) {
            let _ = writeln!(prompt, "- {}", commit.short_message);
        }
    }

    prompt
}

pub fn file(file: &FileStructure) -> String {
    let mut prompt = format!(
        "Document the {} source file `{}` in Markdown.\n\
         Explain what the file is responsible for, then describe each declared type: \
         its role, its important members and how it is meant to be used. \
         Do not repeat the source code.\n\nDeclared types:\n",
        file.language, file.path
    );
    for class in &file.classes {
        let _ = writeln!(prompt, "- {} {} (line {})", class.kind, class.name, class.line);
    }
    let _ = write!(
        prompt,
        "\nSource:\n\n```{}\n{}\n```\n",
        file.language.fence(),
        file.source.trim_end()
    );
    prompt
}

pub fn summary(project: &str, overview: &str, documented: &[&str], changelog: &str) -> String {
    let mut prompt = format!(
        "Write a short executive summary of the software project \"{project}\" in Markdown: \
         one paragraph on what it does, followed by a bullet list of its key capabilities \
         and a note on recent development activity.\n"
    );
    let _ = write!(prompt, "\n## Overview\n\n{}\n", overview.trim());
    if !documented.is_empty() {
        let _ = writeln!(prompt, "\n## Documented files\n");
        for path in documented {
            let _ = writeln!(prompt, "- {path}");
        }
    }
    let changelog: String = changelog.chars().take(SUMMARY_CHANGELOG_CHARS).collect();
    let _ = write!(prompt, "\n## Changelog excerpt\n\n{}\n", changelog.trim());
    prompt
}

fn declared_names(file: &FileStructure) -> String {
    if file.classes.is_empty() {
        return String::new();
    }
    let names: Vec<&str> = file.classes.iter().map(|c| c.name.as_str()).collect();
    format!(" ({})", names.join(", "))
}
