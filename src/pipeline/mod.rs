mod prompts;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use std::path::Path;
use std::time::Instant;

use crate::backend::{BatchPlan, Generation, GenerationBackend, RequestOrchestrator};
use crate::changelog::{ChangelogOptions, ChangelogSynthesizer};
use crate::history::{GitRunner, HistoryProvider};
use crate::output::{Documentation, OutputWriter, Reporter, RunMetadata};
use crate::structure::{FileStructure, StructureProvider};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Recorded in run metadata
    pub model: String,
    /// Keep only the first N analyzed files
    pub max_files: Option<usize>,
    /// Skip per-file documentation
    pub overview_only: bool,
    pub batch: BatchPlan,
    pub changelog: ChangelogOptions,
}

/// Runs every stage of a documentation run in order and hands the result
/// to the writer.
pub struct DocumentationPipeline<S, G, B, W>
where
    S: StructureProvider,
    G: GitRunner,
    B: GenerationBackend,
    W: OutputWriter,
{
    structure: S,
    history: HistoryProvider<G>,
    orchestrator: RequestOrchestrator<B>,
    writer: W,
    options: PipelineOptions,
}

impl<S, G, B, W> DocumentationPipeline<S, G, B, W>
where
    S: StructureProvider,
    G: GitRunner,
    B: GenerationBackend,
    W: OutputWriter,
{
    pub fn new(
        structure: S,
        history: HistoryProvider<G>,
        orchestrator: RequestOrchestrator<B>,
        writer: W,
        options: PipelineOptions,
    ) -> Self {
        Self {
            structure,
            history,
            orchestrator,
            writer,
            options,
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn orchestrator(&self) -> &RequestOrchestrator<B> {
        &self.orchestrator
    }

    /// Documents the project at `root`.
    ///
    /// The backend is released however the run ends. An unusable output
    /// destination aborts before any generation. When a later stage fails,
    /// whatever was produced before it is still written, then the error is
    /// returned.
    pub async fn run(&self, root: &Path, reporter: &dyn Reporter) -> Result<RunMetadata> {
        if let Err(e) = self.writer.prepare() {
            self.orchestrator.release().await;
            reporter.finish();
            return Err(anyhow::Error::from(e).context("Failed to prepare the output directory"));
        }

        let clock = Instant::now();
        let mut docs = Documentation::default();
        docs.metadata.project = project_name(root);
        docs.metadata.model = self.options.model.clone();
        docs.metadata.started_at = Utc::now();

        let outcome = self.generate(root, reporter, &mut docs).await;

        self.orchestrator.release().await;
        docs.metadata.finished_at = Utc::now();
        docs.metadata.duration_secs = clock.elapsed().as_secs_f64();

        match outcome {
            Ok(()) => {
                reporter.stage("Writing documentation");
                let written = self
                    .writer
                    .write(&docs)
                    .context("Failed to write documentation");
                reporter.finish();
                written?;
                info!(
                    "Documented {} in {:.1}s",
                    docs.metadata.project, docs.metadata.duration_secs
                );
                Ok(docs.metadata)
            }
            Err(e) => {
                if let Err(write_err) = self.writer.write(&docs) {
                    warn!("Failed to write partial documentation: {write_err}");
                }
                reporter.finish();
                Err(e)
            }
        }
    }

    async fn generate(
        &self,
        root: &Path,
        reporter: &dyn Reporter,
        docs: &mut Documentation,
    ) -> Result<()> {
        reporter.stage("Analyzing code structure");
        let mut files = self
            .structure
            .analyze(root)
            .with_context(|| format!("Failed to analyze {}", root.display()))?;
        if let Some(max) = self.options.max_files {
            if files.len() > max {
                info!("Limiting documentation to {max} of {} files", files.len());
                files.truncate(max);
            }
        }
        docs.metadata.files_analyzed = files.len();

        reporter.stage("Reading git history");
        let history = self.history.fetch(reporter).await;
        docs.metadata.commits = history.commits.len();
        docs.metadata.tags = history.tags.len();
        docs.metadata.authors = history.authors.len();

        reporter.stage("Generating overview");
        let overview = self
            .orchestrator
            .submit(&prompts::overview(&docs.metadata.project, &files, &history))
            .await;
        if !overview.is_success() {
            reporter.warn(&format!("Overview: {overview}"));
        }
        let overview_text = overview.text().unwrap_or_default().to_string();
        docs.overview = Some(overview.into_text());

        if self.options.overview_only {
            info!("Overview-only run; skipping per-file documentation");
        } else {
            reporter.stage("Documenting files");
            self.document_files(&files, reporter, docs).await;
        }

        reporter.stage("Synthesizing changelog");
        let synthesizer =
            ChangelogSynthesizer::new(&self.history, &self.orchestrator, self.options.changelog);
        let changelog = synthesizer.synthesize(&history, reporter).await;

        reporter.stage("Generating summary");
        let documented: Vec<&str> = docs
            .files
            .keys()
            .map(String::as_str)
            .filter(|path| !docs.metadata.failed_files.iter().any(|f| f.as_str() == *path))
            .collect();
        let summary = self
            .orchestrator
            .submit(&prompts::summary(
                &docs.metadata.project,
                &overview_text,
                &documented,
                &changelog,
            ))
            .await;
        if !summary.is_success() {
            reporter.warn(&format!("Summary: {summary}"));
        }

        docs.changelog = Some(changelog);
        docs.summary = Some(summary.into_text());
        Ok(())
    }

    async fn document_files(
        &self,
        files: &[FileStructure],
        reporter: &dyn Reporter,
        docs: &mut Documentation,
    ) {
        let documentable: Vec<&FileStructure> = files.iter().filter(|f| f.has_classes()).collect();
        info!(
            "Documenting {} of {} files (files without type declarations are skipped)",
            documentable.len(),
            files.len()
        );

        let results = self
            .orchestrator
            .submit_batch(
                &documentable,
                |file| file.path.clone(),
                |file| prompts::file(file),
                self.options.batch,
                reporter,
            )
            .await;

        for (path, generation) in results {
            match &generation {
                Generation::Success(_) => docs.metadata.files_documented += 1,
                Generation::Failure { .. } => docs.metadata.failed_files.push(path.clone()),
            }
            docs.files.insert(path, generation.into_text());
        }
    }
}

fn project_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| root.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::backend::{AttemptFailure, FailureKind, GenerationParams, RetryPolicy};
    use crate::history::fake::FakeGit;
    use crate::output::recording::RecordingReporter;
    use crate::output::writer::recording::RecordingWriter;
    use crate::output::MarkdownWriter;
    use crate::structure::fake::FakeStructure;
    use crate::structure::{ClassInfo, Language};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    type TestPipeline = DocumentationPipeline<FakeStructure, FakeGit, FakeBackend, RecordingWriter>;

    const LOG: &str = "log --pretty=format:%H%x1f%an%x1f%ad%x1f%s%x1f%b%x1e --date=iso --no-merges";

    fn source_file(path: &str, class: Option<&str>) -> FileStructure {
        FileStructure {
            path: path.to_string(),
            language: Language::Rust,
            classes: class
                .map(|name| ClassInfo {
                    name: name.to_string(),
                    kind: "struct".to_string(),
                    line: 1,
                })
                .into_iter()
                .collect(),
            source: class.map(|c| format!("struct {c};\n")).unwrap_or_default(),
        }
    }

    fn repo_git() -> FakeGit {
        FakeGit::default()
            .with("rev-parse --is-inside-work-tree", "true\n")
            .with(
                LOG,
                "abcdef1234\u{1f}Ana\u{1f}2024-03-02 10:00:00 +0000\u{1f}Add parser\u{1f}\u{1e}\n",
            )
            .with("branch --list --no-color", "* main\n")
            .with("tag -l", "")
    }

    fn options() -> PipelineOptions {
        PipelineOptions {
            model: "llama3.1".to_string(),
            max_files: None,
            overview_only: false,
            batch: BatchPlan {
                size: 5,
                delay: Duration::ZERO,
            },
            changelog: ChangelogOptions::default(),
        }
    }

    fn pipeline(
        structure: FakeStructure,
        git: FakeGit,
        backend: FakeBackend,
        writer: RecordingWriter,
        options: PipelineOptions,
    ) -> TestPipeline {
        let orchestrator = RequestOrchestrator::new(
            backend,
            GenerationParams {
                temperature: 0.2,
                context_budget: 8192,
            },
            RetryPolicy {
                max_retries: 1,
                delay: Duration::ZERO,
            },
        );
        DocumentationPipeline::new(
            structure,
            HistoryProvider::new(git, "."),
            orchestrator,
            writer,
            options,
        )
    }

    fn two_files() -> FakeStructure {
        FakeStructure {
            files: vec![
                source_file("src/main.rs", None),
                source_file("src/parser.rs", Some("Parser")),
            ],
            fail: false,
        }
    }

    #[tokio::test]
    async fn test_full_run_stages_and_output() {
        let pipeline = pipeline(
            two_files(),
            repo_git(),
            FakeBackend::ready(),
            RecordingWriter::default(),
            options(),
        );
        let reporter = RecordingReporter::default();

        let metadata = pipeline.run(Path::new("."), &reporter).await.unwrap();

        assert_eq!(
            reporter.stages(),
            vec![
                "Analyzing code structure",
                "Reading git history",
                "Generating overview",
                "Documenting files",
                "Synthesizing changelog",
                "Generating summary",
                "Writing documentation",
            ]
        );

        let prompts = pipeline.orchestrator().backend().prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[0].contains("Write an overview"));
        assert!(prompts[1].contains("`src/parser.rs`"));
        assert!(prompts[2].contains("Month: 2024-03"));
        assert!(prompts[3].contains("executive summary"));

        let docs = pipeline.writer().last().unwrap();
        assert_eq!(docs.overview.as_deref(), Some("generated #1"));
        assert_eq!(docs.files.keys().collect::<Vec<_>>(), vec!["src/parser.rs"]);
        assert_eq!(docs.summary.as_deref(), Some("generated #4"));
        assert!(docs.changelog.unwrap().starts_with("# Changelog"));

        assert_eq!(metadata.files_analyzed, 2);
        assert_eq!(metadata.files_documented, 1);
        assert_eq!(metadata.commits, 1);
        assert_eq!(metadata.authors, 1);
        assert_eq!(metadata.model, "llama3.1");
        assert!(metadata.finished_at >= metadata.started_at);
        assert_eq!(
            pipeline
                .orchestrator()
                .backend()
                .releases
                .load(Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn test_overview_only_skips_files() {
        let pipeline = pipeline(
            two_files(),
            FakeGit::default(),
            FakeBackend::ready(),
            RecordingWriter::default(),
            PipelineOptions {
                overview_only: true,
                ..options()
            },
        );
        let reporter = RecordingReporter::default();

        pipeline.run(Path::new("."), &reporter).await.unwrap();

        assert!(!reporter.stages().iter().any(|s| s == "Documenting files"));
        // Overview and summary; an empty history needs no changelog request.
        assert_eq!(pipeline.orchestrator().backend().prompts().len(), 2);
        assert!(pipeline.writer().last().unwrap().files.is_empty());
        assert!(reporter.warnings()[0].contains("not a git repository"));
    }

    #[tokio::test]
    async fn test_failed_file_is_recorded_in_place() {
        let backend = FakeBackend::ready()
            .then(Ok("Overview"))
            .then(Err(AttemptFailure::new(FailureKind::Protocol, "HTTP 500: boom")));
        let pipeline = pipeline(
            two_files(),
            FakeGit::default(),
            backend,
            RecordingWriter::default(),
            options(),
        );
        let reporter = RecordingReporter::default();

        let metadata = pipeline.run(Path::new("."), &reporter).await.unwrap();

        let docs = pipeline.writer().last().unwrap();
        assert_eq!(
            docs.files["src/parser.rs"],
            "Error: generation failed after 1 attempts (protocol): HTTP 500: boom"
        );
        assert_eq!(metadata.files_documented, 0);
        assert_eq!(metadata.failed_files, vec!["src/parser.rs"]);
        assert!(!pipeline.orchestrator().backend().prompts()[2].contains("- src/parser.rs"));
    }

    #[tokio::test]
    async fn test_max_files_caps_in_order() {
        let structure = FakeStructure {
            files: vec![
                source_file("a.rs", Some("A")),
                source_file("b.rs", Some("B")),
                source_file("c.rs", Some("C")),
            ],
            fail: false,
        };
        let pipeline = pipeline(
            structure,
            FakeGit::default(),
            FakeBackend::ready(),
            RecordingWriter::default(),
            PipelineOptions {
                max_files: Some(2),
                ..options()
            },
        );

        let metadata = pipeline
            .run(Path::new("."), &RecordingReporter::default())
            .await
            .unwrap();

        let docs = pipeline.writer().last().unwrap();
        assert_eq!(docs.files.keys().collect::<Vec<_>>(), vec!["a.rs", "b.rs"]);
        assert_eq!(metadata.files_analyzed, 2);
    }

    #[tokio::test]
    async fn test_structure_failure_releases_backend_and_writes_partial() {
        let pipeline = pipeline(
            FakeStructure::failing(),
            FakeGit::default(),
            FakeBackend::ready(),
            RecordingWriter::default(),
            options(),
        );

        let err = pipeline
            .run(Path::new("."), &RecordingReporter::default())
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("parser exploded"));
        let backend = pipeline.orchestrator().backend();
        assert_eq!(backend.releases.load(Ordering::SeqCst), 1);
        assert!(backend.prompts().is_empty());
        let partial = pipeline.writer().last().unwrap();
        assert!(partial.overview.is_none());
        assert!(partial.changelog.is_none());
    }

    #[tokio::test]
    async fn test_unwritable_output_aborts_before_generation() {
        let pipeline = pipeline(
            two_files(),
            repo_git(),
            FakeBackend::ready(),
            RecordingWriter::unwritable(),
            options(),
        );
        let reporter = RecordingReporter::default();

        let err = pipeline.run(Path::new("."), &reporter).await.unwrap_err();

        assert!(format!("{err:#}").contains("read-only file system"));
        let backend = pipeline.orchestrator().backend();
        assert!(backend.prompts().is_empty());
        assert_eq!(backend.releases.load(Ordering::SeqCst), 1);
        assert!(reporter.stages().is_empty());
        assert!(pipeline.writer().last().is_none());
    }

    #[tokio::test]
    async fn test_uncreatable_output_directory_issues_no_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();
        let orchestrator = RequestOrchestrator::new(
            FakeBackend::ready(),
            GenerationParams {
                temperature: 0.2,
                context_budget: 8192,
            },
            RetryPolicy {
                max_retries: 1,
                delay: Duration::ZERO,
            },
        );
        let pipeline = DocumentationPipeline::new(
            two_files(),
            HistoryProvider::new(repo_git(), "."),
            orchestrator,
            MarkdownWriter::new(blocker.join("docs")),
            options(),
        );

        let err = pipeline
            .run(Path::new("."), &RecordingReporter::default())
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("cannot create"));
        assert!(pipeline.orchestrator().backend().prompts().is_empty());
    }

    #[tokio::test]
    async fn test_writer_failure_propagates_after_release() {
        let pipeline = pipeline(
            two_files(),
            FakeGit::default(),
            FakeBackend::ready(),
            RecordingWriter::failing(),
            options(),
        );

        let err = pipeline
            .run(Path::new("."), &RecordingReporter::default())
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("disk full"));
        assert_eq!(
            pipeline
                .orchestrator()
                .backend()
                .releases
                .load(Ordering::SeqCst),
            1
        );
    }
}
