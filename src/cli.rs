use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use crate::backend::{BatchPlan, GenerationParams, OllamaClient, RequestOrchestrator, RetryPolicy};
use crate::changelog::ChangelogOptions;
use crate::config::{Config, ConfigOverrides};
use crate::history::{GitCli, HistoryProvider};
use crate::output::{print_summary, ConsoleReporter, MarkdownWriter};
use crate::pipeline::{DocumentationPipeline, PipelineOptions};
use crate::structure::SourceScanner;

#[derive(Parser)]
#[command(name = "repodoc")]
#[command(
    author,
    version,
    about = "Repository documentation and changelog generator",
    long_about = None
)]
pub struct Cli {
    /// Project directory to document
    project: Option<PathBuf>,

    /// Output directory [default: docs]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Model used for generation [default: llama3.1]
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature (0.0-2.0) [default: 0.2]
    #[arg(short, long)]
    temperature: Option<f64>,

    /// Backend base URL [default: http://localhost:11434]
    #[arg(short, long, env = "OLLAMA_HOST")]
    url: Option<String>,

    /// Files per batch [default: 5]
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Seconds to pause between batches [default: 2]
    #[arg(long)]
    batch_delay: Option<u64>,

    /// Only document the first N files
    #[arg(long)]
    max_files: Option<usize>,

    /// Only the N most recent tags get changelog sections
    #[arg(long)]
    max_tags: Option<usize>,

    /// Glob pattern to skip during analysis (repeatable)
    #[arg(short, long = "exclude")]
    exclude: Vec<String>,

    /// Generate the overview, changelog and summary but no per-file docs
    #[arg(long, default_value_t = false)]
    overview_only: bool,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.url.as_deref().map(normalize_host),
            model: self.model.clone(),
            temperature: self.temperature,
            batch_size: self.batch_size,
            batch_delay_secs: self.batch_delay,
            max_files: self.max_files,
            max_tags: self.max_tags,
            exclude: self.exclude.clone(),
            overview_only: self.overview_only,
            output: self.output.clone(),
        }
    }

    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        config.apply_overrides(self.overrides());
        config
            .validate()
            .context("Invalid configuration after applying command-line options")?;
        Ok(config)
    }

    pub async fn execute(&self) -> Result<()> {
        let Some(project) = &self.project else {
            bail!("No project directory given");
        };
        if !project.is_dir() {
            bail!("Project directory {} does not exist", project.display());
        }

        let config = self.load_config()?;
        info!(
            "Documenting {} with {} at {}",
            project.display(),
            config.backend.model,
            config.backend.base_url
        );

        let reporter = ConsoleReporter::new();

        let client = OllamaClient::new(
            &config.backend.base_url,
            &config.backend.model,
            config.backend.timeout(),
            config.backend.probe_timeout(),
        )?;
        client.initialize(&reporter).await;

        let orchestrator = RequestOrchestrator::new(
            client,
            GenerationParams {
                temperature: config.backend.temperature,
                context_budget: config.backend.context_budget,
            },
            RetryPolicy {
                max_retries: config.backend.max_retries,
                delay: config.backend.retry_delay(),
            },
        );

        let options = PipelineOptions {
            model: config.backend.model.clone(),
            max_files: config.project.max_files,
            overview_only: config.project.overview_only,
            batch: BatchPlan {
                size: config.generation.batch_size,
                delay: config.generation.batch_delay(),
            },
            changelog: ChangelogOptions {
                max_tags: config.project.max_tags,
                months_per_chunk: config.generation.changelog_months_per_chunk,
                chunk_delay: config.generation.batch_delay(),
            },
        };

        let pipeline = DocumentationPipeline::new(
            SourceScanner::new(&config.project.exclude)?,
            HistoryProvider::new(GitCli::new(), project),
            orchestrator,
            MarkdownWriter::new(&config.output.dir),
            options,
        );

        let metadata = pipeline.run(project, &reporter).await?;
        print_summary(&metadata, pipeline.writer().dir());

        Ok(())
    }
}

/// `OLLAMA_HOST` is commonly set as `host:port` without a scheme.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
