use anyhow::{bail, Context, Result};
use globset::Glob;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Configuration file structure for repodoc.
///
/// Every key is named and typed; unknown keys are rejected when the file is
/// parsed so that a typo never silently falls back to a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Generation backend connection and sampling settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Request batching and pacing
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Which parts of the project are documented
    #[serde(default)]
    pub project: ProjectConfig,

    /// Where documentation is written
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL of the Ollama-compatible backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier passed with every generation request
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature (0.0-2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Context window handed to the backend as `num_ctx`; also drives prompt truncation
    #[serde(default = "default_context_budget")]
    pub context_budget: u32,

    /// Wall-clock bound for a single generation request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Wall-clock bound for the readiness probe
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Attempts per submission before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed pause between failed attempts
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GenerationConfig {
    /// Files per batch when documenting files
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches
    #[serde(default = "default_batch_delay_secs")]
    pub batch_delay_secs: u64,

    /// Calendar months per changelog request when the repository has no tags
    #[serde(default = "default_months_per_chunk")]
    pub changelog_months_per_chunk: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectConfig {
    /// Only the first N analyzed files are documented
    pub max_files: Option<usize>,

    /// Only the N most recent tags get changelog sections
    pub max_tags: Option<usize>,

    /// Glob patterns (relative to the project root) skipped during analysis
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Generate the overview but skip per-file documentation
    #[serde(default)]
    pub overview_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct OutputConfig {
    /// Output directory for generated documentation
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

/// Values given on the command line; `Some`/non-empty fields win over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub batch_size: Option<usize>,
    pub batch_delay_secs: Option<u64>,
    pub max_files: Option<usize>,
    pub max_tags: Option<usize>,
    pub exclude: Vec<String>,
    pub overview_only: bool,
    pub output: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            context_budget: default_context_budget(),
            timeout_secs: default_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_secs: default_batch_delay_secs(),
            changelog_months_per_chunk: default_months_per_chunk(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_context_budget() -> u32 {
    8192
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_batch_size() -> usize {
    5
}

fn default_batch_delay_secs() -> u64 {
    2
}

fn default_months_per_chunk() -> usize {
    2
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("docs")
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl GenerationConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch_delay_secs)
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path (must exist)
    /// 2. ./repodoc.toml, ./repodoc.json, ./repodoc.yaml, ./repodoc.yml
    /// 3. `<user config dir>/repodoc/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["repodoc.toml", "repodoc.json", "repodoc.yaml", "repodoc.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(user_config) = dirs::config_dir().map(|d| d.join("repodoc").join("config.toml")) {
            if user_config.exists() {
                return Self::load_from_path(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        let config: Self = match extension {
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            _ => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
        };

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Applies command-line values on top of the loaded file.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.backend.base_url = base_url;
        }
        if let Some(model) = overrides.model {
            self.backend.model = model;
        }
        if let Some(temperature) = overrides.temperature {
            self.backend.temperature = temperature;
        }
        if let Some(batch_size) = overrides.batch_size {
            self.generation.batch_size = batch_size;
        }
        if let Some(batch_delay) = overrides.batch_delay_secs {
            self.generation.batch_delay_secs = batch_delay;
        }
        if overrides.max_files.is_some() {
            self.project.max_files = overrides.max_files;
        }
        if overrides.max_tags.is_some() {
            self.project.max_tags = overrides.max_tags;
        }
        if !overrides.exclude.is_empty() {
            self.project.exclude.extend(overrides.exclude);
        }
        if overrides.overview_only {
            self.project.overview_only = true;
        }
        if let Some(output) = overrides.output {
            self.output.dir = output;
        }
    }

    /// Rejects values that parse but cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.backend.base_url)
            .with_context(|| format!("Invalid backend base-url: {}", self.backend.base_url))?;
        // `host:port` parses with the host as its scheme.
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "backend.base-url must start with http:// or https://, got {}",
                self.backend.base_url
            );
        }

        if self.backend.model.trim().is_empty() {
            bail!("backend.model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.backend.temperature) {
            bail!(
                "backend.temperature must be between 0.0 and 2.0, got {}",
                self.backend.temperature
            );
        }
        if self.backend.context_budget < 64 {
            bail!(
                "backend.context-budget must be at least 64, got {}",
                self.backend.context_budget
            );
        }
        if self.backend.max_retries == 0 {
            bail!("backend.max-retries must be at least 1");
        }
        if self.generation.batch_size == 0 {
            bail!("generation.batch-size must be at least 1");
        }
        if self.generation.changelog_months_per_chunk == 0 {
            bail!("generation.changelog-months-per-chunk must be at least 1");
        }
        for pattern in &self.project.exclude {
            Glob::new(pattern).with_context(|| format!("Invalid exclude pattern: {pattern}"))?;
        }

        Ok(())
    }
}
