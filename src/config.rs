//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.kpdash.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".kpdash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Analysis service settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Dataset settings.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Analysis pipeline settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Show spinners while waiting on the service.
    #[serde(default = "default_true")]
    pub progress: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            progress: default_true(),
        }
    }
}

/// Analysis service endpoints and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key. Prefer the DEBATER_API_KEY environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Argument quality service base URL.
    #[serde(default = "default_arg_quality_url")]
    pub arg_quality_url: String,

    /// Key-point analysis service base URL.
    #[serde(default = "default_keypoints_url")]
    pub keypoints_url: String,

    /// Term wikifier service base URL.
    #[serde(default = "default_term_wikifier_url")]
    pub term_wikifier_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            arg_quality_url: default_arg_quality_url(),
            keypoints_url: default_keypoints_url(),
            term_wikifier_url: default_term_wikifier_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_arg_quality_url() -> String {
    "https://arg-quality.debater.res.ibm.com".to_string()
}

fn default_keypoints_url() -> String {
    "https://keypoint-matching-backend.debater.res.ibm.com".to_string()
}

fn default_term_wikifier_url() -> String {
    "https://tw.debater.res.ibm.com".to_string()
}

fn default_timeout() -> u64 {
    300
}

/// Source dataset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Path to the delimited dataset.
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,

    /// Field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Identifier column.
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Free-text column sent for analysis.
    #[serde(default = "default_text_column")]
    pub text_column: String,

    /// Narrative identifier column.
    #[serde(default = "default_narrative_column")]
    pub narrative_column: String,

    /// Categorical label column.
    #[serde(default = "default_category_column")]
    pub category_column: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
            delimiter: default_delimiter(),
            id_column: default_id_column(),
            text_column: default_text_column(),
            narrative_column: default_narrative_column(),
            category_column: default_category_column(),
        }
    }
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("./data/mtsamples_descriptions_clean.csv")
}

fn default_delimiter() -> char {
    ','
}

fn default_id_column() -> String {
    "id".to_string()
}

fn default_text_column() -> String {
    "text".to_string()
}

fn default_narrative_column() -> String {
    "id_description".to_string()
}

fn default_category_column() -> String {
    "medical_specialty_new".to_string()
}

/// Ranking, key-point analysis and entity linking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Topic the sentences are ranked against.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Number of top-ranked sentences sent to key-point analysis.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Remote namespace for the key-point analysis run.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Minimum match score for mapping a sentence to a key-point.
    #[serde(default = "default_mapping_threshold")]
    pub mapping_threshold: f64,

    /// Number of key-points to extract.
    #[serde(default = "default_n_top_kps")]
    pub n_top_kps: usize,

    /// Seconds between job status polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Key-point label the service uses for unmatched sentences.
    #[serde(default = "default_sentinel")]
    pub sentinel_keypoint: String,

    /// Concept titles never counted as mentions.
    #[serde(default = "default_excluded_concepts")]
    pub excluded_concepts: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            top_k: default_top_k(),
            domain: default_domain(),
            mapping_threshold: default_mapping_threshold(),
            n_top_kps: default_n_top_kps(),
            poll_interval_secs: default_poll_interval(),
            sentinel_keypoint: default_sentinel(),
            excluded_concepts: default_excluded_concepts(),
        }
    }
}

impl AnalysisConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_topic() -> String {
    "Left heart catheterization, left ventriculography, coronary angiography, and successful \
     stenting of tight lesion in the distal circumflex and moderately tight lesion in the \
     mid-right coronary artery."
        .to_string()
}

fn default_top_k() -> usize {
    500
}

fn default_domain() -> String {
    "medical_demo".to_string()
}

fn default_mapping_threshold() -> f64 {
    0.98
}

fn default_n_top_kps() -> usize {
    5
}

fn default_poll_interval() -> u64 {
    5
}

fn default_sentinel() -> String {
    "none".to_string()
}

fn default_excluded_concepts() -> Vec<String> {
    vec!["History".to_string()]
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Dashboard title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Display name of the category column.
    #[serde(default = "default_category_label")]
    pub category_label: String,

    /// Display name of linked concepts.
    #[serde(default = "default_concept_label")]
    pub concept_label: String,

    /// Number of concepts in the top-concepts chart.
    #[serde(default = "default_top_concepts")]
    pub top_concepts: usize,

    /// Width of the longest bar, in characters.
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            category_label: default_category_label(),
            concept_label: default_concept_label(),
            top_concepts: default_top_concepts(),
            bar_width: default_bar_width(),
        }
    }
}

fn default_title() -> String {
    "NLP Entity Linking for Medical Transcripts".to_string()
}

fn default_category_label() -> String {
    "Medical Specialty".to_string()
}

fn default_concept_label() -> String {
    "Wikipedia Term".to_string()
}

fn default_top_concepts() -> usize {
    10
}

fn default_bar_width() -> usize {
    40
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when the CLI provides an explicit value.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref key) = args.api_key {
            self.api.api_key = Some(key.clone());
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }

        if let Some(ref path) = args.data {
            self.dataset.path = path.clone();
        }

        if let Some(ref topic) = args.topic {
            self.analysis.topic = topic.clone();
        }
        if let Some(top_k) = args.top_k {
            self.analysis.top_k = top_k;
        }
        if let Some(ref domain) = args.domain {
            self.analysis.domain = domain.clone();
        }
        if let Some(threshold) = args.mapping_threshold {
            self.analysis.mapping_threshold = threshold;
        }
        if let Some(n) = args.n_top_kps {
            self.analysis.n_top_kps = n;
        }

        if let Some(n) = args.top_concepts {
            self.report.top_concepts = n;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
        if args.quiet {
            self.general.progress = false;
        }
    }

    /// Check values that would make the run misbehave against the service.
    ///
    /// Call after [`Config::merge_with_args`], so file and CLI values are both covered.
    pub fn validate(&self) -> Result<()> {
        if self.api.timeout_seconds == 0 {
            bail!("api.timeout_seconds must be at least 1");
        }
        if self.analysis.poll_interval_secs == 0 {
            bail!("analysis.poll_interval_secs must be at least 1");
        }
        if self.analysis.top_k == 0 {
            bail!("analysis.top_k must be at least 1");
        }
        if self.analysis.n_top_kps == 0 {
            bail!("analysis.n_top_kps must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.analysis.mapping_threshold) {
            bail!(
                "analysis.mapping_threshold must be between 0.0 and 1.0, got {}",
                self.analysis.mapping_threshold
            );
        }
        if self.analysis.domain.trim().is_empty() {
            bail!("analysis.domain must not be empty");
        }
        if self.report.top_concepts == 0 {
            bail!("report.top_concepts must be at least 1");
        }
        if self.report.bar_width == 0 {
            bail!("report.bar_width must be at least 1");
        }
        Ok(())
    }

    /// The API key, if one is configured and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
