//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// kpdash - key-point analysis dashboard
///
/// Ranks a text dataset against a topic, extracts key-points from the
/// top sentences, links them to Wikipedia concepts and renders the
/// results as Markdown or JSON charts.
///
/// Examples:
///   kpdash --data ./data/transcripts.csv
///   kpdash --keypoint "The stent was placed successfully."
///   kpdash --interactive
///   kpdash --format json --output dashboard.json
///   kpdash --dry-run
///   kpdash --init-config
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the delimited dataset
    #[arg(short, long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Topic to rank sentences against
    #[arg(short, long, value_name = "TEXT")]
    pub topic: Option<String>,

    /// Number of top-ranked sentences sent to key-point analysis
    #[arg(long, value_name = "COUNT")]
    pub top_k: Option<usize>,

    /// Remote namespace for the key-point analysis run
    #[arg(long, value_name = "NAME")]
    pub domain: Option<String>,

    /// Minimum match score for mapping a sentence to a key-point (0.0 - 1.0)
    #[arg(long, value_name = "SCORE")]
    pub mapping_threshold: Option<f64>,

    /// Number of key-points to extract
    #[arg(long, value_name = "COUNT")]
    pub n_top_kps: Option<usize>,

    /// Key-point to show distribution and concept charts for
    ///
    /// Defaults to the most frequent key-point.
    #[arg(short, long, value_name = "KEYPOINT")]
    pub keypoint: Option<String>,

    /// Number of linked concepts to chart for the selected key-point
    #[arg(long, value_name = "COUNT")]
    pub top_concepts: Option<usize>,

    /// Pick key-points from stdin and re-render after each pick
    #[arg(short, long)]
    pub interactive: bool,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the dashboard to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also export the joined match table as CSV
    #[arg(long, value_name = "FILE")]
    pub export_matches: Option<PathBuf>,

    /// Analysis service API key
    #[arg(long, env = "DEBATER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .kpdash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load the dataset and report what would be sent, without
    /// calling the analysis service
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .kpdash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown with text bar charts (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(threshold) = self.mapping_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err("Mapping threshold must be between 0.0 and 1.0".to_string());
            }
        }

        if self.top_k == Some(0) {
            return Err("Top-k must be at least 1".to_string());
        }

        if self.n_top_kps == Some(0) {
            return Err("Number of key-points must be at least 1".to_string());
        }

        if self.top_concepts == Some(0) {
            return Err("Top concepts must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.interactive && self.output.is_some() {
            return Err("Cannot use --output with --interactive".to_string());
        }

        if self.interactive && self.format == OutputFormat::Json {
            return Err("Interactive mode renders Markdown only".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref data) = self.data {
            if !data.is_file() {
                return Err(format!("Dataset file does not exist: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose_by_default` comes from the config file; `--quiet` wins over it.
    pub fn log_level(&self, verbose_by_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_by_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let args = Args::try_parse_from(["kpdash"]).unwrap();
        assert_eq!(args.format, OutputFormat::Markdown);
        assert!(args.keypoint.is_none());
        assert!(!args.interactive);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_overrides() {
        let args = Args::try_parse_from([
            "kpdash",
            "--topic",
            "Stenting is effective",
            "--top-k",
            "50",
            "--mapping-threshold",
            "0.9",
            "--keypoint",
            "kp1",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.topic.as_deref(), Some("Stenting is effective"));
        assert_eq!(args.top_k, Some(50));
        assert_eq!(args.mapping_threshold, Some(0.9));
        assert_eq!(args.keypoint.as_deref(), Some("kp1"));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_validation_threshold_range() {
        let args = Args {
            mapping_threshold: Some(1.5),
            ..Args::default()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_top_k() {
        let args = Args {
            top_k: Some(0),
            ..Args::default()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = Args {
            verbose: true,
            quiet: true,
            ..Args::default()
        };
        assert!(args.validate().is_err());

        let args = Args {
            interactive: true,
            output: Some(PathBuf::from("out.md")),
            ..Args::default()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_dataset() {
        let args = Args {
            data: Some(PathBuf::from("/nonexistent/kpdash/data.csv")),
            ..Args::default()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = Args::default();
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
