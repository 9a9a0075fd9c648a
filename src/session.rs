//! One dashboard session.
//!
//! A session owns the loaded records and a gateway, so every upstream
//! result it fetches is memoized for the lifetime of the session.

use crate::analysis;
use crate::config::Config;
use crate::dataset;
use crate::gateway::{AnalysisService, Gateway};
use crate::models::{
    Chart, Dashboard, DashboardMetadata, JoinedMatch, KeypointView, KpaParams, MentionIndex,
    Record,
};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{debug, warn};

/// Intermediate results of one pass, before charting.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub sentences_ranked: usize,
    pub matches_total: usize,
    /// Joined matches with the sentinel key-point removed.
    pub rows: Vec<JoinedMatch>,
    pub mentions: MentionIndex,
}

pub struct Session<S> {
    gateway: Gateway<S>,
    config: Config,
    records: Vec<Record>,
}

impl<S: AnalysisService> Session<S> {
    /// Load the configured dataset and start a session over it.
    pub fn open(gateway: Gateway<S>, config: Config) -> Result<Self> {
        let records = dataset::load(&config.dataset).with_context(|| {
            format!(
                "Failed to load dataset {}",
                config.dataset.path.display()
            )
        })?;

        Ok(Self {
            gateway,
            config,
            records,
        })
    }

    /// Run the upstream pipeline: rank, key-point analysis, join and linking.
    pub async fn analyze(&self) -> Result<Analysis> {
        let analysis_config = &self.config.analysis;

        let ranked = self
            .gateway
            .rank(&analysis_config.topic, &self.records, analysis_config.top_k)
            .await
            .context("Argument quality ranking failed")?;

        let ids: Vec<String> = ranked.iter().map(|s| s.record.id.clone()).collect();
        let texts: Vec<String> = ranked.iter().map(|s| s.record.text.clone()).collect();
        let params = KpaParams {
            mapping_threshold: analysis_config.mapping_threshold,
            n_top_kps: analysis_config.n_top_kps,
        };

        let result = self
            .gateway
            .analyze_keypoints(&analysis_config.domain, &ids, &texts, &params)
            .await
            .context("Key point analysis failed")?;

        let table = analysis::flatten(&result);
        if table.is_empty() {
            warn!("Key point analysis returned no matches");
        }

        let joined = analysis::join_records(&table, &self.records)
            .context("Failed to join matches with source records")?;
        let rows = analysis::drop_sentinel(joined, &analysis_config.sentinel_keypoint);
        debug!(
            "{} of {} matches assigned to a key point",
            rows.len(),
            table.len()
        );

        let mentions =
            analysis::build_mention_index(&self.gateway, &rows, &analysis_config.excluded_concepts)
                .await
                .context("Entity linking failed")?;

        let stats = self.gateway.cache().stats();
        debug!(
            "Cache: {} entries, {} hits, {} misses",
            stats.entries, stats.hits, stats.misses
        );

        Ok(Analysis {
            sentences_ranked: ranked.len(),
            matches_total: table.len(),
            rows,
            mentions,
        })
    }

    /// Run a full render pass, selecting `selection` or the most frequent key-point.
    pub async fn render(&self, selection: Option<&str>) -> Result<Dashboard> {
        let analysis = self.analyze().await?;
        let report = &self.config.report;

        let keypoints = analysis::keypoint_options(&analysis.rows);
        let selected = match selection {
            Some(name) => {
                if !keypoints.iter().any(|kp| kp == name) {
                    bail!(
                        "Unknown key point \"{}\". Valid options: {}",
                        name,
                        format_options(&keypoints)
                    );
                }
                Some(self.keypoint_view(&analysis, name))
            }
            None => keypoints
                .first()
                .map(|kp| self.keypoint_view(&analysis, kp)),
        };

        let cluster_sizes = Chart::counts(
            "Comparison of the size of each keypoint cluster",
            "Keypoint",
            "Size of cluster",
            &analysis::cluster_sizes(&analysis.rows),
        );
        let category_counts = Chart::counts(
            format!("Frequency of keypoints grouped by {}", report.category_label),
            report.category_label.as_str(),
            "Count",
            &analysis::category_counts(&analysis.rows),
        );

        let metadata = DashboardMetadata {
            title: report.title.clone(),
            topic: self.config.analysis.topic.clone(),
            generated_at: Utc::now(),
            dataset: self.config.dataset.path.display().to_string(),
            domain: self.config.analysis.domain.clone(),
            records_loaded: self.records.len(),
            sentences_ranked: analysis.sentences_ranked,
            matches_total: analysis.matches_total,
            matches_kept: analysis.rows.len(),
        };

        Ok(Dashboard {
            metadata,
            cluster_sizes,
            category_counts,
            keypoints,
            selected,
        })
    }

    fn keypoint_view(&self, analysis: &Analysis, keypoint: &str) -> KeypointView {
        let report = &self.config.report;

        KeypointView {
            keypoint: keypoint.to_string(),
            category_distribution: Chart::proportions(
                format!(
                    "Distribution of {} for: \"{}\"",
                    report.category_label, keypoint
                ),
                report.category_label.as_str(),
                "Distribution",
                analysis::category_distribution(&analysis.rows, keypoint),
            ),
            top_concepts: Chart::counts(
                format!(
                    "Top-{} Related {}s for: \"{}\"",
                    report.top_concepts, report.concept_label, keypoint
                ),
                report.concept_label.as_str(),
                "Number of Mentions",
                &analysis::top_concepts(&analysis.mentions, keypoint, report.top_concepts),
            ),
        }
    }
}

fn format_options(keypoints: &[String]) -> String {
    if keypoints.is_empty() {
        return "(none)".to_string();
    }
    keypoints
        .iter()
        .map(|kp| format!("\"{}\"", kp))
        .collect::<Vec<_>>()
        .join(", ")
}
