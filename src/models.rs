//! Data models for the dashboard.
//!
//! This module contains the records loaded from the dataset, the wire
//! shapes returned by the key-point analysis service, the flattened
//! match table, and the rendered dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the source dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// Identifier, normalized to text.
    pub id: String,
    /// Free-text description sent to the analysis service.
    pub text: String,
    /// Narrative identifier, normalized to text.
    pub narrative_id: String,
    /// Categorical label used for grouping.
    pub category: String,
    /// Remaining columns in header order.
    pub metadata: Vec<(String, String)>,
}

/// A record paired with its argument-quality score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSentence {
    pub record: Record,
    pub score: f64,
}

/// Run parameters for a key-point analysis job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpaParams {
    /// Minimum match score for a sentence to be mapped to a key-point.
    pub mapping_threshold: f64,
    /// Number of key-points to extract.
    pub n_top_kps: usize,
}

/// Result bundle of a finished key-point analysis job.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KpaResult {
    pub keypoint_matchings: Vec<KeyPointMatching>,
}

impl KpaResult {
    /// Total number of matches across all key-points.
    pub fn match_count(&self) -> usize {
        self.keypoint_matchings.iter().map(|kp| kp.matching.len()).sum()
    }
}

/// All sentences matched to one key-point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPointMatching {
    pub keypoint: String,
    pub matching: Vec<MatchEntry>,
}

/// One sentence matched to a key-point, as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEntry {
    pub sentence_text: String,
    pub score: f64,
    pub comment_id: String,
    pub sentence_id: u64,
    pub sents_in_comment: u64,
    pub span_start: u64,
    pub span_end: u64,
    pub num_tokens: u64,
    pub argument_quality: f64,
    pub kp_quality: f64,
}

/// One row of the flattened match table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPointMatch {
    pub keypoint: String,
    pub sentence_text: String,
    pub match_score: f64,
    pub comment_id: String,
    pub sentence_id: u64,
    pub sents_in_comment: u64,
    pub span_start: u64,
    pub span_end: u64,
    pub num_tokens: u64,
    pub argument_quality: f64,
    pub keypoint_quality: f64,
}

/// Flattened key-point matches, one row per match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchTable {
    pub rows: Vec<KeyPointMatch>,
}

impl MatchTable {
    /// Column names, in row field order.
    pub const COLUMNS: [&'static str; 11] = [
        "kp",
        "sentence_text",
        "match_score",
        "comment_id",
        "sentence_id",
        "sents_in_comment",
        "span_start",
        "span_end",
        "num_tokens",
        "argument_quality",
        "keypoint_quality",
    ];

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A match joined with the metadata of its source record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedMatch {
    #[serde(flatten)]
    pub matched: KeyPointMatch,
    pub narrative_id: String,
    pub category: String,
}

/// Key-point to concept-title mention counts.
pub type MentionIndex = BTreeMap<String, BTreeMap<String, usize>>;

/// Whether a chart value is an absolute count or a proportion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Count,
    Proportion,
}

/// A horizontal bar chart ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub title: String,
    /// Label of the category axis.
    pub label_axis: String,
    /// Label of the value axis.
    pub value_axis: String,
    pub kind: ValueKind,
    pub bars: Vec<(String, f64)>,
}

impl Chart {
    pub fn counts(
        title: impl Into<String>,
        label_axis: impl Into<String>,
        value_axis: impl Into<String>,
        bars: &[(String, usize)],
    ) -> Self {
        Self {
            title: title.into(),
            label_axis: label_axis.into(),
            value_axis: value_axis.into(),
            kind: ValueKind::Count,
            bars: bars
                .iter()
                .map(|(label, count)| (label.clone(), *count as f64))
                .collect(),
        }
    }

    pub fn proportions(
        title: impl Into<String>,
        label_axis: impl Into<String>,
        value_axis: impl Into<String>,
        bars: Vec<(String, f64)>,
    ) -> Self {
        Self {
            title: title.into(),
            label_axis: label_axis.into(),
            value_axis: value_axis.into(),
            kind: ValueKind::Proportion,
            bars,
        }
    }
}

/// Charts that depend on the selected key-point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeypointView {
    pub keypoint: String,
    pub category_distribution: Chart,
    pub top_concepts: Chart,
}

/// Metadata about one render pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetadata {
    pub title: String,
    pub topic: String,
    pub generated_at: DateTime<Utc>,
    pub dataset: String,
    pub domain: String,
    pub records_loaded: usize,
    pub sentences_ranked: usize,
    pub matches_total: usize,
    pub matches_kept: usize,
}

/// The complete dashboard produced by one render pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub metadata: DashboardMetadata,
    pub cluster_sizes: Chart,
    pub category_counts: Chart,
    /// Selector options, most frequent key-point first.
    pub keypoints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<KeypointView>,
}
