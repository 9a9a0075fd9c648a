//! Joining and aggregation of key-point matches.
//!
//! This module joins flattened matches back to their source records and
//! computes the counts and distributions the dashboard charts.

use crate::models::{JoinedMatch, MatchTable, Record};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Cardinality violations of the match-to-record join.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("no record has id '{comment_id}'")]
    UnknownSource { comment_id: String },

    #[error("{count} records share id '{comment_id}'")]
    AmbiguousSource { comment_id: String, count: usize },

    #[error("comment '{comment_id}' is matched more than once")]
    DuplicateMatch { comment_id: String },
}

/// Join every match to the record whose id equals its comment id.
///
/// The join is strictly one-to-one: each comment id must appear in exactly
/// one table row and identify exactly one record.
pub fn join_records(table: &MatchTable, records: &[Record]) -> Result<Vec<JoinedMatch>, JoinError> {
    let mut by_id: HashMap<&str, Vec<&Record>> = HashMap::new();
    for record in records {
        by_id.entry(record.id.as_str()).or_default().push(record);
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(table.len());
    let mut joined = Vec::with_capacity(table.len());

    for row in &table.rows {
        if !seen.insert(row.comment_id.as_str()) {
            return Err(JoinError::DuplicateMatch {
                comment_id: row.comment_id.clone(),
            });
        }

        let record = match by_id.get(row.comment_id.as_str()).map(Vec::as_slice) {
            Some([record]) => *record,
            Some(many) if !many.is_empty() => {
                return Err(JoinError::AmbiguousSource {
                    comment_id: row.comment_id.clone(),
                    count: many.len(),
                })
            }
            _ => {
                return Err(JoinError::UnknownSource {
                    comment_id: row.comment_id.clone(),
                })
            }
        };

        joined.push(JoinedMatch {
            matched: row.clone(),
            narrative_id: record.narrative_id.clone(),
            category: record.category.clone(),
        });
    }

    Ok(joined)
}

/// Remove matches assigned to the sentinel key-point.
pub fn drop_sentinel(rows: Vec<JoinedMatch>, sentinel: &str) -> Vec<JoinedMatch> {
    rows.into_iter()
        .filter(|row| row.matched.keypoint != sentinel)
        .collect()
}

/// Count values, keeping the order in which each value first appears.
pub fn counts_in_order<'a, I>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for value in values {
        match index.get(value) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value, counts.len());
                counts.push((value.to_string(), 1));
            }
        }
    }

    counts
}

/// Count values, most frequent first; ties keep first-appearance order.
pub fn value_counts<'a, I>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = counts_in_order(values);
    counts.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    counts
}

/// Cluster size of each key-point, in order of first appearance.
pub fn cluster_sizes(rows: &[JoinedMatch]) -> Vec<(String, usize)> {
    counts_in_order(rows.iter().map(|r| r.matched.keypoint.as_str()))
}

/// Number of matches per category, most frequent first.
pub fn category_counts(rows: &[JoinedMatch]) -> Vec<(String, usize)> {
    value_counts(rows.iter().map(|r| r.category.as_str()))
}

/// Key-points offered for selection, most frequent first.
pub fn keypoint_options(rows: &[JoinedMatch]) -> Vec<String> {
    value_counts(rows.iter().map(|r| r.matched.keypoint.as_str()))
        .into_iter()
        .map(|(keypoint, _)| keypoint)
        .collect()
}

/// Share of each category among the matches of one key-point.
///
/// Shares sum to one; an unknown key-point yields an empty distribution.
pub fn category_distribution(rows: &[JoinedMatch], keypoint: &str) -> Vec<(String, f64)> {
    let counts = value_counts(
        rows.iter()
            .filter(|r| r.matched.keypoint == keypoint)
            .map(|r| r.category.as_str()),
    );
    let total: usize = counts.iter().map(|(_, count)| count).sum();

    counts
        .into_iter()
        .map(|(category, count)| (category, count as f64 / total as f64))
        .collect()
}

/// Sentence texts matched to each key-point, in first-appearance order.
pub fn sentences_by_keypoint(rows: &[JoinedMatch]) -> Vec<(String, Vec<String>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();

    for row in rows {
        let keypoint = row.matched.keypoint.as_str();
        let slot = *index.entry(keypoint).or_insert_with(|| {
            grouped.push((keypoint.to_string(), Vec::new()));
            grouped.len() - 1
        });
        grouped[slot].1.push(row.matched.sentence_text.clone());
    }

    grouped
}
