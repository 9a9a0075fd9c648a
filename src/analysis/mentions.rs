//! Concept mentions per key-point.

use crate::analysis::aggregator::sentences_by_keypoint;
use crate::gateway::{AnalysisService, Gateway, GatewayError};
use crate::models::{JoinedMatch, MentionIndex};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Count the concepts linked in each key-point's matched sentences.
///
/// Identical sentence texts are linked and counted once. Titles listed in
/// `excluded` are never counted.
pub async fn build_mention_index<S: AnalysisService>(
    gateway: &Gateway<S>,
    rows: &[JoinedMatch],
    excluded: &[String],
) -> Result<MentionIndex, GatewayError> {
    let mut index = MentionIndex::new();

    for (keypoint, sentences) in sentences_by_keypoint(rows) {
        let mut seen = BTreeSet::new();
        let unique: Vec<String> = sentences
            .into_iter()
            .filter(|text| seen.insert(text.clone()))
            .collect();

        let linked = gateway.link_entities(&unique).await?;

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for title in linked.iter().flatten() {
            if excluded.iter().any(|e| e == title) {
                continue;
            }
            *counts.entry(title.clone()).or_insert(0) += 1;
        }

        debug!("Key point '{}': {} distinct concepts", keypoint, counts.len());
        index.insert(keypoint, counts);
    }

    Ok(index)
}

/// The `n` most mentioned concepts of a key-point, ties broken by title.
pub fn top_concepts(index: &MentionIndex, keypoint: &str, n: usize) -> Vec<(String, usize)> {
    let Some(counts) = index.get(keypoint) else {
        return Vec::new();
    };

    let mut ranked: Vec<(String, usize)> = counts
        .iter()
        .map(|(title, count)| (title.clone(), *count))
        .collect();
    // BTreeMap iteration is title-ordered and the sort is stable
    ranked.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{drop_sentinel, flatten, join_records};
    use crate::gateway::testing::{kpa_result, record, FakeService};
    use std::time::Duration;

    fn rows() -> Vec<JoinedMatch> {
        let table = flatten(&kpa_result(&[
            ("none", &["1"]),
            ("kp1", &["2", "3"]),
            ("kp2", &["4"]),
        ]));
        let records: Vec<_> = ["1", "2", "3", "4"]
            .iter()
            .map(|id| record(id, &format!("text {}", id)))
            .collect();
        drop_sentinel(join_records(&table, &records).unwrap(), "none")
    }

    fn service() -> FakeService {
        FakeService::default().with_mentions(&[
            ("text 1", &["Ignored"]),
            ("text 2", &["Stent", "History", "Artery"]),
            ("text 3", &["Stent", "Catheter"]),
            ("text 4", &["Knee", "History"]),
        ])
    }

    #[tokio::test]
    async fn test_counts_concepts_per_keypoint() {
        let gateway = Gateway::new(service(), Duration::from_millis(1));
        let excluded = vec!["History".to_string()];

        let index = build_mention_index(&gateway, &rows(), &excluded)
            .await
            .unwrap();

        assert_eq!(index.len(), 2);
        assert!(!index.contains_key("none"));
        let kp1 = &index["kp1"];
        assert_eq!(kp1.get("Stent"), Some(&2));
        assert_eq!(kp1.get("Artery"), Some(&1));
        assert_eq!(kp1.get("Catheter"), Some(&1));
        assert_eq!(index["kp2"].get("Knee"), Some(&1));
    }

    #[tokio::test]
    async fn test_excluded_concepts_never_counted() {
        let gateway = Gateway::new(service(), Duration::from_millis(1));
        let excluded = vec!["History".to_string()];

        let index = build_mention_index(&gateway, &rows(), &excluded)
            .await
            .unwrap();

        assert!(index.values().all(|counts| !counts.contains_key("History")));
    }

    #[tokio::test]
    async fn test_identical_sentences_counted_once() {
        let mut rows = rows();
        let mut duplicate = rows[0].clone();
        duplicate.matched.comment_id = "9".to_string();
        rows.push(duplicate);

        let gateway = Gateway::new(service(), Duration::from_millis(1));
        let index = build_mention_index(&gateway, &rows, &[]).await.unwrap();

        assert_eq!(index["kp1"].get("Stent"), Some(&2));
        assert_eq!(index["kp1"].get("History"), Some(&1));
    }

    #[tokio::test]
    async fn test_rebuild_is_served_from_cache() {
        let gateway = Gateway::new(service(), Duration::from_millis(1));
        let rows = rows();

        let first = build_mention_index(&gateway, &rows, &[]).await.unwrap();
        let second = build_mention_index(&gateway, &rows, &[]).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(gateway.service().calls("annotate"), 2);
    }

    #[test]
    fn test_top_concepts_orders_by_count_then_title() {
        let mut index = MentionIndex::new();
        index.insert(
            "kp".to_string(),
            [("Zeta", 2), ("Alpha", 2), ("Beta", 5), ("Gamma", 1)]
                .into_iter()
                .map(|(t, c)| (t.to_string(), c))
                .collect(),
        );

        let top = top_concepts(&index, "kp", 3);

        assert_eq!(
            top,
            vec![
                ("Beta".to_string(), 5),
                ("Alpha".to_string(), 2),
                ("Zeta".to_string(), 2)
            ]
        );
        assert!(top_concepts(&index, "other", 3).is_empty());
    }
}
