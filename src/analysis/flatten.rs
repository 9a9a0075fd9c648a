//! Flattening of key-point analysis results.

use crate::models::{KeyPointMatch, KpaResult, MatchTable};

/// Convert a nested result into one table row per match.
///
/// Key-point order and match order within each key-point are preserved.
pub fn flatten(result: &KpaResult) -> MatchTable {
    let rows = result
        .keypoint_matchings
        .iter()
        .flat_map(|kp| {
            kp.matching.iter().map(move |m| KeyPointMatch {
                keypoint: kp.keypoint.clone(),
                sentence_text: m.sentence_text.clone(),
                match_score: m.score,
                comment_id: m.comment_id.clone(),
                sentence_id: m.sentence_id,
                sents_in_comment: m.sents_in_comment,
                span_start: m.span_start,
                span_end: m.span_end,
                num_tokens: m.num_tokens,
                argument_quality: m.argument_quality,
                keypoint_quality: m.kp_quality,
            })
        })
        .collect();

    MatchTable { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::kpa_result;

    #[test]
    fn test_one_row_per_match() {
        let result = kpa_result(&[("none", &["1", "2"]), ("kp1", &["3", "4", "5"])]);

        let table = flatten(&result);

        assert_eq!(table.len(), 5);
        assert_eq!(table.len(), result.match_count());
    }

    #[test]
    fn test_preserves_nested_order() {
        let result = kpa_result(&[("b", &["9", "3"]), ("a", &["1"])]);

        let table = flatten(&result);

        let order: Vec<_> = table
            .rows
            .iter()
            .map(|r| (r.keypoint.as_str(), r.comment_id.as_str()))
            .collect();
        assert_eq!(order, vec![("b", "9"), ("b", "3"), ("a", "1")]);
    }

    #[test]
    fn test_copies_all_fields() {
        let result = kpa_result(&[("kp", &["42"])]);
        let entry = &result.keypoint_matchings[0].matching[0];

        let row = &flatten(&result).rows[0];

        assert_eq!(row.keypoint, "kp");
        assert_eq!(row.sentence_text, entry.sentence_text);
        assert_eq!(row.match_score, entry.score);
        assert_eq!(row.comment_id, "42");
        assert_eq!(row.sentence_id, entry.sentence_id);
        assert_eq!(row.sents_in_comment, entry.sents_in_comment);
        assert_eq!(row.span_start, entry.span_start);
        assert_eq!(row.span_end, entry.span_end);
        assert_eq!(row.num_tokens, entry.num_tokens);
        assert_eq!(row.argument_quality, entry.argument_quality);
        assert_eq!(row.keypoint_quality, entry.kp_quality);
    }

    #[test]
    fn test_empty_keypoints_produce_no_rows() {
        let result = kpa_result(&[("kp", &[])]);
        assert!(flatten(&result).is_empty());
    }
}
