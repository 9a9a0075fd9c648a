//! CSV export of the joined match table.

use crate::models::{JoinedMatch, MatchTable};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Write joined matches as CSV: the match table columns, then record metadata.
pub fn write_matches<W: Write>(rows: &[JoinedMatch], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = MatchTable::COLUMNS.to_vec();
    header.extend(["narrative_id", "category"]);
    csv.write_record(&header)?;

    for row in rows {
        let m = &row.matched;
        csv.write_record([
            m.keypoint.clone(),
            m.sentence_text.clone(),
            m.match_score.to_string(),
            m.comment_id.clone(),
            m.sentence_id.to_string(),
            m.sents_in_comment.to_string(),
            m.span_start.to_string(),
            m.span_end.to_string(),
            m.num_tokens.to_string(),
            m.argument_quality.to_string(),
            m.keypoint_quality.to_string(),
            row.narrative_id.clone(),
            row.category.clone(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// Export joined matches to a CSV file.
pub fn export_matches(rows: &[JoinedMatch], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_matches(rows, file)
        .with_context(|| format!("Failed to write matches to {}", path.display()))
}
