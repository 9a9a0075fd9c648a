//! Dashboard report generation.
//!
//! This module renders a [`Dashboard`] as Markdown with text bar charts,
//! or as pretty-printed JSON.

use crate::models::{Dashboard, DashboardMetadata, KeypointView};
use crate::report::chart::render_chart;
use anyhow::Result;

/// Generate the complete Markdown dashboard.
pub fn generate_markdown_report(dashboard: &Dashboard, bar_width: usize) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!("# {}\n\n", dashboard.metadata.title));

    // Topic and run details
    output.push_str(&generate_topic_section(&dashboard.metadata));
    output.push_str(&generate_metadata_section(&dashboard.metadata));

    // Static charts
    output.push_str(&generate_chart_section(
        &dashboard.cluster_sizes.title,
        &render_chart(&dashboard.cluster_sizes, bar_width),
    ));
    output.push_str(&generate_chart_section(
        &dashboard.category_counts.title,
        &render_chart(&dashboard.category_counts, bar_width),
    ));

    // Selector
    output.push_str(&generate_keypoints_section(
        &dashboard.keypoints,
        dashboard.selected.as_ref().map(|v| v.keypoint.as_str()),
    ));

    // Per-selection charts
    if let Some(ref view) = dashboard.selected {
        output.push_str(&generate_selection_section(view, bar_width));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the topic section.
fn generate_topic_section(metadata: &DashboardMetadata) -> String {
    format!("## Topic\n\n> {}\n\n---\n\n", metadata.topic.trim())
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &DashboardMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Dataset:** `{}`\n", metadata.dataset));
    section.push_str(&format!("- **Domain:** `{}`\n", metadata.domain));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Records Loaded:** {}\n",
        metadata.records_loaded
    ));
    section.push_str(&format!(
        "- **Sentences Ranked:** {}\n",
        metadata.sentences_ranked
    ));
    section.push_str(&format!(
        "- **Matches:** {} ({} assigned to a key point)\n",
        metadata.matches_total, metadata.matches_kept
    ));
    section.push('\n');

    section
}

fn generate_chart_section(title: &str, chart: &str) -> String {
    format!("## {}\n\n{}\n", title, chart)
}

/// Generate the selector listing.
fn generate_keypoints_section(keypoints: &[String], selected: Option<&str>) -> String {
    let mut section = String::new();

    section.push_str("## Key Points\n\n");

    if keypoints.is_empty() {
        section.push_str("No key points were matched to any sentence.\n\n");
        return section;
    }

    for (i, keypoint) in keypoints.iter().enumerate() {
        let marker = if Some(keypoint.as_str()) == selected {
            " ◀"
        } else {
            ""
        };
        section.push_str(&format!("{}. {}{}\n", i + 1, keypoint, marker));
    }
    section.push('\n');

    section
}

/// Generate the charts for the selected key-point.
pub fn generate_selection_section(view: &KeypointView, bar_width: usize) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Selected Key Point: \"{}\"\n\n", view.keypoint));
    section.push_str(&format!("### {}\n\n", view.category_distribution.title));
    section.push_str(&render_chart(&view.category_distribution, bar_width));
    section.push('\n');
    section.push_str(&format!("### {}\n\n", view.top_concepts.title));
    section.push_str(&render_chart(&view.top_concepts, bar_width));
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Dashboard generated by kpdash*\n");

    footer
}

/// Generate a JSON dashboard.
pub fn generate_json_report(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).map_err(Into::into)
}
