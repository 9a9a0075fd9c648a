//! Text rendering of horizontal bar charts.

use crate::models::{Chart, ValueKind};

/// Longest label shown before truncation, in characters.
const MAX_LABEL_CHARS: usize = 48;

const BAR: char = '█';

/// Render a chart as a fenced text block with one bar per line.
pub fn render_chart(chart: &Chart, width: usize) -> String {
    let mut block = String::new();

    if chart.bars.is_empty() {
        block.push_str("_No data._\n");
        return block;
    }

    let labels: Vec<String> = chart.bars.iter().map(|(label, _)| truncate(label)).collect();
    let label_width = labels
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(chart.label_axis.chars().count()))
        .max()
        .unwrap_or(0);
    let max_value = chart
        .bars
        .iter()
        .map(|(_, value)| *value)
        .fold(0.0_f64, f64::max);

    block.push_str("```text\n");
    block.push_str(&format!(
        "{} │ {}\n",
        pad(&chart.label_axis, label_width),
        chart.value_axis
    ));
    block.push_str(&format!("{}─┼{}\n", "─".repeat(label_width), "─".repeat(width + 1)));

    for (label, (_, value)) in labels.iter().zip(&chart.bars) {
        block.push_str(&format!(
            "{} │{} {}\n",
            pad(label, label_width),
            BAR.to_string().repeat(bar_length(*value, max_value, width)),
            format_value(*value, chart.kind)
        ));
    }

    block.push_str("```\n");
    block
}

/// Number of bar cells for `value`, scaled so `max` fills `width`.
///
/// Positive values always get at least one cell.
fn bar_length(value: f64, max: f64, width: usize) -> usize {
    if value <= 0.0 || max <= 0.0 {
        return 0;
    }
    let cells = (value / max * width as f64).round() as usize;
    cells.clamp(1, width.max(1))
}

fn format_value(value: f64, kind: ValueKind) -> String {
    match kind {
        ValueKind::Count => format!("{:.0}", value),
        ValueKind::Proportion => format!("{:.1}%", value * 100.0),
    }
}

fn truncate(label: &str) -> String {
    let label = label.trim();
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_string();
    }
    let mut cut: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
    cut.push('…');
    cut
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}
