//! Dashboard rendering.

pub mod chart;
pub mod export;
pub mod generator;

pub use export::export_matches;
pub use generator::{generate_json_report, generate_markdown_report, generate_selection_section};
