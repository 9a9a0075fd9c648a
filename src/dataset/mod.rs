//! Dataset loading.
//!
//! This module reads the delimited source dataset into [`Record`]s,
//! dropping incomplete rows and normalizing identifier columns.

use crate::config::DatasetConfig;
use crate::models::Record;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Cell values treated as missing, in addition to empty cells.
const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Errors raised while loading the dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("dataset {} has no '{column}' column", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("delimiter {0:?} is not a single ASCII character")]
    InvalidDelimiter(char),
}

/// Column positions of the named record fields.
struct ColumnMap {
    id: usize,
    text: usize,
    narrative: usize,
    category: usize,
}

impl ColumnMap {
    fn resolve(
        headers: &csv::StringRecord,
        config: &DatasetConfig,
        path: &Path,
    ) -> Result<Self, DatasetError> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or_else(|| DatasetError::MissingColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                })
        };

        Ok(Self {
            id: find(&config.id_column)?,
            text: find(&config.text_column)?,
            narrative: find(&config.narrative_column)?,
            category: find(&config.category_column)?,
        })
    }

    fn is_named(&self, index: usize) -> bool {
        index == self.id || index == self.text || index == self.narrative || index == self.category
    }
}

/// Load the dataset described by `config`.
///
/// Rows with any missing field are dropped. Output preserves file order.
pub fn load(config: &DatasetConfig) -> Result<Vec<Record>, DatasetError> {
    let path = config.path.as_path();
    info!("Loading dataset: {}", path.display());

    if !config.delimiter.is_ascii() {
        return Err(DatasetError::InvalidDelimiter(config.delimiter));
    }

    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter as u8)
        .flexible(true)
        .from_reader(file);

    let csv_error = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let headers = reader.headers().map_err(csv_error)?.clone();
    let columns = ColumnMap::resolve(&headers, config, path)?;

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for row in reader.records() {
        let row = row.map_err(csv_error)?;

        if row.len() < headers.len() || row.iter().any(is_missing) {
            dropped += 1;
            continue;
        }

        let metadata = headers
            .iter()
            .zip(row.iter())
            .enumerate()
            .filter(|(index, _)| !columns.is_named(*index))
            .map(|(_, (name, value))| (name.trim().to_string(), value.to_string()))
            .collect();

        records.push(Record {
            id: normalize_identifier(&row[columns.id]),
            text: row[columns.text].to_string(),
            narrative_id: normalize_identifier(&row[columns.narrative]),
            category: row[columns.category].trim().to_string(),
            metadata,
        });
    }

    debug!("Dropped {} incomplete rows", dropped);
    info!("Loaded {} records", records.len());

    Ok(records)
}

/// Check whether a cell counts as a missing value.
fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || NA_TOKENS.contains(&trimmed)
}

/// Normalize an identifier cell to text.
///
/// Integral floats such as `"123.0"` become `"123"`.
fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some((whole, fraction)) = trimmed.split_once('.') {
        let digits = whole.strip_prefix('-').unwrap_or(whole);
        if !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_digit())
            && !fraction.is_empty()
            && fraction.chars().all(|c| c == '0')
        {
            return whole.to_string();
        }
    }

    trimmed.to_string()
}
