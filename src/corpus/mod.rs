
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use fancy_regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{QaError, Result};

/// Sentinel stored in place of a missing secondary id.
pub const UNKNOWN_SECONDARY_ID: &str = "unknown";

/// Contiguous Latin or Cyrillic letter runs count as words.
static WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[a-zA-Zа-яА-ЯёЁ]+\b").expect("word pattern is a valid regex")
});

/// One row of a three-column ingestion batch, before cleaning.
/// Fields are optional because the missing-value pass operates on absent cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub primary_id: Option<String>,
    pub secondary_id: Option<String>,
    pub text: Option<String>,
}

/// A row that survived cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedRecord {
    pub primary_id: String,
    pub secondary_id: String,
    pub text: String,
    pub word_count: usize,
}

/// Cleaned batch in original relative order. This ordering becomes the index
/// insertion order and must not be altered afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedCorpus {
    records: Vec<CleanedRecord>,
}

impl CleanedCorpus {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CleanedRecord] {
        &self.records
    }

    /// Projection to the text column, in insertion order.
    pub fn into_texts(self) -> Vec<String> {
        self.records.into_iter().map(|r| r.text).collect()
    }
}

/// Number of words in `text` per the Latin/Cyrillic word pattern.
#[inline]
pub fn count_words(text: &str) -> usize {
    WORD_PATTERN
        .find_iter(text)
        .filter_map(|m| m.ok())
        .count()
}

/// Load a three-column batch from a JSON file.
///
/// Two shapes are accepted: an array of three-field row objects, or a
/// column-oriented map of exactly three columns, each mapping row keys to
/// cell values. Columns are read positionally, so the fixed order
/// (primary id, secondary id, text) applies regardless of column names.
#[inline]
pub fn load_batch(path: &Path) -> Result<Vec<RawRecord>> {
    let content = fs::read_to_string(path).map_err(|e| {
        QaError::Ingestion(format!("Failed to read batch {}: {}", path.display(), e))
    })?;

    let value: Value = serde_json::from_str(&content).map_err(|e| {
        QaError::Ingestion(format!("Malformed JSON in batch {}: {}", path.display(), e))
    })?;

    let records = match value {
        Value::Array(rows) => parse_row_oriented(&rows)?,
        Value::Object(columns) => parse_column_oriented(&columns)?,
        _ => {
            return Err(QaError::Ingestion(
                "Batch must be an array of rows or a column map".to_string(),
            ));
        }
    };

    debug!("Loaded {} raw records from {}", records.len(), path.display());
    Ok(records)
}

fn parse_row_oriented(rows: &[Value]) -> Result<Vec<RawRecord>> {
    let mut records = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let Value::Object(fields) = row else {
            return Err(QaError::Ingestion(format!("Row {} is not an object", i)));
        };

        if fields.len() != 3 {
            return Err(QaError::Ingestion(format!(
                "Row {} has {} columns, expected exactly 3",
                i,
                fields.len()
            )));
        }

        let mut cells = fields.values().map(|v| cell_to_string(v, i));
        records.push(RawRecord {
            primary_id: cells.next().transpose()?.flatten(),
            secondary_id: cells.next().transpose()?.flatten(),
            text: cells.next().transpose()?.flatten(),
        });
    }

    Ok(records)
}

fn parse_column_oriented(columns: &serde_json::Map<String, Value>) -> Result<Vec<RawRecord>> {
    if columns.len() != 3 {
        return Err(QaError::Ingestion(format!(
            "Batch has {} columns, expected exactly 3",
            columns.len()
        )));
    }

    let mut column_cells: Vec<&serde_json::Map<String, Value>> = Vec::with_capacity(3);
    for (name, cells) in columns {
        let Value::Object(cells) = cells else {
            return Err(QaError::Ingestion(format!(
                "Column {:?} is not a row map",
                name
            )));
        };
        column_cells.push(cells);
    }

    // Row keys in order of first appearance across all three columns, so rows
    // sparse in one column are still aligned.
    let mut row_keys: Vec<&String> = Vec::new();
    for cells in &column_cells {
        for key in cells.keys() {
            if !row_keys.contains(&key) {
                row_keys.push(key);
            }
        }
    }

    let mut records = Vec::with_capacity(row_keys.len());
    for (i, key) in row_keys.iter().enumerate() {
        let mut cells = column_cells
            .iter()
            .map(|col| col.get(*key).map_or(Ok(None), |v| cell_to_string(v, i)));
        records.push(RawRecord {
            primary_id: cells.next().transpose()?.flatten(),
            secondary_id: cells.next().transpose()?.flatten(),
            text: cells.next().transpose()?.flatten(),
        });
    }

    Ok(records)
}

fn cell_to_string(value: &Value, row: usize) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        _ => Err(QaError::Ingestion(format!(
            "Row {} contains a nested value where a scalar cell was expected",
            row
        ))),
    }
}

/// Run the fixed cleaning pipeline over a raw batch:
/// missing-value pass, duplicate pass, then minimum-length pass.
/// Survivors keep their original relative order.
#[inline]
pub fn clean(records: Vec<RawRecord>, min_words: usize) -> CleanedCorpus {
    let indexed: Vec<(usize, RawRecord)> = records.into_iter().enumerate().collect();

    let filled = check_missing(indexed);
    let deduped = check_duplicates(filled);
    let records = check_min_words(deduped, min_words);

    CleanedCorpus { records }
}

/// Drop rows missing the primary id or text; fill missing secondary ids.
fn check_missing(records: Vec<(usize, RawRecord)>) -> Vec<(usize, CleanedRecord)> {
    let mut dropped = Vec::new();
    let mut filled_rows = Vec::new();
    let mut out = Vec::with_capacity(records.len());

    for (i, record) in records {
        let (Some(primary_id), Some(text)) = (record.primary_id, record.text) else {
            dropped.push(i);
            continue;
        };

        let secondary_id = match record.secondary_id {
            Some(id) => id,
            None => {
                filled_rows.push(i);
                UNKNOWN_SECONDARY_ID.to_string()
            }
        };

        out.push((
            i,
            CleanedRecord {
                primary_id,
                secondary_id,
                text,
                word_count: 0,
            },
        ));
    }

    if dropped.is_empty() && filled_rows.is_empty() {
        info!("No missing values found");
    }
    if !dropped.is_empty() {
        warn!(
            "Dropped rows missing primary id or text: indexes {:?}",
            dropped
        );
    }
    if !filled_rows.is_empty() {
        info!(
            "Filled missing secondary id with {:?} at indexes {:?}",
            UNKNOWN_SECONDARY_ID, filled_rows
        );
    }

    out
}

/// Remove full-row duplicates of an earlier row, then rows whose primary id
/// duplicates an earlier row's. Both passes keep the first occurrence.
fn check_duplicates(records: Vec<(usize, CleanedRecord)>) -> Vec<(usize, CleanedRecord)> {
    let mut seen_rows = std::collections::HashSet::new();
    let mut dropped_full = Vec::new();
    let mut full_pass = Vec::with_capacity(records.len());

    for (i, record) in records {
        let key = (
            record.primary_id.clone(),
            record.secondary_id.clone(),
            record.text.clone(),
        );
        if seen_rows.insert(key) {
            full_pass.push((i, record));
        } else {
            dropped_full.push(i);
        }
    }

    if dropped_full.is_empty() {
        info!("No full-row duplicates found");
    } else {
        warn!("Dropped full-row duplicates: indexes {:?}", dropped_full);
    }

    let mut seen_ids = std::collections::HashSet::new();
    let mut dropped_ids = Vec::new();
    let mut out = Vec::with_capacity(full_pass.len());

    for (i, record) in full_pass {
        if seen_ids.insert(record.primary_id.clone()) {
            out.push((i, record));
        } else {
            dropped_ids.push(i);
        }
    }

    if dropped_ids.is_empty() {
        info!("No primary id duplicates found");
    } else {
        warn!("Dropped primary id duplicates: indexes {:?}", dropped_ids);
    }

    out
}

/// Attach word counts and drop rows below the minimum.
fn check_min_words(records: Vec<(usize, CleanedRecord)>, min_words: usize) -> Vec<CleanedRecord> {
    let mut short = 0usize;
    let mut out = Vec::with_capacity(records.len());

    for (_, mut record) in records {
        record.word_count = count_words(&record.text);
        if record.word_count < min_words {
            short += 1;
        } else {
            out.push(record);
        }
    }

    if short > 0 {
        warn!("Dropped {} rows with fewer than {} words", short, min_words);
    }

    out
}
