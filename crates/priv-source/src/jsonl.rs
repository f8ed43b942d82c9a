//! JSONL variant loader.
//!
//! One JSON object per line. Only declared columns are read; keys outside
//! the schema are ignored and absent keys read as null.

use std::path::Path;

use priv_core::{Dataset, Schema, Value};
use serde_json::{Map, Value as JsonValue};

use crate::SourceError;

/// Load a JSONL file as the dataset `variant`.
///
/// # Errors
///
/// - [`SourceError::Io`] if the file cannot be opened or a line is not a
///   JSON object.
/// - [`SourceError::Decode`] if a cell does not fit its declared type.
/// - [`SourceError::ResourceExhaustion`] if the file has more than
///   `max_rows` records.
/// - [`SourceError::Core`] for row-key violations.
pub fn load(
    variant: &str,
    path: &Path,
    schema: Schema,
    row_key: &str,
    max_rows: Option<usize>,
) -> Result<Dataset, SourceError> {
    let io_err = |source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    };

    let lines = serde_jsonlines::json_lines::<Map<String, JsonValue>, _>(path).map_err(io_err)?;

    let mut rows = Vec::new();
    for (idx, line) in lines.enumerate() {
        let record = line.map_err(io_err)?;
        crate::check_limit(variant, idx + 1, max_rows)?;
        rows.push(decode(variant, idx + 1, &record, &schema)?);
    }

    tracing::debug!(variant, path = %path.display(), rows = rows.len(), "loaded jsonl variant");
    Ok(Dataset::new(variant, schema, row_key, rows)?)
}

fn decode(
    variant: &str,
    record_no: usize,
    record: &Map<String, JsonValue>,
    schema: &Schema,
) -> Result<Vec<Value>, SourceError> {
    schema
        .columns()
        .map(|(column, ty)| {
            record
                .get(column)
                .map_or(Ok(Value::Null), |json| Value::from_json(json, ty))
                .map_err(|reason| SourceError::Decode {
                    variant: variant.to_string(),
                    record: record_no,
                    column: column.to_string(),
                    reason,
                })
        })
        .collect()
}
