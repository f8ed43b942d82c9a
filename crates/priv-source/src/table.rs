//! `DuckDB` table loader.
//!
//! Declared columns are read with explicit casts so every cell arrives as
//! the scalar its column type expects. Dates travel as `YYYY-MM-DD` text.

use std::path::Path;

use duckdb::{AccessMode, Config, Connection, params};
use priv_core::{ColumnType, CoreError, Dataset, Schema, Value};

use crate::SourceError;

/// Load `table` from the database file at `path` as the dataset `variant`.
///
/// The file is opened read-only.
///
/// # Errors
///
/// - [`SourceError::Io`] if the file does not exist.
/// - [`SourceError::Core`] if a declared column is absent from the table,
///   or on row-key violations.
/// - [`SourceError::Decode`] if a column holds a value its declared type
///   cannot represent.
/// - [`SourceError::ResourceExhaustion`] if the table has more than
///   `max_rows` rows.
/// - [`SourceError::DuckDb`] for any other database failure.
pub fn load(
    variant: &str,
    path: &Path,
    table: &str,
    schema: Schema,
    row_key: &str,
    max_rows: Option<usize>,
) -> Result<Dataset, SourceError> {
    if !path.exists() {
        return Err(SourceError::Io {
            path: path.to_path_buf(),
            source: std::io::ErrorKind::NotFound.into(),
        });
    }
    let config = Config::default().access_mode(AccessMode::ReadOnly)?;
    let conn = Connection::open_with_flags(path, config)?;
    read_table(&conn, variant, table, schema, row_key, max_rows)
}

/// Load `table` through an open connection.
///
/// # Errors
///
/// Same as [`load`], minus the file check.
pub fn read_table(
    conn: &Connection,
    variant: &str,
    table: &str,
    schema: Schema,
    row_key: &str,
    max_rows: Option<usize>,
) -> Result<Dataset, SourceError> {
    let quoted_table = quote(table);
    check_columns(conn, variant, table, &schema)?;

    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {quoted_table}"), [], |row| {
        row.get(0)
    })?;
    crate::check_limit(variant, usize::try_from(count).unwrap_or(usize::MAX), max_rows)?;

    for (column, ty) in schema.columns() {
        check_castable(conn, variant, &quoted_table, column, ty)?;
    }

    let select = schema
        .columns()
        .map(|(column, ty)| match ty {
            ColumnType::Date => format!("CAST(CAST({} AS DATE) AS VARCHAR)", quote(column)),
            _ => format!("CAST({} AS {})", quote(column), sql_type(ty)),
        })
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn.prepare(&format!("SELECT {select} FROM {quoted_table}"))?;
    let mut result = stmt.query([])?;

    let mut rows = Vec::new();
    while let Some(row) = result.next()? {
        let mut cells = Vec::with_capacity(schema.len());
        for (idx, (column, ty)) in schema.columns().enumerate() {
            let cell = match ty {
                ColumnType::Integer => row.get::<_, Option<i64>>(idx)?.map_or(Value::Null, Value::Int),
                ColumnType::Real => row.get::<_, Option<f64>>(idx)?.map_or(Value::Null, Value::Real),
                ColumnType::Text => row.get::<_, Option<String>>(idx)?.map_or(Value::Null, Value::Text),
                ColumnType::Date => match row.get::<_, Option<String>>(idx)? {
                    Some(s) => Value::parse_date(&s).map_err(|reason| SourceError::Decode {
                        variant: variant.to_string(),
                        record: rows.len() + 1,
                        column: column.to_string(),
                        reason,
                    })?,
                    None => Value::Null,
                },
            };
            cells.push(cell);
        }
        rows.push(cells);
    }

    tracing::debug!(variant, table, rows = rows.len(), "loaded duckdb variant");
    Ok(Dataset::new(variant, schema, row_key, rows)?)
}

fn check_columns(
    conn: &Connection,
    variant: &str,
    table: &str,
    schema: &Schema,
) -> Result<(), SourceError> {
    let mut stmt =
        conn.prepare("SELECT column_name FROM information_schema.columns WHERE table_name = ?")?;
    let present = stmt
        .query_map(params![table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    if present.is_empty() {
        return Err(SourceError::MissingVariant {
            variant: format!("{variant} (table '{table}')"),
        });
    }
    match schema.names().find(|name| !present.iter().any(|p| p == name)) {
        Some(column) => Err(CoreError::UnknownColumn {
            dataset: variant.to_string(),
            column: column.to_string(),
        }
        .into()),
        None => Ok(()),
    }
}

/// Report the first row whose non-null cell does not cast to `ty`.
fn check_castable(
    conn: &Connection,
    variant: &str,
    quoted_table: &str,
    column: &str,
    ty: ColumnType,
) -> Result<(), SourceError> {
    let quoted = quote(column);
    let sql = format!(
        "SELECT rn, CAST(c AS VARCHAR) FROM \
         (SELECT row_number() OVER () AS rn, {quoted} AS c FROM {quoted_table}) \
         WHERE c IS NOT NULL AND TRY_CAST(c AS {}) IS NULL ORDER BY rn LIMIT 1",
        sql_type(ty)
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut bad = stmt.query([])?;
    match bad.next()? {
        Some(row) => {
            let record: i64 = row.get(0)?;
            let cell: Option<String> = row.get(1)?;
            Err(SourceError::Decode {
                variant: variant.to_string(),
                record: usize::try_from(record).unwrap_or(0),
                column: column.to_string(),
                reason: format!("'{}' is not a {ty}", cell.unwrap_or_default()),
            })
        }
        None => Ok(()),
    }
}

const fn sql_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Integer => "BIGINT",
        ColumnType::Real => "DOUBLE",
        ColumnType::Text => "VARCHAR",
        ColumnType::Date => "DATE",
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
