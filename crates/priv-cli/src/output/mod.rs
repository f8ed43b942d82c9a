use serde::Serialize;
use serde_json::{Map, Value};

use crate::cli::OutputFormat;
use crate::ui;

pub mod table;

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Table => render_table(value),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

fn options() -> table::TableOptions {
    let prefs = ui::prefs();
    table::TableOptions {
        max_width: prefs.term_width,
        color: prefs.table_color,
    }
}

/// Arrays of objects become one row per item; a single object becomes a
/// key/value listing. Nested objects are flattened into dotted columns.
fn render_table<T: Serialize>(value: &T) -> anyhow::Result<String> {
    match serde_json::to_value(value)? {
        Value::Array(items) if items.is_empty() => Ok(String::from("(no rows)")),
        Value::Array(items) if items.iter().all(Value::is_object) => {
            let flat: Vec<Map<String, Value>> = items.iter().map(flatten).collect();
            let mut headers: Vec<&str> = Vec::new();
            for row in &flat {
                for key in row.keys() {
                    if !headers.contains(&key.as_str()) {
                        headers.push(key.as_str());
                    }
                }
            }
            let rows: Vec<Vec<String>> = flat
                .iter()
                .map(|row| {
                    headers
                        .iter()
                        .map(|h| row.get(*h).map_or_else(|| String::from("-"), cell))
                        .collect()
                })
                .collect();
            Ok(table::render_table(&headers, &rows, options()))
        }
        Value::Array(items) => {
            let rows: Vec<Vec<String>> = items.iter().map(|item| vec![cell(item)]).collect();
            Ok(table::render_table(&["value"], &rows, options()))
        }
        object @ Value::Object(_) => {
            let rows: Vec<Vec<String>> = flatten(&object)
                .into_iter()
                .map(|(key, value)| vec![key, cell(&value)])
                .collect();
            Ok(table::render_table(&["key", "value"], &rows, options()))
        }
        scalar => Ok(table::render_table(&["value"], &[vec![cell(&scalar)]], options())),
    }
}

/// Flatten nested objects into `parent.child` keys.
fn flatten(value: &Value) -> Map<String, Value> {
    fn walk(prefix: &str, value: &Value, out: &mut Map<String, Value>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    walk(&path, child, out);
                }
            }
            other => {
                out.insert(prefix.to_string(), other.clone());
            }
        }
    }

    let mut out = Map::new();
    walk("", value, &mut out);
    out
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("-"),
        Value::Bool(v) => v.to_string(),
        Value::Number(n) => n
            .as_f64()
            .filter(|_| n.is_f64())
            .map_or_else(|| n.to_string(), |f| format!("{f:.4}")),
        Value::String(v) => v.clone(),
        Value::Array(items) if items.len() > 8 => format!("[{} values]", items.len()),
        other => serde_json::to_string(other).unwrap_or_else(|_| String::from("<invalid-json>")),
    }
}
