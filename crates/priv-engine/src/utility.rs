//! Utility loss of a masking variant relative to the raw data.

use std::collections::HashMap;
use std::f64::consts::LN_2;
use std::hash::Hash;

use priv_core::{Dataset, QiKey, QuasiIdentifierSpec, Value};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grouping::Aggregation;

/// Distribution shift of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilityResult {
    pub column: String,
    pub distinct_raw: usize,
    pub distinct_masked: usize,
    /// `distinct_masked / distinct_raw`; `None` when the raw column has no
    /// non-null values. May exceed 1 (noise, fake values).
    pub cardinality_ratio: Option<f64>,
    /// Jensen-Shannon divergence in nats, in `[0, ln 2]`; `None` when either
    /// side has no non-null values.
    pub js_divergence: Option<f64>,
}

fn frequencies<'a>(
    cells: impl IntoIterator<Item = &'a Value>,
) -> (HashMap<&'a Value, usize>, usize) {
    let mut counts = HashMap::new();
    let mut total = 0;
    for cell in cells.into_iter().filter(|c| !c.is_null()) {
        *counts.entry(cell).or_insert(0) += 1;
        total += 1;
    }
    (counts, total)
}

/// Jensen-Shannon divergence between two empirical distributions.
#[allow(clippy::cast_precision_loss)]
fn js_divergence<K: Hash + Eq>(
    p: &HashMap<K, usize>,
    p_total: usize,
    q: &HashMap<K, usize>,
    q_total: usize,
) -> f64 {
    let (pn, qn) = (p_total as f64, q_total as f64);
    // KL(x || m) term for one category, 0 when x is 0.
    let term = |x: f64, m: f64| if x > 0.0 { x * (x / m).ln() } else { 0.0 };

    let mut sum = 0.0;
    for (key, &pc) in p {
        let pp = pc as f64 / pn;
        let qp = q.get(key).map_or(0.0, |&c| c as f64 / qn);
        let m = 0.5 * (pp + qp);
        sum += term(pp, m) + term(qp, m);
    }
    for (key, &qc) in q {
        if !p.contains_key(key) {
            let qp = qc as f64 / qn;
            sum += term(qp, 0.5 * qp);
        }
    }
    (0.5 * sum).clamp(0.0, LN_2)
}

/// Compare one column's raw and masked values.
///
/// Nulls are excluded from both distinct counts and frequencies.
#[allow(clippy::cast_precision_loss)]
pub fn compare<'a>(
    column: &str,
    raw: impl IntoIterator<Item = &'a Value>,
    masked: impl IntoIterator<Item = &'a Value>,
) -> UtilityResult {
    let (raw_freq, raw_total) = frequencies(raw);
    let (masked_freq, masked_total) = frequencies(masked);

    let cardinality_ratio =
        (!raw_freq.is_empty()).then(|| masked_freq.len() as f64 / raw_freq.len() as f64);
    let js = (raw_total > 0 && masked_total > 0)
        .then(|| js_divergence(&raw_freq, raw_total, &masked_freq, masked_total));

    UtilityResult {
        column: column.to_string(),
        distinct_raw: raw_freq.len(),
        distinct_masked: masked_freq.len(),
        cardinality_ratio,
        js_divergence: js,
    }
}

/// [`compare`] for several columns of two datasets.
///
/// # Errors
///
/// Returns [`crate::EngineError::Core`] if a column is missing on either side.
pub fn compare_columns<S: AsRef<str>>(
    raw: &Dataset,
    masked: &Dataset,
    columns: &[S],
) -> Result<Vec<UtilityResult>> {
    columns
        .iter()
        .map(|column| -> Result<UtilityResult> {
            let column = column.as_ref();
            Ok(compare(column, raw.column(column)?, masked.column(column)?))
        })
        .collect()
}

/// Distortion of a grouped COUNT between raw and masked data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateUtilityResult {
    pub group_by: String,
    pub raw_groups: usize,
    pub masked_groups: usize,
    pub shared_groups: usize,
    /// Mean |raw − masked| count over groups present on both sides.
    pub mean_absolute_error: Option<f64>,
    /// Mean |raw − masked| / raw over raw groups; a group missing from the
    /// masked data counts as 0 there.
    pub mean_relative_error: Option<f64>,
}

fn group_counts(dataset: &Dataset, spec: &QuasiIdentifierSpec) -> Result<HashMap<QiKey, usize>> {
    let mut agg: Aggregation<usize> = Aggregation::bind(dataset.schema(), dataset.name(), spec)?;
    for row in dataset.rows() {
        agg.feed(row, |n, _| *n += 1);
    }
    Ok(agg.into_groups())
}

/// Compare per-group row counts of `raw` and `masked` under `spec`.
///
/// # Errors
///
/// Fails if `spec` does not bind to either dataset.
#[allow(clippy::cast_precision_loss)]
pub fn aggregate_error(
    raw: &Dataset,
    masked: &Dataset,
    spec: &QuasiIdentifierSpec,
) -> Result<AggregateUtilityResult> {
    let raw_counts = group_counts(raw, spec)?;
    let masked_counts = group_counts(masked, spec)?;

    let shared: Vec<f64> = raw_counts
        .iter()
        .filter_map(|(key, &r)| masked_counts.get(key).map(|&m| (r as f64 - m as f64).abs()))
        .collect();
    let relative: f64 = raw_counts
        .iter()
        .map(|(key, &r)| {
            let m = masked_counts.get(key).copied().unwrap_or(0);
            (r as f64 - m as f64).abs() / r as f64
        })
        .sum();

    Ok(AggregateUtilityResult {
        group_by: spec.label(),
        raw_groups: raw_counts.len(),
        masked_groups: masked_counts.len(),
        shared_groups: shared.len(),
        mean_absolute_error: (!shared.is_empty())
            .then(|| shared.iter().sum::<f64>() / shared.len() as f64),
        mean_relative_error: (!raw_counts.is_empty()).then(|| relative / raw_counts.len() as f64),
    })
}
