//! k-anonymity assessment over a sweep of k values.

use std::collections::BTreeMap;

use priv_core::{Dataset, QuasiIdentifierSpec};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::grouping::{self, GroupSizeReport};

/// Rows that would have to be removed to reach k-anonymity by suppression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppressionReport {
    pub suppressed_rows: usize,
    pub retained_rows: usize,
    /// `suppressed_rows / row_count`; 0 for an empty dataset.
    pub suppression_rate: f64,
}

/// k-anonymity of one dataset under one QI spec at one k.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KAnonymityReport {
    pub k: usize,
    pub row_count: usize,
    pub class_count: usize,
    /// `None` for an empty dataset.
    pub min_class_size: Option<usize>,
    pub violating_classes: usize,
    pub violating_rows: usize,
    pub violating_fraction: f64,
    pub is_k_anonymous: bool,
    /// Classes of size 1. These are high risk at every k.
    pub unique_classes: usize,
    pub suppression: SuppressionReport,
}

/// Derive the report for one k from an existing grouping.
///
/// An empty dataset is vacuously k-anonymous with no violations.
///
/// # Errors
///
/// Returns [`EngineError::InvalidParameter`] when `k == 0`.
#[allow(clippy::cast_precision_loss)]
pub fn report_for(groups: &GroupSizeReport, k: usize) -> Result<KAnonymityReport> {
    if k == 0 {
        return Err(EngineError::invalid("k must be at least 1"));
    }

    let row_count = groups.row_count();
    let min_class_size = groups.min_class_size();
    let violating_rows = groups.rows_below(k);
    let suppression_rate = if row_count == 0 {
        0.0
    } else {
        violating_rows as f64 / row_count as f64
    };

    Ok(KAnonymityReport {
        k,
        row_count,
        class_count: groups.class_count(),
        min_class_size,
        violating_classes: groups.classes_below(k),
        violating_rows,
        violating_fraction: groups.fraction_below(k),
        is_k_anonymous: min_class_size.is_none_or(|m| m >= k),
        unique_classes: groups.singleton_count(),
        suppression: SuppressionReport {
            suppressed_rows: violating_rows,
            retained_rows: row_count - violating_rows,
            suppression_rate,
        },
    })
}

/// Group once, then report every requested k.
///
/// # Errors
///
/// Fails if the spec does not bind or any k is 0. Validation of k happens
/// before grouping.
pub fn assess(
    dataset: &Dataset,
    spec: &QuasiIdentifierSpec,
    k_values: &[usize],
) -> Result<BTreeMap<usize, KAnonymityReport>> {
    if k_values.contains(&0) {
        return Err(EngineError::invalid("k must be at least 1"));
    }
    let groups = grouping::group(dataset, spec)?;
    k_values
        .iter()
        .map(|&k| report_for(&groups, k).map(|r| (k, r)))
        .collect()
}
