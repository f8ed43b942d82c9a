//! Hash grouping by generalized quasi-identifier tuple.
//!
//! This is the one grouping primitive in the engine. k-anonymity sizes the
//! classes, the linkage simulator indexes masked rows by them, and grouped
//! DP queries and aggregate utility sum over them. Each row costs one key
//! computation and one amortized O(1) hash-map update; row order never
//! matters.

use std::collections::{BTreeMap, HashMap};

use priv_core::{BoundSpec, Dataset, QiKey, QuasiIdentifierSpec, Row, Schema, Value};
use tracing::debug;

use crate::error::{EngineError, Result};

/// Per-class accumulator keyed by generalized QI tuple.
///
/// `A` is whatever the caller folds rows into: member keys for grouping,
/// a running sum for aggregates.
#[derive(Debug)]
pub struct Aggregation<A> {
    bound: BoundSpec,
    groups: HashMap<QiKey, A>,
    rows: usize,
}

impl<A: Default> Aggregation<A> {
    /// Bind `spec` to `schema`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidParameter`] if the spec has no fields.
    /// - [`EngineError::Core`] if a column is unknown or a generalization
    ///   does not fit its column type.
    pub fn bind(schema: &Schema, dataset: &str, spec: &QuasiIdentifierSpec) -> Result<Self> {
        if spec.fields.is_empty() {
            return Err(EngineError::invalid("quasi-identifier spec is empty"));
        }
        Ok(Self {
            bound: spec.bind(schema, dataset)?,
            groups: HashMap::new(),
            rows: 0,
        })
    }

    /// Fold one row into its class.
    pub fn feed(&mut self, row: &Row, update: impl FnOnce(&mut A, &Row)) {
        let key = self.bound.key(row);
        update(self.groups.entry(key).or_default(), row);
        self.rows += 1;
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.bound.label()
    }

    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn groups(&self) -> &HashMap<QiKey, A> {
        &self.groups
    }

    #[must_use]
    pub fn into_groups(self) -> HashMap<QiKey, A> {
        self.groups
    }
}

/// Incremental grouping of rows into equivalence classes.
///
/// Rows can be fed in any number of batches; every fed row lands in exactly
/// one class.
#[derive(Debug)]
pub struct Grouper {
    inner: Aggregation<Vec<Value>>,
    key_index: usize,
}

impl Grouper {
    /// Grouper for rows of `dataset` under `spec`.
    ///
    /// # Errors
    ///
    /// Same as [`Aggregation::bind`].
    pub fn new(dataset: &Dataset, spec: &QuasiIdentifierSpec) -> Result<Self> {
        Self::with_member_column(dataset, spec, dataset.row_key_index())
    }

    /// Grouper that records the cell at `member_index` as each row's member
    /// label instead of the row key.
    ///
    /// # Errors
    ///
    /// Same as [`Aggregation::bind`].
    pub fn with_member_column(
        dataset: &Dataset,
        spec: &QuasiIdentifierSpec,
        member_index: usize,
    ) -> Result<Self> {
        Ok(Self {
            inner: Aggregation::bind(dataset.schema(), dataset.name(), spec)?,
            key_index: member_index,
        })
    }

    pub fn feed(&mut self, row: &Row) {
        let key_index = self.key_index;
        self.inner
            .feed(row, |members, row| members.push(row.get(key_index).clone()));
    }

    pub fn feed_all<'a>(&mut self, rows: impl IntoIterator<Item = &'a Row>) {
        for row in rows {
            self.feed(row);
        }
    }

    #[must_use]
    pub fn finish(self) -> GroupSizeReport {
        GroupSizeReport {
            label: self.inner.label().to_string(),
            row_count: self.inner.row_count(),
            classes: self.inner.into_groups(),
        }
    }
}

/// Equivalence classes of one dataset under one QI spec.
#[derive(Debug, Clone)]
pub struct GroupSizeReport {
    label: String,
    row_count: usize,
    classes: HashMap<QiKey, Vec<Value>>,
}

impl GroupSizeReport {
    /// Label of the QI spec the rows were grouped by.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Classes and their member labels (row keys unless configured otherwise).
    #[must_use]
    pub const fn classes(&self) -> &HashMap<QiKey, Vec<Value>> {
        &self.classes
    }

    #[must_use]
    pub fn class(&self, key: &[Value]) -> Option<&[Value]> {
        self.classes.get(key).map(Vec::as_slice)
    }

    pub fn sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.classes.values().map(Vec::len)
    }

    /// `None` when there are no rows.
    #[must_use]
    pub fn min_class_size(&self) -> Option<usize> {
        self.sizes().min()
    }

    #[must_use]
    pub fn max_class_size(&self) -> Option<usize> {
        self.sizes().max()
    }

    /// Number of classes smaller than `k`.
    #[must_use]
    pub fn classes_below(&self, k: usize) -> usize {
        self.sizes().filter(|&s| s < k).count()
    }

    /// Number of rows in classes smaller than `k`.
    #[must_use]
    pub fn rows_below(&self, k: usize) -> usize {
        self.sizes().filter(|&s| s < k).sum()
    }

    /// Fraction of rows in classes smaller than `k`; 0 for an empty dataset.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction_below(&self, k: usize) -> f64 {
        if self.row_count == 0 {
            return 0.0;
        }
        self.rows_below(k) as f64 / self.row_count as f64
    }

    /// Classes holding exactly one row.
    #[must_use]
    pub fn singleton_count(&self) -> usize {
        self.sizes().filter(|&s| s == 1).count()
    }

    /// Class size → number of classes of that size.
    #[must_use]
    pub fn size_distribution(&self) -> BTreeMap<usize, usize> {
        let mut dist = BTreeMap::new();
        for size in self.sizes() {
            *dist.entry(size).or_insert(0) += 1;
        }
        dist
    }
}

/// Group every row of `dataset` under `spec`.
///
/// # Errors
///
/// - [`EngineError::InvalidParameter`] if the spec has no fields.
/// - [`EngineError::Core`] if the spec does not bind to the dataset schema.
pub fn group(dataset: &Dataset, spec: &QuasiIdentifierSpec) -> Result<GroupSizeReport> {
    let mut grouper = Grouper::new(dataset, spec)?;
    grouper.feed_all(dataset.rows());
    let report = grouper.finish();
    debug!(
        dataset = dataset.name(),
        qi = report.label(),
        rows = report.row_count(),
        classes = report.class_count(),
        "grouped"
    );
    Ok(report)
}

/// Group `dataset` under several specs in a single pass over its rows.
///
/// # Errors
///
/// Fails on the first spec that does not bind; no rows are read in that case.
pub fn group_many(
    dataset: &Dataset,
    specs: &[QuasiIdentifierSpec],
) -> Result<Vec<GroupSizeReport>> {
    let mut groupers = specs
        .iter()
        .map(|spec| Grouper::new(dataset, spec))
        .collect::<Result<Vec<_>>>()?;

    for row in dataset.rows() {
        for grouper in &mut groupers {
            grouper.feed(row);
        }
    }

    Ok(groupers.into_iter().map(Grouper::finish).collect())
}
