//! Re-identification by linkage on quasi-identifiers.
//!
//! The adversary holds auxiliary records (quasi-identifiers plus a true
//! identity) and joins them against a published dataset. Masked rows are
//! indexed once by generalized QI tuple through the grouping engine, then
//! each auxiliary record costs a single hash lookup. A unique candidate is
//! a success only when it carries the adversary's identity; ambiguous
//! candidate sets never count as success.

use std::collections::HashSet;

use priv_core::{
    AuxiliaryDataset, AuxiliaryRecord, ColumnType, CoreError, Dataset, LinkageSpec, QiKey, Schema,
    Value,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::grouping::Grouper;
use crate::noise::NoiseSource;

/// Classification of one linkage attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// One candidate, and it is the right person.
    Correct,
    /// One candidate, and it is someone else.
    FalsePositive,
    /// More than one candidate.
    Ambiguous,
    /// No candidate.
    NoMatch,
}

/// One auxiliary record's attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkageAttempt {
    pub identity: Value,
    pub candidate_count: usize,
    /// Identity of the sole candidate for a unique match.
    pub matched_identity: Option<Value>,
    /// Whether the true identity is among the candidates at all.
    pub truth_in_candidates: bool,
    pub outcome: MatchOutcome,
}

/// Aggregate outcome of a linkage attack.
///
/// Rates are `None` when the auxiliary dataset is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkageResult {
    pub auxiliary_records: usize,
    pub masked_rows: usize,
    pub masked_classes: usize,
    pub correct_matches: usize,
    pub false_positives: usize,
    pub ambiguous: usize,
    pub no_match: usize,
    /// Ambiguous attempts whose candidates include the true identity.
    pub ambiguous_containing_truth: usize,
    /// Correct unique matches / auxiliary records.
    pub success_rate: Option<f64>,
    pub false_positive_rate: Option<f64>,
    pub ambiguous_rate: Option<f64>,
    pub no_match_rate: Option<f64>,
    /// Attempts whose candidate set contains the truth, unique or not.
    /// Reported for comparison only; this is not a success rate.
    pub optimistic_rate: Option<f64>,
    /// Linkage was impossible because a field is opaque.
    pub opaque: bool,
}

impl LinkageResult {
    #[allow(clippy::cast_precision_loss)]
    fn from_attempts(
        attempts: &[LinkageAttempt],
        masked_rows: usize,
        masked_classes: usize,
        opaque: bool,
    ) -> Self {
        let count = |outcome: MatchOutcome| attempts.iter().filter(|a| a.outcome == outcome).count();
        let correct_matches = count(MatchOutcome::Correct);
        let false_positives = count(MatchOutcome::FalsePositive);
        let ambiguous = count(MatchOutcome::Ambiguous);
        let no_match = count(MatchOutcome::NoMatch);
        let ambiguous_containing_truth = attempts
            .iter()
            .filter(|a| a.outcome == MatchOutcome::Ambiguous && a.truth_in_candidates)
            .count();
        let containing_truth = attempts.iter().filter(|a| a.truth_in_candidates).count();

        let total = attempts.len();
        let rate = |n: usize| (total > 0).then(|| n as f64 / total as f64);

        Self {
            auxiliary_records: total,
            masked_rows,
            masked_classes,
            correct_matches,
            false_positives,
            ambiguous,
            no_match,
            ambiguous_containing_truth,
            success_rate: rate(correct_matches),
            false_positive_rate: rate(false_positives),
            ambiguous_rate: rate(ambiguous),
            no_match_rate: rate(no_match),
            optimistic_rate: rate(containing_truth),
            opaque,
        }
    }
}

fn check_field_types(
    masked: &Dataset,
    auxiliary: &AuxiliaryDataset,
    spec: &LinkageSpec,
) -> Result<()> {
    for field in &spec.fields {
        masked.column_index(&field.column)?;
        auxiliary.column_index(&field.column)?;
        if field.is_opaque() {
            continue;
        }
        let published = masked.schema().type_of(&field.column);
        let known = auxiliary.schema().type_of(&field.column);
        if let (Some(expected), Some(found)) = (published, known) {
            if expected != found {
                return Err(CoreError::TypeMismatch {
                    column: field.column.clone(),
                    expected,
                    found: found.to_string(),
                }
                .into());
            }
        }
    }
    Ok(())
}

fn classify(record: &AuxiliaryRecord, candidates: &[Value], truth_in_candidates: bool) -> LinkageAttempt {
    let (outcome, matched_identity) = match candidates {
        [] => (MatchOutcome::NoMatch, None),
        [only] if *only == record.identity => (MatchOutcome::Correct, Some(only.clone())),
        [only] => (MatchOutcome::FalsePositive, Some(only.clone())),
        _ => (MatchOutcome::Ambiguous, None),
    };
    LinkageAttempt {
        identity: record.identity.clone(),
        candidate_count: candidates.len(),
        matched_identity,
        truth_in_candidates,
        outcome,
    }
}

fn run(
    masked: &Dataset,
    auxiliary: &AuxiliaryDataset,
    spec: &LinkageSpec,
) -> Result<(Vec<LinkageAttempt>, usize)> {
    if spec.fields.is_empty() {
        return Err(EngineError::invalid("linkage spec has no fields"));
    }
    check_field_types(masked, auxiliary, spec)?;
    let identity_index = match &spec.identity_column {
        Some(column) => masked.column_index(column)?,
        None => masked.row_key_index(),
    };

    if spec.has_opaque_field() {
        debug!(masked = masked.name(), "linkage spec has an opaque field, no candidates");
        let attempts = auxiliary
            .records()
            .iter()
            .map(|record| classify(record, &[], false))
            .collect();
        return Ok((attempts, 0));
    }

    let mut grouper = Grouper::with_member_column(masked, &spec.masked_spec(), identity_index)?;
    grouper.feed_all(masked.rows());
    let index = grouper.finish();

    let membership: HashSet<(&QiKey, &Value)> = index
        .classes()
        .iter()
        .flat_map(|(key, members)| members.iter().map(move |m| (key, m)))
        .collect();

    let probe = spec
        .auxiliary_spec()
        .bind(auxiliary.schema(), auxiliary.name())?;

    let attempts = auxiliary
        .records()
        .iter()
        .map(|record| {
            let key = probe.key_with(|i| record.get(i));
            match index.classes().get_key_value(&key) {
                Some((stored, members)) => {
                    classify(record, members, membership.contains(&(stored, &record.identity)))
                }
                None => classify(record, &[], false),
            }
        })
        .collect();

    Ok((attempts, index.class_count()))
}

/// Per-record linkage attempts.
///
/// # Errors
///
/// - [`EngineError::InvalidParameter`] for a spec with no fields.
/// - [`EngineError::Core`] when a field or the identity column is missing,
///   or a field's type differs between the two datasets.
pub fn link_attempts(
    masked: &Dataset,
    auxiliary: &AuxiliaryDataset,
    spec: &LinkageSpec,
) -> Result<Vec<LinkageAttempt>> {
    run(masked, auxiliary, spec).map(|(attempts, _)| attempts)
}

/// Run the attack and summarize it.
///
/// # Errors
///
/// Same as [`link_attempts`].
pub fn attack(
    masked: &Dataset,
    auxiliary: &AuxiliaryDataset,
    spec: &LinkageSpec,
) -> Result<LinkageResult> {
    let (attempts, classes) = run(masked, auxiliary, spec)?;
    let result =
        LinkageResult::from_attempts(&attempts, masked.len(), classes, spec.has_opaque_field());
    debug!(
        masked = masked.name(),
        auxiliary = auxiliary.name(),
        correct = result.correct_matches,
        ambiguous = result.ambiguous,
        "linkage attack"
    );
    Ok(result)
}

/// Draw `size` raw records without replacement as adversary knowledge.
///
/// Each sampled record keeps only `columns` and is labelled with its row
/// key. Asking for more records than exist yields all of them.
///
/// # Errors
///
/// Returns [`EngineError::Core`] if a column is not in the raw schema.
pub fn sample_auxiliary<S: AsRef<str>>(
    raw: &Dataset,
    columns: &[S],
    size: usize,
    source: &mut dyn NoiseSource,
) -> Result<AuxiliaryDataset> {
    let indexes = columns
        .iter()
        .map(|c| raw.column_index(c.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    let schema: Schema = columns
        .iter()
        .map(|c| {
            let name = c.as_ref();
            (name, raw.schema().type_of(name).unwrap_or(ColumnType::Text))
        })
        .collect();

    let n = raw.len();
    let take = size.min(n);
    let mut order: Vec<usize> = (0..n).collect();
    for i in 0..take {
        let j = i + source.below(n - i);
        order.swap(i, j);
    }

    let records = order[..take]
        .iter()
        .map(|&row_idx| {
            let row = &raw.rows()[row_idx];
            AuxiliaryRecord {
                identity: raw.key_of(row).clone(),
                cells: indexes.iter().map(|&i| row.get(i).clone()).collect(),
            }
        })
        .collect();

    Ok(AuxiliaryDataset::new(
        format!("{}-auxiliary", raw.name()),
        schema,
        records,
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use priv_core::{Generalization, LinkageField};

    use super::*;
    use crate::noise::ChaChaNoise;

    fn schema() -> Schema {
        Schema::new()
            .with("id", ColumnType::Text)
            .with("age", ColumnType::Integer)
            .with("zip", ColumnType::Text)
    }

    fn published(rows: &[(&str, i64, &str)]) -> Dataset {
        let rows = rows
            .iter()
            .map(|(id, age, zip)| vec![Value::text(*id), Value::Int(*age), Value::text(*zip)])
            .collect();
        Dataset::new("masked", schema(), "id", rows).unwrap()
    }

    fn adversary(rows: &[(&str, i64, &str)]) -> AuxiliaryDataset {
        let records = rows
            .iter()
            .map(|(id, age, zip)| AuxiliaryRecord {
                identity: Value::text(*id),
                cells: vec![Value::text(*id), Value::Int(*age), Value::text(*zip)],
            })
            .collect();
        AuxiliaryDataset::new("aux", schema(), records)
    }

    fn exact_spec() -> LinkageSpec {
        LinkageSpec::new(vec![LinkageField::exact("age"), LinkageField::exact("zip")])
    }

    #[test]
    fn classifies_every_outcome() {
        let masked = published(&[
            ("alice", 30, "02139"),
            ("bob", 41, "02139"),
            ("carol", 41, "02139"),
            ("dave", 55, "10001"),
        ]);
        let aux = adversary(&[
            ("alice", 30, "02139"), // correct
            ("bob", 41, "02139"),   // ambiguous, truth inside
            ("erin", 55, "10001"),  // false positive (dave)
            ("frank", 70, "94501"), // no match
        ]);
        let attempts = link_attempts(&masked, &aux, &exact_spec()).unwrap();
        let outcomes: Vec<MatchOutcome> = attempts.iter().map(|a| a.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                MatchOutcome::Correct,
                MatchOutcome::Ambiguous,
                MatchOutcome::FalsePositive,
                MatchOutcome::NoMatch,
            ]
        );
        assert_eq!(attempts[2].matched_identity, Some(Value::text("dave")));
        assert!(attempts[1].truth_in_candidates);

        let result = attack(&masked, &aux, &exact_spec()).unwrap();
        assert_eq!(result.correct_matches, 1);
        assert_eq!(result.ambiguous_containing_truth, 1);
        assert_eq!(result.success_rate, Some(0.25));
        assert_eq!(result.false_positive_rate, Some(0.25));
        assert_eq!(result.optimistic_rate, Some(0.5));
        assert_eq!(result.masked_classes, 3);
    }

    #[test]
    fn bucket_policy_matches_within_interval() {
        // Published ages are decade lower bounds.
        let masked = published(&[("alice", 30, "02139"), ("bob", 40, "02139")]);
        let aux = adversary(&[("alice", 37, "02139"), ("bob", 40, "02139"), ("bob", 50, "02139")]);
        let spec = LinkageSpec::new(vec![LinkageField::bucket("age", 10), LinkageField::exact("zip")]);
        let outcomes: Vec<MatchOutcome> = link_attempts(&masked, &aux, &spec)
            .unwrap()
            .iter()
            .map(|a| a.outcome)
            .collect();
        assert_eq!(
            outcomes,
            vec![MatchOutcome::Correct, MatchOutcome::Correct, MatchOutcome::NoMatch]
        );
    }

    #[test]
    fn generalized_policy_transforms_only_auxiliary_side() {
        let masked = published(&[("alice", 30, "021"), ("bob", 40, "100")]);
        let aux = adversary(&[("bob", 40, "10001")]);
        let spec = LinkageSpec::new(vec![
            LinkageField::exact("age"),
            LinkageField::generalized("zip", Generalization::prefix(3)),
        ]);
        let result = attack(&masked, &aux, &spec).unwrap();
        assert_eq!(result.correct_matches, 1);
    }

    #[test]
    fn opaque_field_yields_no_candidates() {
        let masked = published(&[("alice", 30, "9f2c"), ("bob", 41, "77ab")]);
        let aux = adversary(&[("alice", 30, "02139"), ("bob", 41, "10001")]);
        let spec = LinkageSpec::new(vec![LinkageField::exact("age"), LinkageField::opaque("zip")]);
        let result = attack(&masked, &aux, &spec).unwrap();
        assert!(result.opaque);
        assert_eq!(result.no_match, 2);
        assert_eq!(result.success_rate, Some(0.0));
    }

    #[test]
    fn empty_auxiliary_has_undefined_rates() {
        let masked = published(&[("alice", 30, "02139")]);
        let result = attack(&masked, &adversary(&[]), &exact_spec()).unwrap();
        assert_eq!(result.auxiliary_records, 0);
        assert_eq!(result.success_rate, None);
        assert_eq!(result.optimistic_rate, None);
    }

    #[test]
    fn identity_column_overrides_row_key() {
        let schema = Schema::new()
            .with("row", ColumnType::Integer)
            .with("person", ColumnType::Text)
            .with("age", ColumnType::Integer);
        let masked = Dataset::new(
            "masked",
            schema.clone(),
            "row",
            vec![vec![Value::Int(1), Value::text("alice"), Value::Int(30)]],
        )
        .unwrap();
        let aux = AuxiliaryDataset::new(
            "aux",
            schema,
            vec![AuxiliaryRecord {
                identity: Value::text("alice"),
                cells: vec![Value::Null, Value::text("alice"), Value::Int(30)],
            }],
        );
        let spec = LinkageSpec::new(vec![LinkageField::exact("age")]).with_identity_column("person");
        assert_eq!(attack(&masked, &aux, &spec).unwrap().correct_matches, 1);

        let by_row_key = LinkageSpec::new(vec![LinkageField::exact("age")]);
        assert_eq!(attack(&masked, &aux, &by_row_key).unwrap().false_positives, 1);
    }

    #[test]
    fn type_mismatch_between_sides_is_schema_error() {
        let masked = published(&[("alice", 30, "02139")]);
        let aux_schema = Schema::new()
            .with("id", ColumnType::Text)
            .with("age", ColumnType::Text)
            .with("zip", ColumnType::Text);
        let aux = AuxiliaryDataset::new("aux", aux_schema, vec![]);
        let err = attack(&masked, &aux, &exact_spec()).unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::TypeMismatch { .. })));
    }

    #[test]
    fn sampling_is_without_replacement() {
        let rows: Vec<(String, i64, &str)> =
            (0..50).map(|i| (format!("p{i}"), 20 + i % 7, "02139")).collect();
        let refs: Vec<(&str, i64, &str)> = rows.iter().map(|(a, b, c)| (a.as_str(), *b, *c)).collect();
        let raw = published(&refs);
        let mut source = ChaChaNoise::seeded(4);

        let aux = sample_auxiliary(&raw, &["age", "zip"], 20, &mut source).unwrap();
        assert_eq!(aux.len(), 20);
        assert_eq!(aux.schema().len(), 2);
        let distinct: HashSet<&Value> = aux.records().iter().map(|r| &r.identity).collect();
        assert_eq!(distinct.len(), 20);

        let all = sample_auxiliary(&raw, &["age"], 500, &mut source).unwrap();
        assert_eq!(all.len(), 50);
    }
}
