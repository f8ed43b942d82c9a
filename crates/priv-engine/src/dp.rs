//! Accuracy of the Laplace mechanism.
//!
//! For a query answer `x` with L1 sensitivity `Δ` released at privacy
//! budget `ε`, the mechanism publishes `x + noise` where
//!
//! ```text
//! scale = Δ / ε
//! u     ~ Uniform(−0.5, 0.5)
//! noise = scale · sign(u) · ln(1 − 2|u|)
//! ```
//!
//! The noise has mean 0, expected absolute value `scale`, and variance
//! `2 · scale²`. The evaluator runs repeated independent draws per ε and
//! reports the empirical error next to those expectations.

use priv_core::{Aggregate, ClampPolicy, Dataset, DpQuery, QiKey, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::grouping::Aggregation;
use crate::noise::NoiseSource;

/// One Laplace draw of the given scale from a centered uniform `u`.
#[must_use]
#[allow(clippy::suboptimal_flops)]
pub fn laplace_noise(scale: f64, u: f64) -> f64 {
    scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
}

/// Relative error convention: `|error| / max(|truth|, 1)`.
#[must_use]
pub fn relative_error(error: f64, truth: f64) -> f64 {
    error.abs() / truth.abs().max(1.0)
}

/// Check mechanism parameters shared by every evaluator.
///
/// # Errors
///
/// Returns [`EngineError::InvalidParameter`] for non-positive or non-finite
/// sensitivity or ε, zero trials, or an empty ε list.
pub fn validate(sensitivity: f64, epsilons: &[f64], trials: usize) -> Result<()> {
    if !sensitivity.is_finite() || sensitivity <= 0.0 {
        return Err(EngineError::invalid(format!(
            "sensitivity must be positive and finite, got {sensitivity}"
        )));
    }
    if epsilons.is_empty() {
        return Err(EngineError::invalid("no epsilon values given"));
    }
    if let Some(eps) = epsilons.iter().find(|e| !e.is_finite() || **e <= 0.0) {
        return Err(EngineError::invalid(format!(
            "epsilon must be positive and finite, got {eps}"
        )));
    }
    if trials == 0 {
        return Err(EngineError::invalid("trials must be at least 1"));
    }
    Ok(())
}

fn check_finite(value: f64, what: &str) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::invalid(format!("{what} must be finite, got {value}")))
    }
}

/// Empirical accuracy of one ε over all trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyResult {
    pub epsilon: f64,
    pub sensitivity: f64,
    pub scale: f64,
    pub true_value: f64,
    pub trials: usize,
    /// Released value per trial, after any clamp.
    pub noised_values: Vec<f64>,
    pub mean_absolute_error: f64,
    pub mean_relative_error: f64,
    /// Sample variance of the released values; 0 for a single trial.
    pub variance: f64,
    /// `scale`, when the release is a single unclamped Laplace draw.
    pub expected_absolute_error: Option<f64>,
    /// `2 · scale²`, under the same condition.
    pub expected_variance: Option<f64>,
}

#[allow(clippy::cast_precision_loss)]
fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

#[allow(clippy::cast_precision_loss)]
fn summarize(
    epsilon: f64,
    sensitivity: f64,
    scale: f64,
    true_value: f64,
    noised_values: Vec<f64>,
    theoretical: bool,
) -> AccuracyResult {
    let n = noised_values.len() as f64;
    let mean_absolute_error =
        noised_values.iter().map(|v| (v - true_value).abs()).sum::<f64>() / n;
    let mean_relative_error = noised_values
        .iter()
        .map(|v| relative_error(v - true_value, true_value))
        .sum::<f64>()
        / n;
    AccuracyResult {
        epsilon,
        sensitivity,
        scale,
        true_value,
        trials: noised_values.len(),
        variance: sample_variance(&noised_values),
        noised_values,
        mean_absolute_error,
        mean_relative_error,
        expected_absolute_error: theoretical.then_some(scale),
        expected_variance: theoretical.then(|| 2.0 * scale * scale),
    }
}

fn run_scalar(
    true_value: f64,
    sensitivity: f64,
    epsilon: f64,
    trials: usize,
    clamp: ClampPolicy,
    source: &mut dyn NoiseSource,
) -> AccuracyResult {
    let scale = sensitivity / epsilon;
    let noised = (0..trials)
        .map(|_| clamp.apply(true_value + laplace_noise(scale, source.uniform_centered())))
        .collect();
    summarize(
        epsilon,
        sensitivity,
        scale,
        true_value,
        noised,
        clamp == ClampPolicy::None,
    )
}

/// Release `true_value` `trials` times per ε and measure the error.
///
/// Results come back in the order of `epsilons`.
///
/// # Errors
///
/// Returns [`EngineError::InvalidParameter`] for invalid mechanism
/// parameters or a non-finite true value.
pub fn evaluate(
    true_value: f64,
    sensitivity: f64,
    epsilons: &[f64],
    trials: usize,
    source: &mut dyn NoiseSource,
) -> Result<Vec<AccuracyResult>> {
    evaluate_clamped(
        true_value,
        sensitivity,
        epsilons,
        trials,
        ClampPolicy::None,
        source,
    )
}

/// [`evaluate`] with a post-processing clamp on every released value.
///
/// # Errors
///
/// Same as [`evaluate`].
pub fn evaluate_clamped(
    true_value: f64,
    sensitivity: f64,
    epsilons: &[f64],
    trials: usize,
    clamp: ClampPolicy,
    source: &mut dyn NoiseSource,
) -> Result<Vec<AccuracyResult>> {
    validate(sensitivity, epsilons, trials)?;
    check_finite(true_value, "true value")?;
    Ok(epsilons
        .iter()
        .map(|&eps| run_scalar(true_value, sensitivity, eps, trials, clamp, source))
        .collect())
}

/// Accuracy of a grouped aggregate at one ε, averaged over groups and trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedAccuracyResult {
    pub epsilon: f64,
    pub sensitivity: f64,
    pub scale: f64,
    pub trials: usize,
    pub group_count: usize,
    /// `None` when there are no groups.
    pub mean_absolute_error: Option<f64>,
    pub mean_relative_error: Option<f64>,
}

/// Release every group's answer independently and average the error.
///
/// Each group gets its own draw per trial; `clamp` post-processes every
/// released answer (counts and sums cannot go negative).
///
/// # Errors
///
/// Same as [`evaluate`].
#[allow(clippy::cast_precision_loss)]
pub fn evaluate_grouped(
    groups: &[f64],
    sensitivity: f64,
    epsilons: &[f64],
    trials: usize,
    clamp: ClampPolicy,
    source: &mut dyn NoiseSource,
) -> Result<Vec<GroupedAccuracyResult>> {
    validate(sensitivity, epsilons, trials)?;
    for &truth in groups {
        check_finite(truth, "group answer")?;
    }

    Ok(epsilons
        .iter()
        .map(|&epsilon| {
            let scale = sensitivity / epsilon;
            let mut abs_sum = 0.0;
            let mut rel_sum = 0.0;
            for _ in 0..trials {
                for &truth in groups {
                    let released =
                        clamp.apply(truth + laplace_noise(scale, source.uniform_centered()));
                    abs_sum += (released - truth).abs();
                    rel_sum += relative_error(released - truth, truth);
                }
            }
            let draws = (trials * groups.len()) as f64;
            GroupedAccuracyResult {
                epsilon,
                sensitivity,
                scale,
                trials,
                group_count: groups.len(),
                mean_absolute_error: (!groups.is_empty()).then(|| abs_sum / draws),
                mean_relative_error: (!groups.is_empty()).then(|| rel_sum / draws),
            }
        })
        .collect())
}

/// Accuracy of a mean released as noised sum / noised count.
///
/// Each ε is split evenly between the two releases (sequential composition).
/// The count has sensitivity 1 and is clamped to at least 1.
///
/// # Errors
///
/// - [`EngineError::InvalidParameter`] for invalid mechanism parameters.
/// - [`EngineError::DegenerateInput`] when `count` is 0.
pub fn evaluate_mean(
    sum: f64,
    count: usize,
    sum_sensitivity: f64,
    epsilons: &[f64],
    trials: usize,
    source: &mut dyn NoiseSource,
) -> Result<Vec<AccuracyResult>> {
    validate(sum_sensitivity, epsilons, trials)?;
    check_finite(sum, "sum")?;
    if count == 0 {
        return Err(EngineError::DegenerateInput(
            "mean over zero rows is undefined".into(),
        ));
    }

    #[allow(clippy::cast_precision_loss)]
    let count = count as f64;
    let true_mean = sum / count;

    Ok(epsilons
        .iter()
        .map(|&epsilon| {
            let (sum_scale, count_scale) = mean_scales(sum_sensitivity, epsilon);
            let noised = (0..trials)
                .map(|_| release_mean(sum, count, sum_scale, count_scale, source))
                .collect();
            summarize(epsilon, sum_sensitivity, sum_scale, true_mean, noised, false)
        })
        .collect())
}

/// Sum and count scales when ε is split evenly between the two releases.
fn mean_scales(sum_sensitivity: f64, epsilon: f64) -> (f64, f64) {
    let half = epsilon / 2.0;
    (sum_sensitivity / half, 1.0 / half)
}

/// One noised sum over one noised count, the count clamped to at least 1.
fn release_mean(
    sum: f64,
    count: f64,
    sum_scale: f64,
    count_scale: f64,
    source: &mut dyn NoiseSource,
) -> f64 {
    let s = sum + laplace_noise(sum_scale, source.uniform_centered());
    let c = ClampPolicy::AtLeast { min: 1.0 }
        .apply(count + laplace_noise(count_scale, source.uniform_centered()));
    s / c
}

/// [`evaluate_mean`] per group, error averaged over groups and trials.
///
/// `groups` holds each group's `(sum, count)`; groups with a zero count have
/// no mean and must be left out by the caller. Every group spends the full
/// ε, split between its own sum and count releases.
///
/// # Errors
///
/// - [`EngineError::InvalidParameter`] for invalid mechanism parameters or
///   a non-finite sum.
/// - [`EngineError::DegenerateInput`] when a group has a zero count.
#[allow(clippy::cast_precision_loss)]
pub fn evaluate_grouped_mean(
    groups: &[(f64, usize)],
    sum_sensitivity: f64,
    epsilons: &[f64],
    trials: usize,
    source: &mut dyn NoiseSource,
) -> Result<Vec<GroupedAccuracyResult>> {
    validate(sum_sensitivity, epsilons, trials)?;
    for &(sum, count) in groups {
        check_finite(sum, "group sum")?;
        if count == 0 {
            return Err(EngineError::DegenerateInput(
                "mean over zero rows is undefined".into(),
            ));
        }
    }

    Ok(epsilons
        .iter()
        .map(|&epsilon| {
            let (sum_scale, count_scale) = mean_scales(sum_sensitivity, epsilon);
            let mut abs_sum = 0.0;
            let mut rel_sum = 0.0;
            for _ in 0..trials {
                for &(sum, count) in groups {
                    let count = count as f64;
                    let truth = sum / count;
                    let released = release_mean(sum, count, sum_scale, count_scale, source);
                    abs_sum += (released - truth).abs();
                    rel_sum += relative_error(released - truth, truth);
                }
            }
            let draws = (trials * groups.len()) as f64;
            GroupedAccuracyResult {
                epsilon,
                sensitivity: sum_sensitivity,
                scale: sum_scale,
                trials,
                group_count: groups.len(),
                mean_absolute_error: (!groups.is_empty()).then(|| abs_sum / draws),
                mean_relative_error: (!groups.is_empty()).then(|| rel_sum / draws),
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Queries over datasets
// ---------------------------------------------------------------------------

/// True answer of a [`DpQuery`] on a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryAnswer {
    Scalar(f64),
    Grouped(Vec<(QiKey, f64)>),
    Mean { sum: f64, count: usize },
    /// Per-group `(sum, count)` of the non-null cells, groups with no
    /// non-null cell left out.
    GroupedMean(Vec<(QiKey, f64, usize)>),
}

#[derive(Debug, Default)]
struct Tally {
    rows: usize,
    sum: f64,
    count: usize,
}

fn numeric_index(dataset: &Dataset, column: &str) -> Result<usize> {
    let index = dataset.column_index(column)?;
    let ty = dataset
        .schema()
        .type_of(column)
        .unwrap_or(priv_core::ColumnType::Text);
    if ty.is_numeric() {
        Ok(index)
    } else {
        Err(priv_core::CoreError::TypeMismatch {
            column: column.to_string(),
            expected: priv_core::ColumnType::Real,
            found: ty.to_string(),
        }
        .into())
    }
}

fn fold_cell(tally: &mut Tally, cell: Option<&Value>) {
    tally.rows += 1;
    if let Some(v) = cell.and_then(Value::as_f64) {
        tally.sum += v;
        tally.count += 1;
    }
}

/// Compute the exact answer of `query` on `dataset`.
///
/// Sums and means skip null cells. Grouped answers are sorted by group key
/// so repeated runs draw noise in the same order.
///
/// # Errors
///
/// Returns [`EngineError::Core`] for an unknown or non-numeric column, or a
/// group spec that does not bind.
#[allow(clippy::cast_precision_loss)]
pub fn true_answer(dataset: &Dataset, query: &DpQuery) -> Result<QueryAnswer> {
    let column = query
        .aggregate
        .column()
        .map(|c| numeric_index(dataset, c))
        .transpose()?;

    match (&query.aggregate, &query.group_by) {
        (aggregate, None) => {
            let mut total = Tally::default();
            for row in dataset.rows() {
                fold_cell(&mut total, column.map(|i| row.get(i)));
            }
            Ok(match aggregate {
                Aggregate::Count => QueryAnswer::Scalar(total.rows as f64),
                Aggregate::Sum { .. } => QueryAnswer::Scalar(total.sum),
                Aggregate::Mean { .. } => QueryAnswer::Mean {
                    sum: total.sum,
                    count: total.count,
                },
            })
        }
        (aggregate, Some(spec)) => {
            let mut agg: Aggregation<Tally> =
                Aggregation::bind(dataset.schema(), dataset.name(), spec)?;
            for row in dataset.rows() {
                agg.feed(row, |t, row| fold_cell(t, column.map(|i| row.get(i))));
            }
            if matches!(aggregate, Aggregate::Mean { .. }) {
                let mut groups: Vec<(QiKey, f64, usize)> = agg
                    .into_groups()
                    .into_iter()
                    .filter(|(_, t)| t.count > 0)
                    .map(|(key, t)| (key, t.sum, t.count))
                    .collect();
                groups.sort_by(|a, b| a.0.cmp(&b.0));
                return Ok(QueryAnswer::GroupedMean(groups));
            }
            let is_count = matches!(aggregate, Aggregate::Count);
            let mut groups: Vec<(QiKey, f64)> = agg
                .into_groups()
                .into_iter()
                .map(|(key, t)| (key, if is_count { t.rows as f64 } else { t.sum }))
                .collect();
            groups.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(QueryAnswer::Grouped(groups))
        }
    }
}

/// Accuracy of one query at one ε.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryAccuracy {
    Scalar(AccuracyResult),
    Grouped(GroupedAccuracyResult),
}

/// Evaluate `query` on `dataset` at every ε.
///
/// # Errors
///
/// Any error of [`true_answer`] or of the matching evaluator.
pub fn evaluate_query(
    dataset: &Dataset,
    query: &DpQuery,
    sensitivity: f64,
    epsilons: &[f64],
    trials: usize,
    source: &mut dyn NoiseSource,
) -> Result<Vec<QueryAccuracy>> {
    validate(sensitivity, epsilons, trials)?;
    let answer = true_answer(dataset, query)?;
    debug!(
        dataset = dataset.name(),
        query = %query.name,
        aggregate = query.aggregate.as_str(),
        "evaluating DP query"
    );

    Ok(match answer {
        QueryAnswer::Scalar(truth) => {
            evaluate_clamped(truth, sensitivity, epsilons, trials, query.clamp, source)?
                .into_iter()
                .map(QueryAccuracy::Scalar)
                .collect()
        }
        QueryAnswer::Grouped(groups) => {
            let truths: Vec<f64> = groups.iter().map(|(_, v)| *v).collect();
            evaluate_grouped(&truths, sensitivity, epsilons, trials, query.clamp, source)?
                .into_iter()
                .map(QueryAccuracy::Grouped)
                .collect()
        }
        QueryAnswer::Mean { sum, count } => {
            evaluate_mean(sum, count, sensitivity, epsilons, trials, source)?
                .into_iter()
                .map(QueryAccuracy::Scalar)
                .collect()
        }

        QueryAnswer::GroupedMean(groups) => {
            let tallies: Vec<(f64, usize)> = groups.iter().map(|(_, s, c)| (*s, *c)).collect();
            evaluate_grouped_mean(&tallies, sensitivity, epsilons, trials, source)?
                .into_iter()
                .map(QueryAccuracy::Grouped)
                .collect()
        }
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use priv_core::{ColumnType, Generalization, QuasiIdentifierSpec, Schema};
    use rstest::rstest;

    use super::*;
    use crate::noise::ChaChaNoise;

    /// Replays a fixed list of centered uniforms.
    struct Scripted {
        draws: Vec<f64>,
        next: usize,
    }

    impl Scripted {
        fn new(draws: &[f64]) -> Self {
            Self {
                draws: draws.to_vec(),
                next: 0,
            }
        }
    }

    impl NoiseSource for Scripted {
        fn uniform_centered(&mut self) -> f64 {
            let u = self.draws[self.next % self.draws.len()];
            self.next += 1;
            u
        }

        fn below(&mut self, n: usize) -> usize {
            self.next % n
        }
    }

    #[test]
    fn noise_formula_is_exact() {
        let scale = 2.0;
        assert!(laplace_noise(scale, 0.0).abs() < f64::EPSILON);
        let u: f64 = 0.25;
        let expected = scale * (1.0 - 2.0 * 0.25f64).ln();
        assert!((laplace_noise(scale, u) - expected).abs() < 1e-12);
        assert!((laplace_noise(scale, -u) + expected).abs() < 1e-12);
    }

    #[test]
    fn evaluate_uses_scripted_draws() {
        let mut source = Scripted::new(&[0.0, 0.25]);
        let results = evaluate(100.0, 1.0, &[0.5], 2, &mut source).unwrap();
        let r = &results[0];
        assert!((r.scale - 2.0).abs() < f64::EPSILON);
        let noise = 2.0 * 0.5f64.ln();
        assert_eq!(r.noised_values.len(), 2);
        assert!((r.noised_values[0] - 100.0).abs() < 1e-12);
        assert!((r.noised_values[1] - (100.0 + noise)).abs() < 1e-12);
        assert!((r.mean_absolute_error - noise.abs() / 2.0).abs() < 1e-12);
        assert!((r.mean_relative_error - noise.abs() / 200.0).abs() < 1e-12);
        assert_eq!(r.expected_absolute_error, Some(2.0));
        assert_eq!(r.expected_variance, Some(8.0));
    }

    #[test]
    fn relative_error_floors_denominator_at_one() {
        assert!((relative_error(0.5, 0.0) - 0.5).abs() < f64::EPSILON);
        assert!((relative_error(-3.0, 30.0) - 0.1).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case(1.0, vec![0.0], 10)]
    #[case(1.0, vec![-1.0], 10)]
    #[case(0.0, vec![1.0], 10)]
    #[case(f64::NAN, vec![1.0], 10)]
    #[case(1.0, vec![f64::INFINITY], 10)]
    #[case(1.0, vec![1.0], 0)]
    #[case(1.0, vec![], 10)]
    fn invalid_parameters(#[case] sensitivity: f64, #[case] epsilons: Vec<f64>, #[case] trials: usize) {
        let mut source = ChaChaNoise::seeded(1);
        let err = evaluate(10.0, sensitivity, &epsilons, trials, &mut source).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter(_)));
    }

    #[test]
    fn single_trial_has_zero_variance() {
        let mut source = ChaChaNoise::seeded(3);
        let r = &evaluate(5.0, 1.0, &[1.0], 1, &mut source).unwrap()[0];
        assert!(r.variance.abs() < f64::EPSILON);
    }

    #[test]
    fn results_follow_epsilon_order() {
        let mut source = ChaChaNoise::seeded(9);
        let results = evaluate(50.0, 1.0, &[5.0, 0.1, 1.0], 4, &mut source).unwrap();
        let eps: Vec<f64> = results.iter().map(|r| r.epsilon).collect();
        assert_eq!(eps, vec![5.0, 0.1, 1.0]);
    }

    #[test]
    fn clamp_keeps_counts_non_negative() {
        let mut source = ChaChaNoise::seeded(11);
        let r = &evaluate_clamped(0.0, 1.0, &[0.1], 200, ClampPolicy::NonNegative, &mut source)
            .unwrap()[0];
        assert!(r.noised_values.iter().all(|v| *v >= 0.0));
        assert_eq!(r.expected_absolute_error, None);
    }

    #[test]
    fn grouped_with_no_groups_is_undefined() {
        let mut source = ChaChaNoise::seeded(1);
        let r = &evaluate_grouped(&[], 1.0, &[1.0], 5, ClampPolicy::None, &mut source).unwrap()[0];
        assert_eq!(r.group_count, 0);
        assert_eq!(r.mean_absolute_error, None);
    }

    #[test]
    fn grouped_error_shrinks_with_budget() {
        let groups = [120.0, 45.0, 3.0, 900.0];
        let mut source = ChaChaNoise::seeded(5);
        let results =
            evaluate_grouped(&groups, 1.0, &[0.1, 5.0], 500, ClampPolicy::NonNegative, &mut source)
                .unwrap();
        assert!(results[0].mean_absolute_error.unwrap() > results[1].mean_absolute_error.unwrap());
    }

    #[test]
    fn mean_of_zero_rows_is_degenerate() {
        let mut source = ChaChaNoise::seeded(1);
        let err = evaluate_mean(0.0, 0, 100.0, &[1.0], 10, &mut source).unwrap_err();
        assert!(matches!(err, EngineError::DegenerateInput(_)));
    }

    #[test]
    fn mean_centers_on_true_mean_at_large_budget() {
        let mut source = ChaChaNoise::seeded(21);
        let r = &evaluate_mean(40_000.0, 1_000, 100.0, &[50.0], 200, &mut source).unwrap()[0];
        assert!((r.true_value - 40.0).abs() < f64::EPSILON);
        assert!(r.mean_absolute_error < 1.0, "{}", r.mean_absolute_error);
        assert_eq!(r.expected_absolute_error, None);
    }

    fn census() -> Dataset {
        let schema = Schema::new()
            .with("id", ColumnType::Integer)
            .with("age", ColumnType::Integer)
            .with("hours", ColumnType::Real)
            .with("occupation", ColumnType::Text);
        let rows = [
            (1, 23, Some(40.0), "Sales"),
            (2, 27, Some(35.0), "Sales"),
            (3, 41, None, "Tech"),
            (4, 45, Some(50.0), "Tech"),
        ]
        .into_iter()
        .map(|(id, age, hours, occ)| {
            vec![Value::Int(id), Value::Int(age), Value::from(hours), Value::text(occ)]
        })
        .collect();
        Dataset::new("census", schema, "id", rows).unwrap()
    }

    #[test]
    fn true_answers() {
        let ds = census();
        assert_eq!(
            true_answer(&ds, &DpQuery::new("n", Aggregate::Count)).unwrap(),
            QueryAnswer::Scalar(4.0)
        );
        assert_eq!(
            true_answer(&ds, &DpQuery::new("h", Aggregate::Sum { column: "hours".into() }))
                .unwrap(),
            QueryAnswer::Scalar(125.0)
        );
        assert_eq!(
            true_answer(&ds, &DpQuery::new("m", Aggregate::Mean { column: "hours".into() }))
                .unwrap(),
            QueryAnswer::Mean { sum: 125.0, count: 3 }
        );

        let by_decade = DpQuery::new("by_age", Aggregate::Count).grouped_by(
            QuasiIdentifierSpec::new("").field("age", Generalization::bucket(10)),
        );
        let QueryAnswer::Grouped(groups) = true_answer(&ds, &by_decade).unwrap() else {
            panic!("expected grouped answer");
        };
        assert_eq!(
            groups,
            vec![(vec![Value::Int(20)], 2.0), (vec![Value::Int(40)], 2.0)]
        );
    }

    #[test]
    fn grouped_mean_keeps_sum_and_count_per_group() {
        let q = DpQuery::new("avg_hours_by_occupation", Aggregate::Mean { column: "hours".into() })
            .grouped_by(QuasiIdentifierSpec::of_columns(&["occupation"]));
        assert_eq!(
            true_answer(&census(), &q).unwrap(),
            QueryAnswer::GroupedMean(vec![
                (vec![Value::text("Sales")], 75.0, 2),
                (vec![Value::text("Tech")], 50.0, 1),
            ])
        );
    }

    #[test]
    fn grouped_mean_error_shrinks_with_budget() {
        let ds = census();
        let q = DpQuery::new("avg_hours_by_occupation", Aggregate::Mean { column: "hours".into() })
            .grouped_by(QuasiIdentifierSpec::of_columns(&["occupation"]));
        let mut source = ChaChaNoise::seeded(13);
        let results = evaluate_query(&ds, &q, 100.0, &[0.1, 50.0], 300, &mut source).unwrap();
        let [QueryAccuracy::Grouped(low), QueryAccuracy::Grouped(high)] = results.as_slice() else {
            panic!("expected grouped results");
        };
        assert_eq!(low.group_count, 2);
        assert!((low.scale - 2000.0).abs() < 1e-9);
        assert!(low.mean_absolute_error.unwrap() > high.mean_absolute_error.unwrap());
    }

    #[test]
    fn grouped_mean_with_scripted_draws() {
        // u = 0 everywhere: no noise, released means equal the true means
        let mut source = Scripted::new(&[0.0]);
        let r = &evaluate_grouped_mean(&[(75.0, 2), (50.0, 1)], 100.0, &[1.0], 3, &mut source)
            .unwrap()[0];
        assert_eq!(r.group_count, 2);
        assert_eq!(r.mean_absolute_error, Some(0.0));
        assert_eq!(r.mean_relative_error, Some(0.0));
    }

    #[test]
    fn grouped_mean_rejects_empty_group() {
        let mut source = ChaChaNoise::seeded(1);
        let err =
            evaluate_grouped_mean(&[(10.0, 0)], 100.0, &[1.0], 3, &mut source).unwrap_err();
        assert!(matches!(err, EngineError::DegenerateInput(_)));
    }

    #[test]
    fn sum_over_text_column_is_schema_error() {
        let q = DpQuery::new("bad", Aggregate::Sum { column: "occupation".into() });
        let err = true_answer(&census(), &q).unwrap_err();
        assert_eq!(err.kind(), priv_core::ErrorKind::SchemaViolation);
    }

    #[test]
    fn evaluate_query_dispatches_by_shape() {
        let ds = census();
        let mut source = ChaChaNoise::seeded(2);
        let grouped = DpQuery::new("hours_by_occupation", Aggregate::Sum { column: "hours".into() })
            .grouped_by(QuasiIdentifierSpec::of_columns(&["occupation"]))
            .clamped(ClampPolicy::NonNegative);
        let results = evaluate_query(&ds, &grouped, 100.0, &[1.0, 5.0], 10, &mut source).unwrap();
        assert_eq!(results.len(), 2);
        assert!(matches!(&results[0], QueryAccuracy::Grouped(g) if g.group_count == 2));

        let scalar = DpQuery::new("n", Aggregate::Count);
        let results = evaluate_query(&ds, &scalar, 1.0, &[1.0], 10, &mut source).unwrap();
        assert!(matches!(&results[0], QueryAccuracy::Scalar(r) if r.trials == 10));
    }
}
