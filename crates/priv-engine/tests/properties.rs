//! Cross-module properties of the analyzers on generated datasets.

use std::collections::HashSet;

use priv_core::{ColumnType, Dataset, Generalization, LinkageField, LinkageSpec, QuasiIdentifierSpec, Schema, Value};
use priv_engine::{
    ChaChaNoise, NoiseSource, assess, attack, compare, dp, group, kanon, sample_auxiliary,
};

fn people_schema() -> Schema {
    Schema::new()
        .with("id", ColumnType::Integer)
        .with("age", ColumnType::Integer)
        .with("sex", ColumnType::Text)
        .with("zip", ColumnType::Text)
}

fn random_people(n: usize, seed: u64) -> Dataset {
    let mut source = ChaChaNoise::seeded(seed);
    let rows = (0..n)
        .map(|i| {
            let age = i64::try_from(18 + source.below(70)).unwrap();
            let sex = if source.below(2) == 0 { "F" } else { "M" };
            let zip = format!("021{:02}", source.below(40));
            vec![
                Value::Int(i64::try_from(i).unwrap()),
                Value::Int(age),
                Value::text(sex),
                Value::text(zip),
            ]
        })
        .collect();
    Dataset::new("people", people_schema(), "id", rows).unwrap()
}

fn age_sex(width: i64) -> QuasiIdentifierSpec {
    QuasiIdentifierSpec::new("")
        .field("age", Generalization::bucket(width))
        .column("sex")
}

#[test]
fn classes_partition_the_rows() {
    let ds = random_people(2_000, 1);
    let report = group(&ds, &age_sex(5).column("zip")).unwrap();

    assert_eq!(report.sizes().sum::<usize>(), ds.len());
    let mut seen = HashSet::new();
    for members in report.classes().values() {
        for key in members {
            assert!(seen.insert(key.clone()), "row key {key} in two classes");
        }
    }
    assert_eq!(seen.len(), ds.len());
}

#[test]
fn grouping_by_row_key_gives_singletons() {
    let ds = random_people(500, 2);
    let report = group(&ds, &QuasiIdentifierSpec::of_columns(&["id"])).unwrap();
    assert_eq!(report.class_count(), 500);
    assert_eq!(report.max_class_size(), Some(1));
}

#[test]
fn violating_fraction_grows_with_k() {
    let ds = random_people(1_500, 3);
    let ks: Vec<usize> = (1..=40).collect();
    let reports = assess(&ds, &age_sex(1).column("zip"), &ks).unwrap();
    let fractions: Vec<f64> = reports.values().map(|r| r.violating_fraction).collect();
    for pair in fractions.windows(2) {
        assert!(pair[0] <= pair[1], "{fractions:?}");
    }
}

#[test]
fn dp_error_shrinks_as_epsilon_grows() {
    let mut source = ChaChaNoise::seeded(4);
    let results = dp::evaluate(1_000.0, 1.0, &[0.1, 5.0], 1_000, &mut source).unwrap();
    assert!(results[0].mean_absolute_error > results[1].mean_absolute_error);
}

#[test]
fn one_class_defeats_linkage() {
    let rows = (0..60)
        .map(|i| vec![Value::Int(i), Value::Int(30 + i % 10), Value::text("F"), Value::text("02139")])
        .collect();
    let masked = Dataset::new("generalized", people_schema(), "id", rows).unwrap();
    let mut source = ChaChaNoise::seeded(5);
    let aux = sample_auxiliary(&masked, &["age", "sex"], 25, &mut source).unwrap();
    let spec = LinkageSpec::new(vec![LinkageField::bucket("age", 10), LinkageField::exact("sex")]);

    let result = attack(&masked, &aux, &spec).unwrap();
    assert_eq!(result.ambiguous, 25);
    assert_eq!(result.success_rate, Some(0.0));
    assert_eq!(result.ambiguous_containing_truth, 25);
}

#[test]
fn column_compared_with_itself_is_lossless() {
    let ds = random_people(800, 6);
    let result = compare("zip", ds.column("zip").unwrap(), ds.column("zip").unwrap());
    assert_eq!(result.cardinality_ratio, Some(1.0));
    assert!(result.js_divergence.unwrap().abs() < 1e-12);
}

/// 10,000 rows in 25 five-year buckets × 2 sexes, 200 rows per cell. Inside
/// each bucket 190 rows share the first age and 10 the last.
fn skewed_census() -> Dataset {
    let mut rows = Vec::with_capacity(10_000);
    let mut id = 0;
    for bucket in 0..25 {
        for sex in ["F", "M"] {
            for n in 0..200 {
                let age = bucket * 5 + if n < 190 { 0 } else { 4 };
                rows.push(vec![Value::Int(id), Value::Int(age), Value::text(sex), Value::Null]);
                id += 1;
            }
        }
    }
    Dataset::new("census", people_schema(), "id", rows).unwrap()
}

#[test]
fn coarse_buckets_reach_k_fine_buckets_do_not() {
    let ds = skewed_census();
    assert_eq!(ds.len(), 10_000);

    let coarse = assess(&ds, &age_sex(5), &[20]).unwrap();
    assert_eq!(coarse[&20].violating_rows, 0);
    assert!(coarse[&20].is_k_anonymous);

    let fine = assess(&ds, &age_sex(1), &[20]).unwrap();
    assert!(fine[&20].violating_fraction > coarse[&20].violating_fraction);
    assert!((fine[&20].violating_fraction - 0.05).abs() < 1e-12);

    let groups = group(&ds, &age_sex(1)).unwrap();
    let direct = kanon::report_for(&groups, 20).unwrap();
    assert_eq!(direct, fine[&20]);
}

#[test]
fn count_release_error_matches_scale() {
    let mut source = ChaChaNoise::seeded(8);
    let results = dp::evaluate(5_000.0, 1.0, &[1.0], 10_000, &mut source).unwrap();
    let r = &results[0];
    assert!((r.mean_absolute_error - 1.0).abs() < 0.05, "MAE {}", r.mean_absolute_error);
    assert!((r.variance - 2.0).abs() < 0.25, "variance {}", r.variance);
    assert!(r.mean_relative_error < 0.001);
}

#[test]
fn entropy_source_draws_in_range() {
    let mut source = ChaChaNoise::from_entropy();
    for _ in 0..1_000 {
        let u = source.uniform_centered();
        assert!(u > -0.5 && u < 0.5);
    }
}
