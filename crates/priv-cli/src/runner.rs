//! Parameter sweep over every configured analysis.
//!
//! Datasets are loaded once per variant and shared read-only. The sweep is
//! expanded into independent configurations (variant × QI spec, query × ε,
//! linkage target, utility column or grouping) that run on the rayon pool.
//! Every configuration ends as records in the sink: measured values, or an
//! explicit failure or skip carrying the error kind. A failing
//! configuration never stops its siblings.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use priv_config::PrivConfig;
use priv_core::{
    AuxiliaryDataset, Dataset, ErrorKind, MetricKind, MetricRecord, Outcome, RunSummary,
};
use priv_engine::{
    ChaChaNoise, EngineError, NoiseSource, dp, grouping, kanon, linkage, utility,
};
use priv_sink::{ResultSink, SinkError};
use priv_source::{DataSource, SourceError};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use tracing::{debug, info, warn};

use crate::progress::Progress;

/// Noise stream reserved for drawing the adversary sample.
const AUXILIARY_STREAM: u64 = u64::MAX;

/// Why a configuration could not be measured.
#[derive(Debug, Clone)]
struct Failure {
    kind: ErrorKind,
    message: String,
}

impl From<EngineError> for Failure {
    fn from(err: EngineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<&SourceError> for Failure {
    fn from(err: &SourceError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<priv_config::ConfigError> for Failure {
    fn from(err: priv_config::ConfigError) -> Self {
        Self {
            kind: ErrorKind::InvalidParameter,
            message: err.to_string(),
        }
    }
}

type Measured<T> = Result<T, Failure>;

fn outcome<T: Serialize>(result: Measured<T>) -> Outcome {
    match result {
        Ok(report) => Outcome::measured(&report)
            .unwrap_or_else(|e| Outcome::failed(ErrorKind::DegenerateInput, e.to_string())),
        Err(f) if f.kind == ErrorKind::MissingVariant => Outcome::skipped(f.kind, f.message),
        Err(f) => Outcome::failed(f.kind, f.message),
    }
}

/// Seeded stream `stream` of the run seed, or an OS-seeded source.
#[must_use]
pub fn noise_source(seed: Option<u64>, stream: u64) -> ChaChaNoise {
    seed.map_or_else(ChaChaNoise::from_entropy, |seed| ChaChaNoise::derive(seed, stream))
}

/// Source of the adversary sample, shared by `run` and `link` so one seed
/// draws the same records in both.
#[must_use]
pub fn adversary_source(seed: Option<u64>) -> ChaChaNoise {
    noise_source(seed, AUXILIARY_STREAM)
}

/// Adversary knowledge taken from a configured auxiliary variant.
///
/// # Errors
///
/// Returns [`EngineError`] if the identity column is missing.
pub fn configured_adversary(
    config: &PrivConfig,
    dataset: &Dataset,
) -> Result<AuxiliaryDataset, EngineError> {
    let identity = config
        .linkage
        .auxiliary_identity_column
        .as_deref()
        .unwrap_or_else(|| dataset.row_key_column());
    Ok(AuxiliaryDataset::from_dataset(dataset, identity)?)
}

/// Adversary knowledge sampled from raw records, labelled with row keys.
///
/// # Errors
///
/// Returns [`EngineError`] if a linkage field is not a raw column.
pub fn sampled_adversary(
    config: &PrivConfig,
    raw: &Dataset,
    noise: &mut dyn NoiseSource,
) -> Result<AuxiliaryDataset, EngineError> {
    let spec = config.linkage.spec();
    let columns: Vec<&str> = spec.columns().collect();
    let sample =
        linkage::sample_auxiliary(raw, &columns, config.analysis.auxiliary_sample_size, noise)?;
    debug!(records = sample.len(), "sampled adversary records");
    Ok(sample)
}

/// One independent unit of the sweep.
#[derive(Debug, Clone, PartialEq)]
enum Configuration {
    KAnonymity { variant: String, spec: usize },
    DpAccuracy { query: usize, epsilon: f64 },
    Linkage { variant: String },
    ColumnUtility { variant: String, column: String },
    AggregateUtility { variant: String, spec: usize },
}

impl Configuration {
    /// Records this configuration writes when it runs.
    const fn record_count(&self, k_values: usize) -> usize {
        match self {
            Self::KAnonymity { .. } => k_values,
            _ => 1,
        }
    }
}

/// Counts of records written, by outcome.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    succeeded: usize,
    failed: usize,
    skipped: usize,
    not_started: usize,
}

impl Tally {
    const fn count(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Measured { .. } => self.succeeded += 1,
            Outcome::Failed { .. } => self.failed += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
        }
    }

    const fn merge(self, other: Self) -> Self {
        Self {
            succeeded: self.succeeded + other.succeeded,
            failed: self.failed + other.failed,
            skipped: self.skipped + other.skipped,
            not_started: self.not_started + other.not_started,
        }
    }
}

/// Variants materialized before the sweep starts.
struct Loaded {
    datasets: HashMap<String, Result<Arc<Dataset>, Failure>>,
    auxiliary: Option<Result<Arc<AuxiliaryDataset>, Failure>>,
}

impl Loaded {
    fn dataset(&self, variant: &str) -> Measured<&Dataset> {
        match self.datasets.get(variant) {
            Some(Ok(dataset)) => Ok(dataset.as_ref()),
            Some(Err(failure)) => Err(failure.clone()),
            None => Err(Failure {
                kind: ErrorKind::MissingVariant,
                message: format!("Dataset variant '{variant}' was not loaded"),
            }),
        }
    }
}

/// A sweep bound to its configuration, data, and sink.
pub struct Sweep<'a> {
    config: &'a PrivConfig,
    source: &'a dyn DataSource,
    sink: &'a dyn ResultSink,
    experiment_id: String,
}

impl<'a> Sweep<'a> {
    #[must_use]
    pub fn new(
        config: &'a PrivConfig,
        source: &'a dyn DataSource,
        sink: &'a dyn ResultSink,
        experiment_id: impl Into<String>,
    ) -> Self {
        Self {
            config,
            source,
            sink,
            experiment_id: experiment_id.into(),
        }
    }

    fn raw(&self) -> &str {
        &self.config.datasets.raw
    }

    /// Run every configuration and write the closing summary.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if a record or the summary cannot be stored.
    /// Analysis failures are recorded, never returned.
    pub fn run(&self, progress: &Progress) -> Result<RunSummary, SinkError> {
        let started_at = Utc::now();
        let deadline = self
            .config
            .analysis
            .run_timeout_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));

        let variants = self.config.selected_variants();
        let configurations = self.plan(&variants);
        info!(
            experiment_id = %self.experiment_id,
            variants = variants.len(),
            configurations = configurations.len(),
            "starting sweep"
        );

        let loaded = self.load(&variants);
        progress.set_length(configurations.len() as u64);

        let k_count = self.config.analysis.k_values.len();
        let tallies = configurations
            .par_iter()
            .enumerate()
            .map(|(index, configuration)| -> Result<Tally, SinkError> {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return Ok(Tally {
                        not_started: configuration.record_count(k_count),
                        ..Tally::default()
                    });
                }
                let mut tally = Tally::default();
                for record in self.execute(configuration, index, &loaded) {
                    if !record.outcome.is_measured() {
                        warn!(
                            metric = record.metric_kind.as_str(),
                            variant = %record.dataset_variant,
                            parameters = %record.parameters,
                            "configuration not measured"
                        );
                    }
                    self.sink.append(&record)?;
                    tally.count(&record.outcome);
                }
                progress.inc(1);
                Ok(tally)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let tally = tallies.into_iter().fold(Tally::default(), Tally::merge);

        let summary = RunSummary {
            experiment_id: self.experiment_id.clone(),
            started_at,
            finished_at: Utc::now(),
            complete: tally.not_started == 0,
            succeeded: tally.succeeded,
            failed: tally.failed,
            skipped: tally.skipped,
            not_started: tally.not_started,
        };
        self.sink.finish(&summary)?;
        info!(
            experiment_id = %summary.experiment_id,
            complete = summary.complete,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            not_started = summary.not_started,
            "sweep finished"
        );
        Ok(summary)
    }

    /// Expand the configuration into independent units, in a stable order.
    fn plan(&self, variants: &[String]) -> Vec<Configuration> {
        let config = self.config;
        let mut plan = Vec::new();

        for variant in variants {
            for spec in 0..config.quasi_identifiers.len() {
                plan.push(Configuration::KAnonymity {
                    variant: variant.clone(),
                    spec,
                });
            }
        }

        for query in 0..config.dp_queries.len() {
            for &epsilon in &config.analysis.epsilons {
                plan.push(Configuration::DpAccuracy { query, epsilon });
            }
        }

        if config.linkage.is_configured() {
            for variant in variants {
                plan.push(Configuration::Linkage {
                    variant: variant.clone(),
                });
            }
        }

        for variant in variants.iter().filter(|v| v.as_str() != self.raw()) {
            for column in &config.utility.columns {
                plan.push(Configuration::ColumnUtility {
                    variant: variant.clone(),
                    column: column.clone(),
                });
            }
            for spec in 0..config.utility.group_by.len() {
                plan.push(Configuration::AggregateUtility {
                    variant: variant.clone(),
                    spec,
                });
            }
        }

        plan
    }

    /// Load every variant the plan touches, once.
    fn load(&self, variants: &[String]) -> Loaded {
        let mut names: BTreeSet<&str> = variants.iter().map(String::as_str).collect();
        names.insert(self.raw());
        if let Some(auxiliary) = &self.config.linkage.auxiliary {
            names.insert(auxiliary);
        }

        let datasets: HashMap<String, Result<Arc<Dataset>, Failure>> = names
            .into_par_iter()
            .map(|name| {
                let loaded = self.source.load(name).map(Arc::new).map_err(|err| {
                    warn!(variant = name, error = %err, "variant not loaded");
                    Failure::from(&err)
                });
                (name.to_string(), loaded)
            })
            .collect();

        let mut loaded = Loaded {
            datasets,
            auxiliary: None,
        };
        if self.config.linkage.is_configured() {
            loaded.auxiliary = Some(self.auxiliary(&loaded).map(Arc::new));
        }
        loaded
    }

    fn auxiliary(&self, loaded: &Loaded) -> Measured<AuxiliaryDataset> {
        if let Some(name) = &self.config.linkage.auxiliary {
            return Ok(configured_adversary(self.config, loaded.dataset(name)?)?);
        }
        let raw = loaded.dataset(self.raw())?;
        let mut noise = adversary_source(self.config.analysis.seed);
        Ok(sampled_adversary(self.config, raw, &mut noise)?)
    }

    fn noise(&self, stream: u64) -> ChaChaNoise {
        noise_source(self.config.analysis.seed, stream)
    }

    fn record(
        &self,
        kind: MetricKind,
        variant: &str,
        parameters: JsonValue,
        outcome: Outcome,
    ) -> MetricRecord {
        MetricRecord::new(&self.experiment_id, kind, variant, parameters, outcome)
    }

    fn execute(
        &self,
        configuration: &Configuration,
        index: usize,
        loaded: &Loaded,
    ) -> Vec<MetricRecord> {
        debug!(?configuration, "running configuration");
        match configuration {
            Configuration::KAnonymity { variant, spec } => self.k_anonymity(variant, *spec, loaded),
            Configuration::DpAccuracy { query, epsilon } => {
                vec![self.dp_accuracy(*query, *epsilon, index, loaded)]
            }
            Configuration::Linkage { variant } => vec![self.linkage(variant, loaded)],
            Configuration::ColumnUtility { variant, column } => {
                vec![self.column_utility(variant, column, loaded)]
            }
            Configuration::AggregateUtility { variant, spec } => {
                vec![self.aggregate_utility(variant, *spec, loaded)]
            }
        }
    }

    /// Group once, then one record per k.
    fn k_anonymity(&self, variant: &str, spec: usize, loaded: &Loaded) -> Vec<MetricRecord> {
        let spec = &self.config.quasi_identifiers[spec];
        let label = spec.label();
        let groups = loaded
            .dataset(variant)
            .and_then(|dataset| grouping::group(dataset, spec).map_err(Failure::from));

        self.config
            .analysis
            .k_values
            .iter()
            .map(|&k| {
                let result = groups
                    .as_ref()
                    .map_err(Clone::clone)
                    .and_then(|groups| kanon::report_for(groups, k).map_err(Failure::from));
                self.record(
                    MetricKind::KAnonymity,
                    variant,
                    json!({"qi_spec": label, "k": k}),
                    outcome(result),
                )
            })
            .collect()
    }

    fn dp_accuracy(
        &self,
        query: usize,
        epsilon: f64,
        index: usize,
        loaded: &Loaded,
    ) -> MetricRecord {
        let query = &self.config.dp_queries[query];
        let trials = self.config.analysis.trials;
        let sensitivity = self.config.sensitivity(&query.name);

        let parameters = json!({
            "query": query.name,
            "aggregate": query.aggregate.as_str(),
            "group_by": query.group_by.as_ref().map(priv_core::QuasiIdentifierSpec::label),
            "epsilon": epsilon,
            "sensitivity": sensitivity.as_ref().ok(),
            "trials": trials,
        });

        let result = sensitivity.map_err(Failure::from).and_then(|sensitivity| {
            let raw = loaded.dataset(self.raw())?;
            let mut noise = self.noise(index as u64);
            dp::evaluate_query(raw, query, sensitivity, &[epsilon], trials, &mut noise)?
                .into_iter()
                .next()
                .ok_or_else(|| Failure {
                    kind: ErrorKind::DegenerateInput,
                    message: format!("query '{}' produced no result", query.name),
                })
        });
        self.record(MetricKind::DpAccuracy, self.raw(), parameters, outcome(result))
    }

    fn linkage(&self, variant: &str, loaded: &Loaded) -> MetricRecord {
        let spec = self.config.linkage.spec();
        let auxiliary = match &loaded.auxiliary {
            Some(Ok(aux)) => Ok(aux.as_ref()),
            Some(Err(failure)) => Err(failure.clone()),
            None => Err(Failure {
                kind: ErrorKind::InvalidParameter,
                message: "linkage is not configured".to_string(),
            }),
        };

        let parameters = json!({
            "fields": spec.fields,
            "identity_column": spec.identity_column,
            "auxiliary": auxiliary.as_ref().ok().map(|a| a.name()),
            "auxiliary_records": auxiliary.as_ref().ok().map(|a| a.len()),
        });

        let result = auxiliary.and_then(|auxiliary| {
            let masked = loaded.dataset(variant)?;
            Ok(linkage::attack(masked, auxiliary, &spec)?)
        });
        self.record(MetricKind::Linkage, variant, parameters, outcome(result))
    }

    fn column_utility(&self, variant: &str, column: &str, loaded: &Loaded) -> MetricRecord {
        let result = loaded.dataset(self.raw()).and_then(|raw| {
            let masked = loaded.dataset(variant)?;
            utility::compare_columns(raw, masked, &[column])?
                .pop()
                .ok_or_else(|| Failure {
                    kind: ErrorKind::DegenerateInput,
                    message: format!("column '{column}' produced no result"),
                })
        });
        self.record(
            MetricKind::Utility,
            variant,
            json!({"column": column}),
            outcome(result),
        )
    }

    fn aggregate_utility(&self, variant: &str, spec: usize, loaded: &Loaded) -> MetricRecord {
        let spec = &self.config.utility.group_by[spec];
        let result = loaded.dataset(self.raw()).and_then(|raw| {
            let masked = loaded.dataset(variant)?;
            Ok(utility::aggregate_error(raw, masked, spec)?)
        });
        self.record(
            MetricKind::Utility,
            variant,
            json!({"group_by": spec.label()}),
            outcome(result),
        )
    }
}
