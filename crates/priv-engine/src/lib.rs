//! # priv-engine
//!
//! Privacy risk and utility analyzers for privbench.
//!
//! Every analyzer is a pure function of immutable datasets and parameters:
//! - Quasi-identifier grouping, the shared hash-grouping primitive
//! - k-anonymity assessment with suppression cost
//! - Laplace-mechanism accuracy for scalar, grouped, and mean queries
//! - Linkage re-identification against an adversary dataset
//! - Per-column and grouped-aggregate utility loss
//!
//! Randomized analyzers draw from an injected [`NoiseSource`].

pub mod dp;
pub mod error;
pub mod grouping;
pub mod kanon;
pub mod linkage;
pub mod noise;
pub mod utility;

pub use dp::{AccuracyResult, GroupedAccuracyResult, QueryAccuracy};
pub use error::EngineError;
pub use grouping::{GroupSizeReport, Grouper, group, group_many};
pub use kanon::{KAnonymityReport, SuppressionReport, assess};
pub use linkage::{LinkageAttempt, LinkageResult, MatchOutcome, attack, sample_auxiliary};
pub use noise::{ChaChaNoise, NoiseSource};
pub use utility::{AggregateUtilityResult, UtilityResult, aggregate_error, compare, compare_columns};
