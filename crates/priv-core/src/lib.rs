//! # priv-core
//!
//! Core data model for the privbench assessment engine.
//!
//! This crate provides the types shared across all privbench crates:
//! - Typed cell values and column types
//! - Immutable datasets with a declared schema and row-key column
//! - Adversary (auxiliary) datasets carrying identity labels
//! - Quasi-identifier specs and generalization functions
//! - Linkage and differential-privacy query definitions
//! - Metric kinds, error kinds, and the result record envelope
//! - Experiment ID generation

pub mod auxiliary;
pub mod dataset;
pub mod enums;
pub mod errors;
pub mod experiment;
pub mod ids;
pub mod qi;
pub mod record;
pub mod value;

pub use auxiliary::{AuxiliaryDataset, AuxiliaryRecord};
pub use dataset::{Dataset, Row, Schema};
pub use enums::{ErrorKind, MetricKind};
pub use errors::CoreError;
pub use experiment::{Aggregate, ClampPolicy, DpQuery, LinkageField, LinkageSpec};
pub use qi::{BoundSpec, Generalization, QiField, QiKey, QuasiIdentifierSpec};
pub use record::{MetricRecord, Outcome, RunSummary};
pub use value::{ColumnType, Value};
