//! Experiment ID generation.
//!
//! IDs have the form `exp-` followed by 8 lowercase hex characters, e.g.
//! `exp-a3f8b2c1`. One ID names one analysis run and its result file.

use chrono::Utc;

/// Prefix of every experiment ID.
pub const PREFIX_EXPERIMENT: &str = "exp";

/// Generate a fresh experiment ID from OS randomness.
///
/// Falls back to the low bits of the current timestamp if the OS random
/// source is unavailable.
#[must_use]
pub fn new_experiment_id() -> String {
    let mut bytes = [0u8; 4];
    if getrandom::fill(&mut bytes).is_err() {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let [a, b, c, d, ..] = nanos.to_le_bytes();
        bytes = [a, b, c, d];
    }
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{PREFIX_EXPERIMENT}-{hex}")
}

/// Whether `id` has the experiment ID shape.
#[must_use]
pub fn is_experiment_id(id: &str) -> bool {
    id.strip_prefix("exp-").is_some_and(|hex| {
        hex.len() == 8 && hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    })
}
