//! Appends from many threads land as whole lines.

use std::sync::Arc;
use std::thread;

use chrono::Utc;
use pretty_assertions::assert_eq;
use priv_core::{ErrorKind, MetricKind, MetricRecord, Outcome, RunSummary};
use priv_sink::{JsonlSink, MemorySink, ResultSink, read_records};
use serde_json::json;

fn failure(i: usize) -> MetricRecord {
    MetricRecord::new(
        "exp-threads",
        MetricKind::DpAccuracy,
        "raw",
        json!({"epsilon": 0.0, "attempt": i}),
        Outcome::failed(ErrorKind::InvalidParameter, "epsilon must be positive"),
    )
}

#[test]
fn parallel_writers_produce_whole_records() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(JsonlSink::new(dir.path()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                for i in 0..25 {
                    sink.append(&failure(t * 100 + i)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let records = read_records(&sink.records_path("exp-threads")).unwrap();
    assert_eq!(records.len(), 200);
    assert!(records.iter().all(|r| !r.outcome.is_measured()));
}

#[test]
fn summary_is_written_beside_records() {
    let dir = tempfile::tempdir().unwrap();
    let sink = JsonlSink::new(dir.path()).unwrap();
    let now = Utc::now();
    let summary = RunSummary {
        experiment_id: "exp-sum".into(),
        started_at: now,
        finished_at: now,
        complete: false,
        succeeded: 3,
        failed: 1,
        skipped: 0,
        not_started: 4,
    };
    sink.finish(&summary).unwrap();

    let text = std::fs::read_to_string(sink.summary_path("exp-sum")).unwrap();
    let back: RunSummary = serde_json::from_str(&text).unwrap();
    assert_eq!(back, summary);

    let memory = MemorySink::new();
    memory.append(&failure(1)).unwrap();
    memory.finish(&summary).unwrap();
    assert_eq!(memory.records().unwrap().len(), 1);
    assert_eq!(memory.summary().unwrap(), Some(summary));
}
