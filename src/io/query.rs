//! Query snapshot writer (SPEC_FULL.md Part C supplement): a flattened,
//! read-only `query.json` alongside `state.json` for external tooling
//! (dashboards, editor plugins) that should not need this crate's schema
//! to read current scores and the top of the work queue.

use crate::io::atomic::write_json_atomically;
use crate::queue::{QueueItem, QueueResult};
use crate::state::State;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySnapshot {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub overall: f64,
    pub objective: f64,
    pub strict: f64,
    pub verified_strict: f64,
    pub open_count: usize,
    pub top_queue_ids: Vec<String>,
}

/// Flatten `state` and the current queue's first `limit` ids into a
/// snapshot and write it atomically to `path`.
pub fn write_query_snapshot(
    path: &Path,
    state: &State,
    queue: &QueueResult,
    generated_at: chrono::DateTime<chrono::Utc>,
    limit: usize,
) -> Result<(), CoreError> {
    let top_queue_ids = queue
        .items
        .iter()
        .take(limit)
        .map(|item| match item {
            QueueItem::Cluster { name, .. } => name.clone(),
            QueueItem::Mechanical { id, .. } => id.clone(),
            QueueItem::Subjective { dimension, .. } => dimension.clone(),
        })
        .collect();

    let snapshot = QuerySnapshot {
        generated_at,
        overall: state.scores.overall,
        objective: state.scores.objective,
        strict: state.scores.strict,
        verified_strict: state.scores.verified_strict,
        open_count: state.stats.open_count,
        top_queue_ids,
    };

    write_json_atomically(path, &snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn snapshot_caps_queue_ids_at_limit() {
        let mut state = State::new();
        state.scores.overall = 88.0;
        let queue = QueueResult {
            items: vec![
                QueueItem::Subjective { dimension: "a".to_string(), score: 1.0 },
                QueueItem::Subjective { dimension: "b".to_string(), score: 1.0 },
                QueueItem::Subjective { dimension: "c".to_string(), score: 1.0 },
            ],
            fallback_reason: None,
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("query.json");
        write_query_snapshot(&path, &state, &queue, chrono::Utc::now(), 2).unwrap();
        let written: QuerySnapshot = crate::io::atomic::read_json(&path).unwrap();
        assert_eq!(written.top_queue_ids.len(), 2);
        assert_eq!(written.overall, 88.0);
    }
}
