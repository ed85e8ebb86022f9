//! Durable plan state and reconciliation.

use crate::state::State;
use crate::taxonomy::{ActionPriority, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const MIN_CLUSTER_SIZE: usize = 2;
pub const SUPERSEDED_TTL_DAYS: i64 = 90;
const JACCARD_CANDIDATE_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKind {
    Temporary,
    Permanent,
    FalsePositive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skip {
    pub kind: SkipKind,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub review_after: Option<u32>,
    pub skipped_at_scan: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub description: String,
    pub finding_ids: Vec<String>,
    pub auto: bool,
    pub cluster_key: Option<String>,
    pub action: Option<ActionPriority>,
    pub user_modified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Override {
    pub priority: Option<u8>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupersededEntry {
    pub original_detector: String,
    pub original_file: String,
    pub original_summary: String,
    pub status: Status,
    pub superseded_at: DateTime<Utc>,
    pub remapped_to: Option<String>,
    pub candidates: Vec<String>,
}

pub const PLAN_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub version: u32,
    pub queue_order: Vec<String>,
    pub skipped: BTreeMap<String, Skip>,
    pub clusters: BTreeMap<String, Cluster>,
    pub overrides: BTreeMap<String, Override>,
    pub superseded: BTreeMap<String, SupersededEntry>,
}

impl Plan {
    pub fn new() -> Self {
        Self {
            version: PLAN_SCHEMA_VERSION,
            queue_order: Vec::new(),
            skipped: BTreeMap::new(),
            clusters: BTreeMap::new(),
            overrides: BTreeMap::new(),
            superseded: BTreeMap::new(),
        }
    }

    pub fn skipped_ids(&self) -> BTreeSet<String> {
        self.skipped.keys().cloned().collect()
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one reconciliation pass: ids flagged for review because
/// their skip's `review_after` threshold was reached.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub resurfaced_ids: Vec<String>,
    pub superseded_ids: Vec<String>,
    pub pruned_ids: Vec<String>,
}

/// Run the full reconciliation pipeline against mutated finding state:
/// supersede, candidate remap, TTL prune, resurface, cluster cleanup.
/// Idempotent: calling this twice in a row with the same `state`
/// produces the same `plan`.
pub fn reconcile(mut plan: Plan, state: &State, now: DateTime<Utc>, current_scan_count: u64) -> (Plan, ReconcileReport) {
    let mut report = ReconcileReport::default();

    supersede_missing(&mut plan, state, now, &mut report);
    compute_candidates(&mut plan, state);
    prune_expired(&mut plan, now, &mut report);
    resurface_due_skips(&plan, current_scan_count, &mut report);
    cleanup_clusters(&mut plan, state);

    (plan, report)
}

fn supersede_missing(plan: &mut Plan, state: &State, now: DateTime<Utc>, report: &mut ReconcileReport) {
    let mut missing_ids: BTreeSet<String> = BTreeSet::new();
    missing_ids.extend(plan.queue_order.iter().cloned());
    missing_ids.extend(plan.skipped.keys().cloned());
    for cluster in plan.clusters.values() {
        missing_ids.extend(cluster.finding_ids.iter().cloned());
    }
    missing_ids.retain(|id| !state.findings.contains_key(id) && !plan.superseded.contains_key(id));

    for id in missing_ids {
        // We cannot recover the original detector/file from a vanished
        // id if it was a file-scoped or cross-file id with an unusual
        // shape; fall back to parsing the canonical `detector::file::`
        // form, which is the common case.
        let (detector, file) = split_id(&id);
        plan.superseded.insert(
            id.clone(),
            SupersededEntry {
                original_detector: detector,
                original_file: file,
                original_summary: id.clone(),
                status: Status::Open,
                superseded_at: now,
                remapped_to: None,
                candidates: Vec::new(),
            },
        );
        report.superseded_ids.push(id);
    }
}

fn split_id(id: &str) -> (String, String) {
    let mut parts = id.splitn(3, "::");
    let detector = parts.next().unwrap_or("").to_string();
    let file = parts.next().unwrap_or("").to_string();
    (detector, file)
}

/// Populate fuzzy remap candidates for every superseded entry by
/// matching detector and file with word-set Jaccard similarity >= 0.7.
/// Never sets `remapped_to` automatically; that requires explicit user
/// action.
fn compute_candidates(plan: &mut Plan, state: &State) {
    let live: Vec<(&String, &crate::state::Finding)> = state.findings.iter().collect();
    for entry in plan.superseded.values_mut() {
        if entry.remapped_to.is_some() {
            continue;
        }
        let mut candidates: Vec<(f64, String)> = live
            .iter()
            .filter(|(_, f)| f.detector == entry.original_detector && f.file == entry.original_file)
            .map(|(id, _)| {
                let sim = jaccard_word_sets(&entry.original_summary, id);
                (sim, (*id).clone())
            })
            .filter(|(sim, _)| *sim >= JACCARD_CANDIDATE_THRESHOLD)
            .collect();
        candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap().then(a.1.cmp(&b.1)));
        entry.candidates = candidates.into_iter().map(|(_, id)| id).collect();
    }
}

fn jaccard_word_sets(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<&str> = a.split(|c: char| !c.is_alphanumeric()).filter(|s| !s.is_empty()).collect();
    let set_b: BTreeSet<&str> = b.split(|c: char| !c.is_alphanumeric()).filter(|s| !s.is_empty()).collect();
    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

fn prune_expired(plan: &mut Plan, now: DateTime<Utc>, report: &mut ReconcileReport) {
    let expired: Vec<String> = plan
        .superseded
        .iter()
        .filter(|(_, e)| (now - e.superseded_at).num_days() > SUPERSEDED_TTL_DAYS)
        .map(|(id, _)| id.clone())
        .collect();
    for id in &expired {
        plan.superseded.remove(id);
    }
    report.pruned_ids = expired;
}

fn resurface_due_skips(plan: &Plan, current_scan_count: u64, report: &mut ReconcileReport) {
    for (id, skip) in &plan.skipped {
        if let Some(review_after) = skip.review_after {
            let elapsed = current_scan_count.saturating_sub(skip.skipped_at_scan);
            if elapsed >= review_after as u64 {
                report.resurfaced_ids.push(id.clone());
            }
        }
    }
}

/// Drop finding-id references that are superseded without a remap, and
/// delete empty auto-clusters. `user_modified` clusters are never
/// deleted even when empty: they retain reduced membership unless it
/// drops below [`MIN_CLUSTER_SIZE`].
fn cleanup_clusters(plan: &mut Plan, state: &State) {
    let mut to_delete = Vec::new();
    for (name, cluster) in plan.clusters.iter_mut() {
        cluster.finding_ids.retain(|id| {
            if state.findings.contains_key(id) {
                return true;
            }
            match plan.superseded.get(id) {
                Some(entry) if entry.remapped_to.is_some() => true,
                _ => false,
            }
        });
        if cluster.finding_ids.len() < MIN_CLUSTER_SIZE && cluster.auto && !cluster.user_modified {
            to_delete.push(name.clone());
        }
    }
    for name in to_delete {
        plan.clusters.remove(&name);
    }
}

/// Auto-clustering: group Open findings by (detector, file-stem)
/// and emit stable `auto/{cluster_key}` clusters for groups of size >= 2.
/// A pure function of current state: identical input always produces
/// identical names and membership.
pub fn auto_cluster(state: &State) -> BTreeMap<String, Cluster> {
    let mut groups: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for (id, finding) in &state.findings {
        if finding.status != Status::Open || finding.suppressed {
            continue;
        }
        let stem = file_stem(&finding.file);
        groups.entry((finding.detector.clone(), stem)).or_default().push(id.clone());
    }

    let mut clusters = BTreeMap::new();
    for ((detector, stem), mut ids) in groups {
        if ids.len() < MIN_CLUSTER_SIZE {
            continue;
        }
        ids.sort();
        let key = format!("{detector}:{stem}");
        let name = format!("auto/{key}");
        clusters.insert(
            name.clone(),
            Cluster {
                name,
                description: format!("{} findings from `{}` clustered by file stem `{}`", ids.len(), detector, stem),
                finding_ids: ids,
                auto: true,
                cluster_key: Some(key),
                action: Some(ActionPriority::DebtReview),
                user_modified: false,
            },
        );
    }
    clusters
}

fn file_stem(path: &str) -> String {
    let basename = path.rsplit('/').next().unwrap_or(path);
    basename.split('.').next().unwrap_or(basename).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FindingDetail;
    use crate::taxonomy::{Confidence, Tier, Zone};
    use chrono::Utc;

    fn insert_finding(state: &mut State, id: &str, detector: &str, file: &str) {
        state.findings.insert(
            id.to_string(),
            crate::state::Finding {
                id: id.to_string(),
                detector: detector.to_string(),
                file: file.to_string(),
                tier: Tier::QuickFix,
                confidence: Confidence::High,
                status: Status::Open,
                first_seen: Utc::now(),
                last_seen: Utc::now(),
                resolved_at: None,
                reopen_count: 0,
                suppressed: false,
                suppression_pattern: None,
                suppressed_at: None,
                noise_tag: false,
                resolution_attestation: None,
                zone: Zone::Production,
                lang: "rust".to_string(),
                detail: FindingDetail::default(),
            },
        );
    }

    #[test]
    fn scenario_s6_cluster_stability() {
        let mut state = State::new();
        insert_finding(&mut state, "dupes::utils.rs::A", "dupes", "utils.rs");
        insert_finding(&mut state, "dupes::utils.rs::B", "dupes", "utils.rs");
        insert_finding(&mut state, "dupes::utils.rs::C", "dupes", "utils.rs");

        let clusters1 = auto_cluster(&state);
        let clusters2 = auto_cluster(&state);
        assert_eq!(clusters1.len(), clusters2.len());
        let c = &clusters1["auto/dupes:utils"];
        let mut members = c.finding_ids.clone();
        members.sort();
        assert_eq!(
            members,
            vec![
                "dupes::utils.rs::A".to_string(),
                "dupes::utils.rs::B".to_string(),
                "dupes::utils.rs::C".to_string()
            ]
        );
        assert_eq!(clusters1["auto/dupes:utils"].finding_ids, clusters2["auto/dupes:utils"].finding_ids);
    }

    #[test]
    fn superseded_finding_moves_out_of_queue_order() {
        let mut plan = Plan::new();
        plan.queue_order.push("security::gone.rs::x".to_string());
        let state = State::new();
        let (plan, report) = reconcile(plan, &state, Utc::now(), 1);
        assert_eq!(report.superseded_ids, vec!["security::gone.rs::x".to_string()]);
        assert!(plan.superseded.contains_key("security::gone.rs::x"));
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let mut plan = Plan::new();
        plan.queue_order.push("security::gone.rs::x".to_string());
        let state = State::new();
        let now = Utc::now();
        let (plan1, _) = reconcile(plan.clone(), &state, now, 1);
        let (plan2, _) = reconcile(plan1.clone(), &state, now, 1);
        assert_eq!(plan1.superseded.len(), plan2.superseded.len());
        assert_eq!(plan1.clusters.len(), plan2.clusters.len());
    }

    #[test]
    fn user_modified_empty_cluster_is_retained() {
        let mut plan = Plan::new();
        plan.clusters.insert(
            "manual/keep-me".to_string(),
            Cluster {
                name: "manual/keep-me".to_string(),
                description: "".to_string(),
                finding_ids: vec![],
                auto: false,
                cluster_key: None,
                action: None,
                user_modified: true,
            },
        );
        let state = State::new();
        let (plan, _) = reconcile(plan, &state, Utc::now(), 1);
        assert!(plan.clusters.contains_key("manual/keep-me"));
    }

    #[test]
    fn ttl_prune_drops_old_superseded_entries() {
        let mut plan = Plan::new();
        plan.superseded.insert(
            "x::y::".to_string(),
            SupersededEntry {
                original_detector: "x".to_string(),
                original_file: "y".to_string(),
                original_summary: "x::y::".to_string(),
                status: Status::Open,
                superseded_at: Utc::now() - chrono::Duration::days(91),
                remapped_to: None,
                candidates: vec![],
            },
        );
        let state = State::new();
        let (plan, report) = reconcile(plan, &state, Utc::now(), 1);
        assert!(plan.superseded.is_empty());
        assert_eq!(report.pruned_ids, vec!["x::y::".to_string()]);
    }
}
