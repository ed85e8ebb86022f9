//! State merge: upsert, auto-resolve, suppression,
//! noise budget, and stale-on-mechanical-change, in that order, followed
//! by history append.

use super::{
    Finding, FindingDetail, NewFinding, ResolutionAttestation, ScanDiff, ScanHistoryEntry, State,
};
use crate::taxonomy::Status;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Tunables for one merge pass, sourced from [`crate::config::CoreConfig`].
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub ignore_patterns: Vec<glob::Pattern>,
    pub per_detector_noise_budget: u32,
    pub global_noise_budget: Option<u32>,
    /// Maps a mechanical detector name to the subjective dimension it
    /// should stale when its findings change materially (    /// "Stale-on-mechanical-change").
    pub stale_triggers: HashMap<String, Vec<String>>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            per_detector_noise_budget: 10,
            global_noise_budget: None,
            stale_triggers: HashMap::new(),
        }
    }
}

/// Apply one scan's findings to prior state, producing the next state and
/// a diff. `detectors_ran` is the set of detectors that actually executed
/// this scan: auto-resolve must not fire for detectors that were skipped
/// due to a missing tool.
pub fn merge_scan(
    mut state: State,
    new_findings: Vec<NewFinding>,
    detectors_ran: &HashSet<String>,
    now: DateTime<Utc>,
    options: &MergeOptions,
) -> (State, ScanDiff) {
    // Scan-output findings are sorted by id before merge so the result is
    // deterministic regardless of phase parallelism.
    let mut sorted = new_findings;
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let incoming_ids: HashSet<String> = sorted.iter().map(|f| f.id.clone()).collect();

    let mut diff = ScanDiff::default();

    // --- Upsert ---
    for nf in &sorted {
        match state.findings.get_mut(&nf.id) {
            None => {
                let finding = Finding {
                    id: nf.id.clone(),
                    detector: nf.detector.clone(),
                    file: nf.file.clone(),
                    tier: nf.tier,
                    confidence: nf.confidence,
                    status: Status::Open,
                    first_seen: now,
                    last_seen: now,
                    resolved_at: None,
                    reopen_count: 0,
                    suppressed: false,
                    suppression_pattern: None,
                    suppressed_at: None,
                    noise_tag: false,
                    resolution_attestation: None,
                    zone: nf.zone,
                    lang: nf.lang.clone(),
                    detail: nf.detail.clone(),
                };
                state.findings.insert(nf.id.clone(), finding);
                diff.new_ids.push(nf.id.clone());
            }
            Some(existing) => {
                existing.last_seen = now;
                existing.detail.merge_from(&nf.detail);
                match existing.status {
                    Status::Open => {}
                    resolved if resolved.is_resolved() => {
                        let required_attestation = resolved.requires_attestation();
                        existing.status = Status::Open;
                        existing.reopen_count += 1;
                        existing.resolved_at = None;
                        if required_attestation {
                            existing.resolution_attestation = Some(ResolutionAttestation {
                                kind: "manual_reopen".to_string(),
                                by: "system".to_string(),
                                reason: "finding reproduced on rescan".to_string(),
                                at: now,
                            });
                        } else {
                            existing.resolution_attestation = None;
                        }
                        diff.reopened_ids.push(nf.id.clone());
                    }
                    _ => unreachable!("Status::is_resolved covers every non-Open variant"),
                }
            }
        }
    }

    // --- Auto-resolve ---
    // Restricted to detectors that actually ran this scan; a skipped
    // detector's prior Open findings must not be silently closed.
    let mut auto_resolved_ids = Vec::new();
    for (id, finding) in state.findings.iter_mut() {
        if finding.status == Status::Open
            && detectors_ran.contains(&finding.detector)
            && !incoming_ids.contains(id)
        {
            finding.status = Status::AutoResolved;
            finding.resolved_at = Some(now);
            auto_resolved_ids.push(id.clone());
        }
    }
    diff.resolved_ids.extend(auto_resolved_ids);

    // --- Suppression ---
    for finding in state.findings.values_mut() {
        if let Some(pattern) = options
            .ignore_patterns
            .iter()
            .find(|p| p.matches(&finding.file) || p.matches(&finding.id))
        {
            finding.suppressed = true;
            finding.suppression_pattern = Some(pattern.as_str().to_string());
            finding.suppressed_at = Some(now);
        }
    }

    // --- Noise budget ---
    // Per-detector cap on newly introduced Open findings this scan; keep
    // highest-confidence first, mark the excess suppressed with a noise
    // tag rather than dropping them.
    apply_noise_budget(&mut state, &diff.new_ids, options);

    // --- Stale-on-mechanical-change ---
    let changed_detectors: HashSet<&str> = diff
        .new_ids
        .iter()
        .chain(diff.resolved_ids.iter())
        .chain(diff.reopened_ids.iter())
        .filter_map(|id| state.findings.get(id).map(|f| f.detector.as_str()))
        .collect();
    for detector in changed_detectors {
        if let Some(dims) = options.stale_triggers.get(detector) {
            for dim in dims {
                if let Some(assessment) = state.subjective_assessments.get_mut(dim) {
                    assessment.needs_review_refresh = true;
                }
            }
        }
    }

    state.recompute_stats();
    (state, diff)
}

fn apply_noise_budget(state: &mut State, new_ids: &[String], options: &MergeOptions) {
    let mut by_detector: HashMap<String, Vec<String>> = HashMap::new();
    for id in new_ids {
        if let Some(f) = state.findings.get(id) {
            by_detector.entry(f.detector.clone()).or_default().push(id.clone());
        }
    }

    let mut global_used = 0u32;
    for (_detector, mut ids) in by_detector {
        ids.sort_by(|a, b| {
            let ca = state.findings[a].confidence.rank();
            let cb = state.findings[b].confidence.rank();
            ca.cmp(&cb).then_with(|| a.cmp(b))
        });
        for (i, id) in ids.iter().enumerate() {
            let over_per_detector = i as u32 >= options.per_detector_noise_budget;
            let over_global = options
                .global_noise_budget
                .map(|g| global_used >= g)
                .unwrap_or(false);
            if over_per_detector || over_global {
                if let Some(f) = state.findings.get_mut(id) {
                    f.suppressed = true;
                    f.noise_tag = true;
                }
            } else {
                global_used += 1;
            }
        }
    }
}

/// Append a history entry and trim to the FIFO bound.
pub fn append_history(state: &mut State, scores: crate::state::ScoreChannels, now: DateTime<Utc>) {
    state.push_history(ScanHistoryEntry {
        at: now,
        overall: scores.overall,
        objective: scores.objective,
        strict: scores.strict,
        verified_strict: scores.verified_strict,
        open_count: state.stats.open_count,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{Confidence, Tier, Zone};

    fn nf(id: &str, detector: &str) -> NewFinding {
        NewFinding {
            id: id.to_string(),
            detector: detector.to_string(),
            file: "src/a.rs".to_string(),
            tier: Tier::Judgment,
            confidence: Confidence::High,
            zone: Zone::Production,
            lang: "rust".to_string(),
            detail: FindingDetail::default(),
        }
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn new_finding_inserted_as_open() {
        let state = State::new();
        let mut ran = HashSet::new();
        ran.insert("security".to_string());
        let (state, diff) =
            merge_scan(state, vec![nf("security::a.rs::X", "security")], &ran, ts(0), &MergeOptions::default());
        assert_eq!(diff.new_ids, vec!["security::a.rs::X".to_string()]);
        let f = &state.findings["security::a.rs::X"];
        assert_eq!(f.status, Status::Open);
        assert_eq!(f.reopen_count, 0);
    }

    #[test]
    fn reopen_increments_counter_and_clears_resolved_at() {
        let mut state = State::new();
        let mut ran = HashSet::new();
        ran.insert("security".to_string());
        let (s1, _) = merge_scan(state.clone(), vec![nf("security::a.rs::X", "security")], &ran, ts(0), &MergeOptions::default());
        state = s1;
        // Simulate a manual fix.
        state.findings.get_mut("security::a.rs::X").unwrap().status = Status::Fixed;
        state.findings.get_mut("security::a.rs::X").unwrap().resolved_at = Some(ts(10));

        let (s2, diff) = merge_scan(state, vec![nf("security::a.rs::X", "security")], &ran, ts(20), &MergeOptions::default());
        assert_eq!(diff.reopened_ids, vec!["security::a.rs::X".to_string()]);
        let f = &s2.findings["security::a.rs::X"];
        assert_eq!(f.status, Status::Open);
        assert_eq!(f.reopen_count, 1);
        assert!(f.resolved_at.is_none());
    }

    #[test]
    fn auto_resolve_only_for_detectors_that_ran() {
        let mut state = State::new();
        let mut ran = HashSet::new();
        ran.insert("security".to_string());
        let (state, _) = merge_scan(state.clone(), vec![nf("security::a.rs::Y", "security")], &ran, ts(0), &MergeOptions::default());
        // Scan N+1: security did NOT run (tool missing), finding absent from F.
        let ran_without_security: HashSet<String> = HashSet::new();
        let (state, diff) = merge_scan(state, vec![], &ran_without_security, ts(10), &MergeOptions::default());
        assert!(diff.resolved_ids.is_empty());
        assert_eq!(state.findings["security::a.rs::Y"].status, Status::Open);
    }

    #[test]
    fn auto_resolve_fires_when_detector_ran_and_finding_absent() {
        let mut state = State::new();
        let mut ran = HashSet::new();
        ran.insert("security".to_string());
        let (state, _) = merge_scan(state.clone(), vec![nf("security::a.rs::Y", "security")], &ran, ts(0), &MergeOptions::default());
        let (state, diff) = merge_scan(state, vec![], &ran, ts(10), &MergeOptions::default());
        assert_eq!(diff.resolved_ids, vec!["security::a.rs::Y".to_string()]);
        assert_eq!(state.findings["security::a.rs::Y"].status, Status::AutoResolved);
    }

    #[test]
    fn idempotent_rescan_with_identical_findings() {
        let mut ran = HashSet::new();
        ran.insert("security".to_string());
        let state = State::new();
        let (s1, _) = merge_scan(state, vec![nf("security::a.rs::X", "security")], &ran, ts(0), &MergeOptions::default());
        let (s2, diff2) = merge_scan(s1.clone(), vec![nf("security::a.rs::X", "security")], &ran, ts(0), &MergeOptions::default());
        assert!(diff2.new_ids.is_empty());
        assert!(diff2.reopened_ids.is_empty());
        assert_eq!(s1.findings, s2.findings);
    }

    #[test]
    fn noise_budget_suppresses_excess_lowest_confidence_first() {
        let mut state = State::new();
        let ran: HashSet<String> = ["dupes".to_string()].into_iter().collect();
        let mut findings = Vec::new();
        for i in 0..5 {
            let mut f = nf(&format!("dupes::a.rs::L{i}"), "dupes");
            f.confidence = if i < 2 { Confidence::High } else { Confidence::Low };
            findings.push(f);
        }
        let mut opts = MergeOptions::default();
        opts.per_detector_noise_budget = 2;
        let (state, _diff) = merge_scan(state, findings, &ran, ts(0), &opts);
        let kept: Vec<_> = state
            .findings
            .values()
            .filter(|f| !f.suppressed)
            .collect();
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|f| f.confidence == Confidence::High));
    }
}
