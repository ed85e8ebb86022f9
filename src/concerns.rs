//! Concern synthesizer: derive ephemeral,
//! higher-level design concerns from the finding population.

use crate::state::{Finding, State};
use crate::taxonomy::{member_set_hash, Status};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConcernKind {
    SystemicPattern,
    SystemicSmell,
    InterfaceDesign,
    StructuralComplexity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concern {
    pub kind: ConcernKind,
    pub fingerprint: String,
    pub evidence: Vec<String>,
    pub summary: String,
}

/// Thresholds kept single-site per the design note on scattered ad-hoc
/// thresholds.
pub const SYSTEMIC_SMELL_MIN_FILES: usize = 5;
pub const SYSTEMIC_PATTERN_MIN_FILES: usize = 3;
pub const INTERFACE_DESIGN_MIN_PARAMS: u32 = 8;
pub const STRUCTURAL_COMPLEXITY_MIN_NESTING: u32 = 6;
pub const STRUCTURAL_COMPLEXITY_MIN_LOC: u32 = 300;

/// Fingerprint: SHA-256 of sorted canonical evidence, truncated to 16 hex
/// chars, a pure function of the evidence set.
fn fingerprint(evidence: &[String]) -> String {
    let mut sorted: Vec<&str> = evidence.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    member_set_hash(&sorted)
}

/// Derive concerns from open, non-suppressed findings. Dismissed
/// fingerprints (`state.concern_dismissals`) are filtered out so a
/// dismissed concern never reappears.
pub fn synthesize(state: &State) -> Vec<Concern> {
    let open: Vec<&Finding> =
        state.findings.values().filter(|f| f.status == Status::Open && !f.suppressed).collect();

    let mut concerns = Vec::new();
    concerns.extend(systemic_smells(&open));
    concerns.extend(systemic_patterns(&open));
    concerns.extend(interface_design(&open));
    concerns.extend(structural_complexity(&open));

    concerns.retain(|c| !state.concern_dismissals.contains(&c.fingerprint));
    concerns
}

fn systemic_smells(open: &[&Finding]) -> Vec<Concern> {
    let mut by_detector: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for f in open {
        if f.detector == "smell" {
            by_detector.entry(f.detector.as_str()).or_default().push(f.file.as_str());
        }
    }
    by_detector
        .into_iter()
        .filter(|(_, files)| files.len() >= SYSTEMIC_SMELL_MIN_FILES)
        .map(|(detector, files)| {
            let evidence: Vec<String> = files.iter().map(|f| f.to_string()).collect();
            let fp = fingerprint(&evidence);
            Concern {
                kind: ConcernKind::SystemicSmell,
                summary: format!("`{detector}` recurs across {} files", files.len()),
                evidence,
                fingerprint: fp,
            }
        })
        .collect()
}

fn systemic_patterns(open: &[&Finding]) -> Vec<Concern> {
    // Files sharing an identical set of detector names ("profile").
    let mut profile_by_file: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for f in open {
        profile_by_file.entry(f.file.as_str()).or_default().push(f.detector.as_str());
    }
    let mut files_by_profile: BTreeMap<Vec<String>, Vec<&str>> = BTreeMap::new();
    for (file, mut detectors) in profile_by_file {
        detectors.sort_unstable();
        detectors.dedup();
        let key: Vec<String> = detectors.into_iter().map(|s| s.to_string()).collect();
        files_by_profile.entry(key).or_default().push(file);
    }
    files_by_profile
        .into_iter()
        .filter(|(profile, files)| profile.len() > 1 && files.len() >= SYSTEMIC_PATTERN_MIN_FILES)
        .map(|(profile, files)| {
            let evidence: Vec<String> = files.iter().map(|f| f.to_string()).collect();
            let fp = fingerprint(&evidence);
            Concern {
                kind: ConcernKind::SystemicPattern,
                summary: format!("{} files share detector profile [{}]", files.len(), profile.join(",")),
                evidence,
                fingerprint: fp,
            }
        })
        .collect()
}

fn interface_design(open: &[&Finding]) -> Vec<Concern> {
    open.iter()
        .filter_map(|f| {
            let params = f.detail.extra.get("parameter_count")?.as_u64()? as u32;
            if params >= INTERFACE_DESIGN_MIN_PARAMS {
                let evidence = vec![f.id.clone()];
                let fp = fingerprint(&evidence);
                Some(Concern {
                    kind: ConcernKind::InterfaceDesign,
                    summary: format!("{} has {params} parameters", f.file),
                    evidence,
                    fingerprint: fp,
                })
            } else {
                None
            }
        })
        .collect()
}

fn structural_complexity(open: &[&Finding]) -> Vec<Concern> {
    open.iter()
        .filter_map(|f| {
            let nesting = f.detail.extra.get("nesting_depth").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            let loc = f.detail.loc.unwrap_or(0);
            if nesting >= STRUCTURAL_COMPLEXITY_MIN_NESTING || loc >= STRUCTURAL_COMPLEXITY_MIN_LOC {
                let evidence = vec![f.id.clone()];
                let fp = fingerprint(&evidence);
                Some(Concern {
                    kind: ConcernKind::StructuralComplexity,
                    summary: format!("{} is structurally complex (nesting={nesting}, loc={loc})", f.file),
                    evidence,
                    fingerprint: fp,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FindingDetail;
    use crate::taxonomy::{Confidence, Tier, Zone};
    use chrono::Utc;

    fn smell_finding(file: &str) -> (String, Finding) {
        let id = format!("smell::{file}::x");
        (
            id.clone(),
            Finding {
                id,
                detector: "smell".to_string(),
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
        )
    }

    #[test]
    fn five_files_with_same_smell_triggers_systemic_smell() {
        let mut state = State::new();
        for i in 0..5 {
            let (id, f) = smell_finding(&format!("f{i}.rs"));
            state.findings.insert(id, f);
        }
        let concerns = synthesize(&state);
        assert!(concerns.iter().any(|c| c.kind == ConcernKind::SystemicSmell));
    }

    #[test]
    fn four_files_do_not_trigger_systemic_smell() {
        let mut state = State::new();
        for i in 0..4 {
            let (id, f) = smell_finding(&format!("f{i}.rs"));
            state.findings.insert(id, f);
        }
        let concerns = synthesize(&state);
        assert!(!concerns.iter().any(|c| c.kind == ConcernKind::SystemicSmell));
    }

    #[test]
    fn dismissed_fingerprint_does_not_reappear() {
        let mut state = State::new();
        for i in 0..5 {
            let (id, f) = smell_finding(&format!("f{i}.rs"));
            state.findings.insert(id, f);
        }
        let first_pass = synthesize(&state);
        let fp = first_pass[0].fingerprint.clone();
        state.concern_dismissals.insert(fp);
        let second_pass = synthesize(&state);
        assert!(!second_pass.iter().any(|c| c.kind == ConcernKind::SystemicSmell));
    }

    #[test]
    fn fingerprint_is_pure_function_of_sorted_evidence() {
        let evidence_a = vec!["b.rs".to_string(), "a.rs".to_string()];
        let evidence_b = vec!["a.rs".to_string(), "b.rs".to_string()];
        assert_eq!(fingerprint(&evidence_a), fingerprint(&evidence_b));
    }
}
