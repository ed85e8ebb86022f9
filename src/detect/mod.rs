//! Detector phase pipeline and the
//! [`LanguagePlugin`] collaborator interface. AST extraction,
//! linter subprocess invocation, and output parsing live outside the
//! core; this module only drives whatever phases a language plugin
//! registers and collects their `(findings, potentials)` output.

pub mod traits;

pub use traits::{LanguagePlugin, Phase, PhaseContext};

use crate::error::ErrorCode;
use crate::state::NewFinding;
use crate::taxonomy::{zone_policy_for, DetectorRegistry, ZonePolicy};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Outcome of running one phase: its findings, the potentials it
/// reports, and whether it actually ran (vs. being skipped for a
/// missing tool) or failed outright.
#[derive(Debug, Clone)]
pub struct PhaseOutcome {
    pub phase_name: &'static str,
    pub findings: Vec<NewFinding>,
    pub potentials: HashMap<String, u32>,
    pub ran: bool,
}

impl PhaseOutcome {
    fn skipped(phase_name: &'static str, reason: &str) -> Self {
        log::warn!("{}: phase `{phase_name}` skipped: {reason}", ErrorCode::TOOL_MISSING);
        Self { phase_name, findings: Vec::new(), potentials: HashMap::new(), ran: false }
    }

    fn failed(phase_name: &'static str, reason: &str) -> Self {
        log::warn!("{}: phase `{phase_name}` failed: {reason}", ErrorCode::PHASE_FAILED);
        Self { phase_name, findings: Vec::new(), potentials: HashMap::new(), ran: false }
    }
}

/// The final, merge-ready product of a full scan's phase pipeline:
/// deduplicated, validated findings, combined potentials, and the set
/// of detectors that actually ran (needed by state merge's auto-resolve
/// gating).
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub findings: Vec<NewFinding>,
    pub potentials: HashMap<String, u32>,
    pub detectors_ran: HashSet<String>,
    pub dropped_count: usize,
}

/// Run every phase the plugin registers, in its declared order.
/// Per-phase work runs in parallel internally (via `rayon`), but phase
/// *ordering* across the pipeline is sequential and each phase's output
/// is collected before the next begins, matching "ordered,
/// language-configured sequence of phases" and "all mutations to
/// state happen after all phases have completed".
pub fn run_phases(
    plugin: &dyn LanguagePlugin,
    ctx: &PhaseContext,
    registry: &DetectorRegistry,
) -> ScanOutput {
    let mut all_findings = Vec::new();
    let mut potentials = HashMap::new();
    let mut detectors_ran = HashSet::new();
    let mut dropped_count = 0usize;

    for phase in plugin.phases() {
        let outcome = run_one_phase(phase.as_ref(), ctx);
        if outcome.ran {
            for detector in outcome.potentials.keys() {
                detectors_ran.insert(detector.clone());
            }
        }
        for (detector, count) in outcome.potentials {
            *potentials.entry(detector).or_insert(0) += count;
        }
        for mut raw in outcome.findings {
            match validate_finding(&raw, registry) {
                Ok(()) => {
                    // registry.contains(&raw.detector) was just checked by
                    // validate_finding, so the lookup below is infallible.
                    let info = registry.get(&raw.detector).expect("validated detector exists in registry");
                    match zone_policy_for(info, raw.zone) {
                        ZonePolicy::Skip => dropped_count += 1,
                        ZonePolicy::DowngradeOneTier => {
                            raw.tier = raw.tier.downgrade_one();
                            all_findings.push(raw);
                        }
                        ZonePolicy::Normal => all_findings.push(raw),
                    }
                }
                Err(rejection) => {
                    log::warn!("dropping invalid finding: {rejection}");
                    dropped_count += 1;
                }
            }
        }
    }

    // Deterministic merge input regardless of phase-internal parallelism.
    all_findings.sort_by(|a, b| a.id.cmp(&b.id));

    ScanOutput { findings: all_findings, potentials, detectors_ran, dropped_count }
}

fn run_one_phase(phase: &dyn Phase, ctx: &PhaseContext) -> PhaseOutcome {
    if !phase.tool_available(ctx) {
        return PhaseOutcome::skipped(phase.name(), "required external tool not found");
    }
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| phase.run(ctx))) {
        Ok(Ok((findings, potentials))) => {
            PhaseOutcome { phase_name: phase.name(), findings, potentials, ran: true }
        }
        Ok(Err(reason)) => PhaseOutcome::failed(phase.name(), &reason),
        Err(_) => PhaseOutcome::failed(phase.name(), "phase panicked"),
    }
}

/// Run per-file work inside a phase across a worker pool. Exposed so
/// phase implementations share one parallel-execution idiom rather than
/// each rolling their own `rayon` usage.
pub fn parallel_map<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    items.par_iter().map(|item| f(item)).collect()
}

fn validate_finding(f: &NewFinding, registry: &DetectorRegistry) -> Result<(), crate::error::FindingRejection> {
    use crate::error::FindingRejection;
    if !registry.contains(&f.detector) {
        return Err(FindingRejection::UnknownDetector(f.detector.clone()));
    }
    if f.file.is_empty() {
        return Err(FindingRejection::MissingField("file"));
    }
    if f.id.is_empty() || f.id.matches("::").count() < 2 {
        return Err(FindingRejection::MalformedId(f.id.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FindingDetail;
    use crate::taxonomy::{Confidence, Tier, Zone};

    struct AlwaysFailsPhase;
    impl Phase for AlwaysFailsPhase {
        fn name(&self) -> &'static str {
            "always_fails"
        }
        fn run(&self, _ctx: &PhaseContext) -> Result<(Vec<NewFinding>, HashMap<String, u32>), String> {
            Err("simulated phase failure".to_string())
        }
    }

    struct MissingToolPhase;
    impl Phase for MissingToolPhase {
        fn name(&self) -> &'static str {
            "missing_tool"
        }
        fn tool_available(&self, _ctx: &PhaseContext) -> bool {
            false
        }
        fn run(&self, _ctx: &PhaseContext) -> Result<(Vec<NewFinding>, HashMap<String, u32>), String> {
            unreachable!("must not run when tool_available is false")
        }
    }

    struct GoodPhase;
    impl Phase for GoodPhase {
        fn name(&self) -> &'static str {
            "good"
        }
        fn run(&self, _ctx: &PhaseContext) -> Result<(Vec<NewFinding>, HashMap<String, u32>), String> {
            let mut potentials = HashMap::new();
            potentials.insert("security".to_string(), 10);
            Ok((
                vec![NewFinding {
                    id: "security::a.rs::L1".to_string(),
                    detector: "security".to_string(),
                    file: "a.rs".to_string(),
                    tier: Tier::Judgment,
                    confidence: Confidence::High,
                    zone: Zone::Production,
                    lang: "rust".to_string(),
                    detail: FindingDetail::default(),
                }],
                potentials,
            ))
        }
    }

    struct UnknownDetectorPhase;
    impl Phase for UnknownDetectorPhase {
        fn name(&self) -> &'static str {
            "unknown_detector"
        }
        fn run(&self, _ctx: &PhaseContext) -> Result<(Vec<NewFinding>, HashMap<String, u32>), String> {
            Ok((
                vec![NewFinding {
                    id: "nope::a.rs::".to_string(),
                    detector: "nope".to_string(),
                    file: "a.rs".to_string(),
                    tier: Tier::Judgment,
                    confidence: Confidence::High,
                    zone: Zone::Production,
                    lang: "rust".to_string(),
                    detail: FindingDetail::default(),
                }],
                HashMap::new(),
            ))
        }
    }

    struct TestPlugin {
        phases: Vec<Box<dyn Phase>>,
    }
    impl LanguagePlugin for TestPlugin {
        fn extensions(&self) -> &[&str] {
            &["rs"]
        }
        fn phases(&self) -> &[Box<dyn Phase>] {
            &self.phases
        }
    }

    #[test]
    fn failed_phase_contributes_zero_potentials_and_does_not_abort() {
        let plugin = TestPlugin { phases: vec![Box::new(AlwaysFailsPhase), Box::new(GoodPhase)] };
        let ctx = PhaseContext::default();
        let registry = DetectorRegistry::standard();
        let output = run_phases(&plugin, &ctx, &registry);
        assert_eq!(output.findings.len(), 1);
        assert!(output.detectors_ran.contains("security"));
    }

    #[test]
    fn missing_tool_phase_is_not_in_detectors_ran() {
        let plugin = TestPlugin { phases: vec![Box::new(MissingToolPhase)] };
        let ctx = PhaseContext::default();
        let registry = DetectorRegistry::standard();
        let output = run_phases(&plugin, &ctx, &registry);
        assert!(output.detectors_ran.is_empty());
        assert!(output.findings.is_empty());
    }

    #[test]
    fn unknown_detector_finding_is_dropped_not_fatal() {
        let plugin = TestPlugin { phases: vec![Box::new(UnknownDetectorPhase)] };
        let ctx = PhaseContext::default();
        let registry = DetectorRegistry::standard();
        let output = run_phases(&plugin, &ctx, &registry);
        assert_eq!(output.findings.len(), 0);
        assert_eq!(output.dropped_count, 1);
    }

    #[test]
    fn output_findings_are_sorted_by_id() {
        struct TwoFindingsPhase;
        impl Phase for TwoFindingsPhase {
            fn name(&self) -> &'static str {
                "two"
            }
            fn run(&self, _ctx: &PhaseContext) -> Result<(Vec<NewFinding>, HashMap<String, u32>), String> {
                let mk = |id: &str| NewFinding {
                    id: id.to_string(),
                    detector: "security".to_string(),
                    file: "a.rs".to_string(),
                    tier: Tier::Judgment,
                    confidence: Confidence::High,
                    zone: Zone::Production,
                    lang: "rust".to_string(),
                    detail: FindingDetail::default(),
                };
                Ok((vec![mk("security::a.rs::L9"), mk("security::a.rs::L1")], HashMap::new()))
            }
        }
        let plugin = TestPlugin { phases: vec![Box::new(TwoFindingsPhase)] };
        let ctx = PhaseContext::default();
        let registry = DetectorRegistry::standard();
        let output = run_phases(&plugin, &ctx, &registry);
        let ids: Vec<&str> = output.findings.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["security::a.rs::L1", "security::a.rs::L9"]);
    }
}
