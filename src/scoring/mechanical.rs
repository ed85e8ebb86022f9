//! Mechanical-pool aggregation: per-detector weighted failure sums and
//! per-dimension scores.

use super::constants::file_cap_for_group_size;
use crate::state::Finding;
use crate::taxonomy::{Dimension, DetectorRegistry, Status};
use std::collections::HashMap;

/// Failure-status sets by scoring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Lenient,
    Strict,
    VerifiedStrict,
}

impl Mode {
    pub fn failure_set(self) -> &'static [Status] {
        match self {
            Mode::Lenient => &[Status::Open],
            Mode::Strict => &[Status::Open, Status::Wontfix],
            Mode::VerifiedStrict => {
                &[Status::Open, Status::Wontfix, Status::Fixed, Status::FalsePositive]
            }
        }
    }
}

/// Weighted failure sum for one detector under one mode.
pub fn detector_weighted_failure_sum(
    findings: &[&Finding],
    detector: &str,
    registry: &DetectorRegistry,
    mode: Mode,
) -> f64 {
    let Some(policy) = registry.get(detector) else {
        return 0.0;
    };
    let failure_set = mode.failure_set();

    let eligible: Vec<&&Finding> = findings
        .iter()
        .filter(|f| f.detector == detector)
        .filter(|f| !f.suppressed)
        .filter(|f| !f.zone.excluded_from_scoring())
        .filter(|f| !policy.excluded_zones.contains(&f.zone))
        .filter(|f| failure_set.contains(&f.status))
        .collect();

    if policy.file_based {
        let mut by_file: HashMap<&str, Vec<&Finding>> = HashMap::new();
        for f in &eligible {
            by_file.entry(f.file.as_str()).or_default().push(f);
        }
        by_file
            .values()
            .map(|group| {
                let sum: f64 = group.iter().map(|f| f.weight()).sum();
                let mut sorted = group.clone();
                sorted.sort_by(|a, b| a.id.cmp(&b.id));
                let loc_weight = sorted.first().and_then(|f| f.detail.loc_weight);
                let cap = loc_weight.unwrap_or_else(|| file_cap_for_group_size(group.len()));
                sum.min(cap)
            })
            .sum()
    } else {
        eligible.iter().map(|f| f.weight()).sum()
    }
}

/// Per-dimension checks and weighted-failure totals, before sample
/// dampening.
#[derive(Debug, Clone, Copy, Default)]
pub struct DimensionTotals {
    pub checks: f64,
    pub weighted_failures: f64,
}

impl DimensionTotals {
    /// `score_d = max(0, (checks - wf) / checks) * 100`, clamped to
    /// `[0, 100]`. Absent (zero-checks) dimensions are not represented
    /// here; callers check `checks == 0.0` before calling.
    pub fn score(&self) -> f64 {
        if self.checks == 0.0 {
            return 100.0;
        }
        let raw = ((self.checks - self.weighted_failures) / self.checks) * 100.0;
        raw.max(0.0).min(100.0)
    }
}

/// Compute per-dimension totals across all mechanical detectors for one
/// mode.
pub fn dimension_totals(
    findings: &[&Finding],
    potentials: &HashMap<String, u32>,
    registry: &DetectorRegistry,
    mode: Mode,
) -> HashMap<Dimension, DimensionTotals> {
    let mut totals: HashMap<Dimension, DimensionTotals> = HashMap::new();
    for detector in registry.names() {
        let Some(info) = registry.get(detector) else { continue };
        let checks = *potentials.get(detector).unwrap_or(&0) as f64;
        if checks == 0.0 {
            continue;
        }
        let wf = detector_weighted_failure_sum(findings, detector, registry, mode);
        let entry = totals.entry(info.dimension).or_default();
        entry.checks += checks;
        entry.weighted_failures += wf;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FindingDetail;
    use crate::taxonomy::{Confidence, Tier, Zone};
    use chrono::Utc;

    fn finding(detector: &str, file: &str, tier: Tier, confidence: Confidence, status: Status) -> Finding {
        Finding {
            id: format!("{detector}::{file}::x"),
            detector: detector.to_string(),
            file: file.to_string(),
            tier,
            confidence,
            status,
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
        }
    }

    #[test]
    fn single_finding_weighted_sum_matches_spec_scenario_s2() {
        let registry = DetectorRegistry::standard();
        let f = finding("security", "a.rs", Tier::Judgment, Confidence::High, Status::Open);
        let findings = vec![&f];
        let sum = detector_weighted_failure_sum(&findings, "security", &registry, Mode::Lenient);
        // security is registered file_based: false, so the per-file cap
        // never applies: confidence=1.0 * tier=3 => 3.0.
        assert_eq!(sum, 3.0);
    }

    #[test]
    fn suppressed_findings_excluded() {
        let registry = DetectorRegistry::standard();
        let mut f = finding("security", "a.rs", Tier::Judgment, Confidence::High, Status::Open);
        f.suppressed = true;
        let findings = vec![&f];
        let sum = detector_weighted_failure_sum(&findings, "security", &registry, Mode::Lenient);
        assert_eq!(sum, 0.0);
    }

    #[test]
    fn excluded_zone_is_dropped() {
        let registry = DetectorRegistry::standard();
        let mut f = finding("security", "a.rs", Tier::Judgment, Confidence::High, Status::Open);
        f.zone = Zone::Vendor;
        let findings = vec![&f];
        let sum = detector_weighted_failure_sum(&findings, "security", &registry, Mode::Lenient);
        assert_eq!(sum, 0.0);
    }

    #[test]
    fn wontfix_counts_only_in_strict_modes() {
        let registry = DetectorRegistry::standard();
        let f = finding("security", "a.rs", Tier::Judgment, Confidence::High, Status::Wontfix);
        let findings = vec![&f];
        assert_eq!(detector_weighted_failure_sum(&findings, "security", &registry, Mode::Lenient), 0.0);
        assert!(detector_weighted_failure_sum(&findings, "security", &registry, Mode::Strict) > 0.0);
    }
}
