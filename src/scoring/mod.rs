//! Scoring engine: deterministic computation of the
//! four score channels from finding state, per-scan potentials, and
//! subjective assessments.

pub mod constants;
pub mod mechanical;
pub mod subjective;

pub use mechanical::Mode;

use crate::state::{Finding, ScoreChannels, State};
use crate::taxonomy::DetectorRegistry;
use constants::{MECH_POOL_WEIGHT, MIN_SAMPLE, SUBJECTIVE_CHECKS, SUBJECTIVE_POOL_WEIGHT};
use std::collections::HashMap;

/// Effective (post-dampening) weight and score for one present dimension,
/// mechanical or subjective.
struct WeightedScore {
    score: f64,
    effective_weight: f64,
}

fn sample_dampen(configured_weight: f64, checks: f64) -> f64 {
    configured_weight * (checks / MIN_SAMPLE).min(1.0)
}

fn pool_average(entries: &[WeightedScore]) -> Option<f64> {
    let total_weight: f64 = entries.iter().map(|e| e.effective_weight).sum();
    if total_weight <= 0.0 || entries.is_empty() {
        return None;
    }
    Some(entries.iter().map(|e| e.score * e.effective_weight).sum::<f64>() / total_weight)
}

fn mechanical_pool(
    findings: &[&Finding],
    potentials: &HashMap<String, u32>,
    registry: &DetectorRegistry,
    mode: Mode,
) -> Option<f64> {
    let totals = mechanical::dimension_totals(findings, potentials, registry, mode);
    let entries: Vec<WeightedScore> = totals
        .iter()
        .map(|(dim, t)| WeightedScore {
            score: t.score(),
            effective_weight: sample_dampen(dim.configured_weight(), t.checks),
        })
        .collect();
    pool_average(&entries)
}

fn subjective_pool(state: &State) -> Option<f64> {
    let present = subjective::present_dimensions(&state.subjective_assessments);
    let entries: Vec<WeightedScore> = present
        .iter()
        .map(|(_, e)| WeightedScore {
            score: e.score,
            effective_weight: sample_dampen(e.configured_weight, SUBJECTIVE_CHECKS),
        })
        .collect();
    pool_average(&entries)
}

/// Blend the two pools, with degeneracy handling: a pool that is
/// entirely absent drops out of the blend and the other pool's average
/// stands alone (weights renormalized to 1.0).
fn blend(mech: Option<f64>, subj: Option<f64>) -> f64 {
    match (mech, subj) {
        (Some(m), Some(s)) => MECH_POOL_WEIGHT * m + SUBJECTIVE_POOL_WEIGHT * s,
        (Some(m), None) => m,
        (None, Some(s)) => s,
        // Empty findings / no data at all: vacuously perfect
        // "Empty findings -> all scores exactly 100.0".
        (None, None) => 100.0,
    }
}

/// Compute all four score channels for the given state and this scan's
/// detector potentials.
pub fn compute(
    state: &State,
    potentials: &HashMap<String, u32>,
    registry: &DetectorRegistry,
) -> ScoreChannels {
    let findings: Vec<&Finding> = state.findings.values().collect();
    let subj = subjective_pool(state);

    let objective_mech = mechanical_pool(&findings, potentials, registry, Mode::Lenient);
    let overall = blend(objective_mech, subj);
    let objective = objective_mech.unwrap_or(100.0);
    let strict_mech = mechanical_pool(&findings, potentials, registry, Mode::Strict);
    let strict = blend(strict_mech, subj);
    let verified_mech = mechanical_pool(&findings, potentials, registry, Mode::VerifiedStrict);
    let verified_strict = blend(verified_mech, subj);

    ScoreChannels { overall, objective, strict, verified_strict }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FindingDetail;
    use crate::taxonomy::{Confidence, Status, Tier, Zone};
    use chrono::Utc;

    fn finding(detector: &str, status: Status, tier: Tier, confidence: Confidence) -> Finding {
        Finding {
            id: format!("{detector}::a.rs::x"),
            detector: detector.to_string(),
            file: "a.rs".to_string(),
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
    fn empty_state_scores_100_everywhere() {
        let state = State::new();
        let registry = DetectorRegistry::standard();
        let scores = compute(&state, &HashMap::new(), &registry);
        assert_eq!(scores.overall, 100.0);
        assert_eq!(scores.objective, 100.0);
        assert_eq!(scores.strict, 100.0);
        assert_eq!(scores.verified_strict, 100.0);
    }

    #[test]
    fn scenario_s2_single_security_finding() {
        let mut state = State::new();
        let f = finding("security", Status::Open, Tier::Judgment, Confidence::High);
        state.findings.insert(f.id.clone(), f);
        let registry = DetectorRegistry::standard();
        let mut potentials = HashMap::new();
        potentials.insert("security".to_string(), 100u32);
        let scores = compute(&state, &potentials, &registry);
        // weighted failure = 3.0, dim score = (100-3)/100*100 = 97.0;
        // only mechanical dimension present -> all three blended channels
        // equal 97.0 since no subjective data is present.
        assert!((scores.overall - 97.0).abs() < 1e-9);
        assert!((scores.objective - 97.0).abs() < 1e-9);
        assert!((scores.strict - 97.0).abs() < 1e-9);
        assert!((scores.verified_strict - 97.0).abs() < 1e-9);
    }

    #[test]
    fn scenario_s3_wontfix_accountability() {
        let mut state = State::new();
        let f = finding("security", Status::Wontfix, Tier::Judgment, Confidence::High);
        state.findings.insert(f.id.clone(), f);
        let registry = DetectorRegistry::standard();
        let mut potentials = HashMap::new();
        potentials.insert("security".to_string(), 100u32);
        let scores = compute(&state, &potentials, &registry);
        assert_eq!(scores.overall, 100.0);
        assert!((scores.strict - 97.0).abs() < 1e-9);
    }

    #[test]
    fn overall_is_never_less_than_strict_or_verified_strict() {
        let mut state = State::new();
        for (detector, status) in [
            ("security", Status::Open),
            ("complexity", Status::Wontfix),
            ("smell", Status::Fixed),
        ] {
            let f = Finding {
                id: format!("{detector}::a.rs::x"),
                ..finding(detector, status, Tier::Judgment, Confidence::High)
            };
            state.findings.insert(f.id.clone(), f);
        }
        let registry = DetectorRegistry::standard();
        let mut potentials = HashMap::new();
        potentials.insert("security".to_string(), 50u32);
        potentials.insert("complexity".to_string(), 50u32);
        potentials.insert("smell".to_string(), 50u32);
        let scores = compute(&state, &potentials, &registry);
        assert!(scores.overall >= scores.strict);
        assert!(scores.strict >= scores.verified_strict);
    }

    #[test]
    fn min_sample_boundary_gives_full_weight() {
        let mut potentials = HashMap::new();
        potentials.insert("security".to_string(), 200u32);
        let w = sample_dampen(1.0, *potentials.get("security").unwrap() as f64);
        assert_eq!(w, 1.0);
    }
}
