//! Named scoring constants. All threshold changes must be
//! single-site, per the design note on scattered ad-hoc similarity
//! thresholds; this module is that single site.

/// Minimum checks before a dimension carries its full configured weight.
pub const MIN_SAMPLE: f64 = 200.0;

/// Display/priority-only multiplier for holistic (non-file-based)
/// detector weight. This does NOT enter any score formula; the
/// conservative, display-only reading was confirmed against the
/// scenario-driven parity tests in the integration suite.
pub const HOLISTIC_MULTIPLIER: f64 = 10.0;

/// Fixed "checks" denominator used for every subjective dimension's
/// sample-dampening calculation, regardless of how many review items
/// actually fed the assessment.
pub const SUBJECTIVE_CHECKS: f64 = 10.0;

/// Pool blend weights: `overall = MECH_POOL_WEIGHT * mech_avg +
/// SUBJECTIVE_POOL_WEIGHT * subj_avg`.
pub const MECH_POOL_WEIGHT: f64 = 0.40;
pub const SUBJECTIVE_POOL_WEIGHT: f64 = 0.60;

/// Per-file cap on the sum of finding weights for a file-based detector,
/// selected by the number of findings the detector reported in that
/// file. `<3 => 1.0; 3..=5 => 1.5; >=6 => 2.0`.
pub fn file_cap_for_group_size(count: usize) -> f64 {
    if count < 3 {
        1.0
    } else if count <= 5 {
        1.5
    } else {
        2.0
    }
}

/// The twelve fixed subjective dimensions and their configured weights
///. Order is display order, not semantically significant.
pub const SUBJECTIVE_DIMENSIONS: &[(&str, f64)] = &[
    ("high_elegance", 22.0),
    ("mid_elegance", 22.0),
    ("low_elegance", 12.0),
    ("contracts", 12.0),
    ("type_safety", 12.0),
    ("design_coherence", 10.0),
    ("abstraction", 8.0),
    ("logic_clarity", 6.0),
    ("structure_nav", 5.0),
    ("error_consistency", 3.0),
    ("naming_quality", 2.0),
    ("ai_generated_debt", 1.0),
];
