//! Subjective-pool aggregation: the twelve fixed dimensions read
//! directly from `subjective_assessments`.

use super::constants::SUBJECTIVE_DIMENSIONS;
use crate::state::SubjectiveAssessment;
use std::collections::BTreeMap;

/// One present subjective dimension's score and configured weight.
#[derive(Debug, Clone, Copy)]
pub struct SubjectiveEntry {
    pub score: f64,
    pub configured_weight: f64,
}

/// Collect the subjective dimensions that have an assessment recorded,
/// in the fixed dimension order. Dimensions never assessed are simply
/// absent from the returned map, matching mechanical dimensions with
/// zero checks.
pub fn present_dimensions(
    assessments: &BTreeMap<String, SubjectiveAssessment>,
) -> Vec<(&'static str, SubjectiveEntry)> {
    SUBJECTIVE_DIMENSIONS
        .iter()
        .filter_map(|(name, weight)| {
            assessments.get(*name).map(|a| {
                (
                    *name,
                    SubjectiveEntry { score: a.score, configured_weight: *weight },
                )
            })
        })
        .collect()
}
