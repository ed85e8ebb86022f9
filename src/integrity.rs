//! Integrity guard: anti-gaming checks over
//! subjective scores, run post-scoring.

use crate::state::{ScoreChannels, State};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Two or more dimension matches across scans trips a deterministic
/// reset of the matching dimensions for the current scan.
pub const SUBJECTIVE_TARGET_RESET_THRESHOLD: u32 = 2;

/// Tolerance band around the configured target score within which a
/// dimension is considered "anchored": a boundary gap of exactly 0.05
/// still flags.
pub const TARGET_MATCH_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagStatus {
    Disabled,
    Pass,
    Warn,
    Penalized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub flag_status: FlagStatus,
    pub matched_dimensions: Vec<String>,
    pub placeholder_findings: Vec<String>,
    pub wontfix_warning: bool,
}

static PLACEHOLDER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)lorem ipsum").unwrap(),
        Regex::new(r"(?i)\btodo\b").unwrap(),
        Regex::new(r"(.)\1{9,}").unwrap(),
    ]
});

/// Run every integrity check and, on `Penalized`, reset the matching
/// dimensions' scores to 0 for the current scan as a side effect.
pub fn run(state: &mut State, target_strict_score: u8, strict_gap_threshold: f64) -> IntegrityReport {
    let target = target_strict_score as f64;
    let matched: Vec<String> = state
        .subjective_assessments
        .iter()
        .filter(|(_, a)| (a.score - target).abs() <= TARGET_MATCH_TOLERANCE)
        .map(|(dim, _)| dim.clone())
        .collect();

    let flag_status = if matched.len() < 2 {
        FlagStatus::Pass
    } else {
        state.subjective_integrity.target_match_count += 1;
        if state.subjective_integrity.target_match_count >= SUBJECTIVE_TARGET_RESET_THRESHOLD {
            for dim in &matched {
                if let Some(a) = state.subjective_assessments.get_mut(dim) {
                    a.score = 0.0;
                }
            }
            FlagStatus::Penalized
        } else {
            FlagStatus::Warn
        }
    };

    state.subjective_integrity.last_flag_status = Some(format!("{flag_status:?}"));
    state.subjective_integrity.last_matched_dimensions = matched.clone();

    let placeholder_findings = scan_placeholder_content(state);
    let wontfix_warning = wontfix_accountability(&state.scores, strict_gap_threshold);

    IntegrityReport { flag_status, matched_dimensions: matched, placeholder_findings, wontfix_warning }
}

fn scan_placeholder_content(state: &State) -> Vec<String> {
    let mut hits = Vec::new();
    for (id, finding) in &state.findings {
        let Some(notes) = finding.detail.extra.get("review_notes").and_then(|v| v.as_str()) else {
            continue;
        };
        if PLACEHOLDER_PATTERNS.iter().any(|re| re.is_match(notes)) {
            hits.push(id.clone());
        }
    }
    hits
}

/// Wontfix accountability: flag if the
/// lenient-to-strict score gap exceeds `strict_gap_threshold` points,
/// which signals a Wontfix population large enough to be meaningfully
/// hiding debt from the lenient channel.
pub fn wontfix_accountability(scores: &ScoreChannels, strict_gap_threshold: f64) -> bool {
    (scores.overall - scores.strict) > strict_gap_threshold
}
