//! Finding and state data model plus the merge operation.

pub mod merge;

use crate::taxonomy::{Confidence, Status, Tier, Zone};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Typed, well-known detail fields promoted out of the freeform bag
/// (design note: "duck-typed detail dicts" → typed fields + residual
/// bag). Scoring and queue code reads only these typed fields; detectors
/// may still stash private data in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingDetail {
    pub loc: Option<u32>,
    pub loc_weight: Option<f64>,
    pub complexity: Option<u32>,
    pub symbol: Option<String>,
    pub line: Option<u32>,
    pub cluster_id: Option<String>,
    pub review_weight: Option<f64>,
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FindingDetail {
    /// Last-wins merge of a freshly observed detail into the existing
    /// one upsert rule ("merge new detail fields, last-wins
    /// per key").
    pub fn merge_from(&mut self, new: &FindingDetail) {
        if new.loc.is_some() {
            self.loc = new.loc;
        }
        if new.loc_weight.is_some() {
            self.loc_weight = new.loc_weight;
        }
        if new.complexity.is_some() {
            self.complexity = new.complexity;
        }
        if new.symbol.is_some() {
            self.symbol = new.symbol.clone();
        }
        if new.line.is_some() {
            self.line = new.line;
        }
        if new.cluster_id.is_some() {
            self.cluster_id = new.cluster_id.clone();
        }
        if new.review_weight.is_some() {
            self.review_weight = new.review_weight;
        }
        for (k, v) in &new.extra {
            self.extra.insert(k.clone(), v.clone());
        }
    }
}

/// Who/why/when a Wontfix or FalsePositive resolution was made, or a
/// reopen was forced. Required for resolutions requiring attestation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionAttestation {
    pub kind: String,
    pub by: String,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// The atomic unit of analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub detector: String,
    pub file: String,
    pub tier: Tier,
    pub confidence: Confidence,
    pub status: Status,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub reopen_count: u32,
    pub suppressed: bool,
    pub suppression_pattern: Option<String>,
    pub suppressed_at: Option<DateTime<Utc>>,
    pub noise_tag: bool,
    pub resolution_attestation: Option<ResolutionAttestation>,
    pub zone: Zone,
    pub lang: String,
    pub detail: FindingDetail,
}

impl Finding {
    /// Per-finding scoring weight: `confidence × tier`.
    pub fn weight(&self) -> f64 {
        self.confidence.weight() * self.tier.weight()
    }
}

/// A newly observed finding from a detector phase, before it has been
/// assigned timestamps / lifecycle fields by the merge step.
#[derive(Debug, Clone)]
pub struct NewFinding {
    pub id: String,
    pub detector: String,
    pub file: String,
    pub tier: Tier,
    pub confidence: Confidence,
    pub zone: Zone,
    pub lang: String,
    pub detail: FindingDetail,
}

/// One entry in the bounded scan history FIFO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanHistoryEntry {
    pub at: DateTime<Utc>,
    pub overall: f64,
    pub objective: f64,
    pub strict: f64,
    pub verified_strict: f64,
    pub open_count: usize,
}

/// Aggregate file/LOC/status counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub file_count: usize,
    pub loc_count: u64,
    pub dir_count: usize,
    pub open_count: usize,
    pub fixed_count: usize,
    pub auto_resolved_count: usize,
    pub wontfix_count: usize,
    pub false_positive_count: usize,
}

/// One subjective dimension's latest assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectiveAssessment {
    pub score: f64,
    pub source: String,
    pub assessed_at: DateTime<Utc>,
    #[serde(default)]
    pub needs_review_refresh: bool,
}

/// Anti-gaming provenance accumulated by the integrity guard (C10).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectiveIntegrity {
    /// Number of scans (cumulative) in which two-or-more dimensions
    /// matched the target-anchoring tolerance band.
    pub target_match_count: u32,
    pub last_flag_status: Option<String>,
    pub last_matched_dimensions: Vec<String>,
}

/// The four parallel score channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreChannels {
    pub overall: f64,
    pub objective: f64,
    pub strict: f64,
    pub verified_strict: f64,
}

/// Current schema version written by this crate. Bump alongside a
/// migration in [`State::migrate`].
pub const STATE_SCHEMA_VERSION: u32 = 1;
pub const MIN_SUPPORTED_STATE_VERSION: u32 = 1;

/// Top-level, version-stamped state container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub version: u32,
    pub findings: BTreeMap<String, Finding>,
    pub stats: Stats,
    pub scores: ScoreChannels,
    pub scan_history: Vec<ScanHistoryEntry>,
    pub subjective_assessments: BTreeMap<String, SubjectiveAssessment>,
    pub subjective_integrity: SubjectiveIntegrity,
    pub concern_dismissals: std::collections::BTreeSet<String>,
}

impl State {
    pub const SCAN_HISTORY_LIMIT: usize = 20;

    pub fn new() -> Self {
        Self {
            version: STATE_SCHEMA_VERSION,
            findings: BTreeMap::new(),
            stats: Stats::default(),
            scores: ScoreChannels::default(),
            scan_history: Vec::new(),
            subjective_assessments: BTreeMap::new(),
            subjective_integrity: SubjectiveIntegrity::default(),
            concern_dismissals: std::collections::BTreeSet::new(),
        }
    }

    pub fn push_history(&mut self, entry: ScanHistoryEntry) {
        self.scan_history.push(entry);
        if self.scan_history.len() > Self::SCAN_HISTORY_LIMIT {
            let excess = self.scan_history.len() - Self::SCAN_HISTORY_LIMIT;
            self.scan_history.drain(0..excess);
        }
    }

    pub fn recompute_stats(&mut self) {
        let mut stats = Stats {
            file_count: 0,
            loc_count: 0,
            dir_count: 0,
            open_count: 0,
            fixed_count: 0,
            auto_resolved_count: 0,
            wontfix_count: 0,
            false_positive_count: 0,
        };
        for f in self.findings.values() {
            match f.status {
                Status::Open => stats.open_count += 1,
                Status::Fixed => stats.fixed_count += 1,
                Status::AutoResolved => stats.auto_resolved_count += 1,
                Status::Wontfix => stats.wontfix_count += 1,
                Status::FalsePositive => stats.false_positive_count += 1,
            }
        }
        stats.file_count = self.stats.file_count;
        stats.loc_count = self.stats.loc_count;
        stats.dir_count = self.stats.dir_count;
        self.stats = stats;
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// Diff of one merge operation: what changed, for display and for
/// the integrity guard / scoring delta.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanDiff {
    pub new_ids: Vec<String>,
    pub resolved_ids: Vec<String>,
    pub reopened_ids: Vec<String>,
    pub score_delta: f64,
}
