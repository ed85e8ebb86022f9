//! Finding identity and the static detector registry (component C1).
//!
//! Finding ids are the system's primary identity contract: the same
//! logical defect must produce the same id across scans, and different
//! defects must never collide. See [`FindingId`] for the construction
//! rules and [`DetectorRegistry`] for the compile-time, single-sourced
//! table of known detectors.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Severity ordinal. The numeric value doubles as the tier weight used by
/// the scoring engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    AutoFix = 1,
    QuickFix = 2,
    Judgment = 3,
    MajorRefactor = 4,
}

impl Tier {
    pub const fn weight(self) -> f64 {
        self as u8 as f64
    }

    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    pub const ALL: [Tier; 4] = [Tier::AutoFix, Tier::QuickFix, Tier::Judgment, Tier::MajorRefactor];

    /// One step toward `AutoFix`, saturating. Used by [`ZonePolicy::DowngradeOneTier`]
    /// (: a detector can ask for a finding to be treated as less severe
    /// in a particular zone without being skipped outright).
    pub const fn downgrade_one(self) -> Tier {
        match self {
            Tier::MajorRefactor => Tier::Judgment,
            Tier::Judgment => Tier::QuickFix,
            Tier::QuickFix => Tier::AutoFix,
            Tier::AutoFix => Tier::AutoFix,
        }
    }
}

/// Per-finding certainty, also a scoring weight multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub const fn weight(self) -> f64 {
        match self {
            Confidence::High => 1.0,
            Confidence::Medium => 0.7,
            Confidence::Low => 0.3,
        }
    }

    /// Lower rank sorts first in the work queue.
    pub const fn rank(self) -> u8 {
        match self {
            Confidence::High => 0,
            Confidence::Medium => 1,
            Confidence::Low => 2,
        }
    }
}

/// Finding lifecycle status. A finding is in exactly one status at
/// any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Open,
    Fixed,
    AutoResolved,
    Wontfix,
    FalsePositive,
}

impl Status {
    /// Resolved statuses require a [`crate::state::ResolutionAttestation`]
    /// on the transition that reaches them, and reopening one clears it.
    pub const fn requires_attestation(self) -> bool {
        matches!(self, Status::Wontfix | Status::FalsePositive)
    }

    pub const fn is_resolved(self) -> bool {
        matches!(
            self,
            Status::Fixed | Status::AutoResolved | Status::Wontfix | Status::FalsePositive
        )
    }
}

/// File classification. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Production,
    Test,
    Config,
    Generated,
    Script,
    Vendor,
}

impl Zone {
    /// Zones whose findings are excluded from scoring entirely.
    pub const fn excluded_from_scoring(self) -> bool {
        matches!(self, Zone::Generated | Zone::Vendor)
    }
}

/// Priority of the action a cluster would take if accepted; lower sorts
/// first in the work queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    AutoFix = 0,
    Reorganize = 1,
    Refactor = 2,
    ManualFix = 3,
    DebtReview = 4,
}

/// Per-(detector, zone) scoring/inclusion policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZonePolicy {
    Skip,
    DowngradeOneTier,
    Normal,
}

/// Resolve the policy a detector should apply to a finding observed in
/// `zone`. Globally-excluded zones and a detector's own
/// `excluded_zones` both yield `Skip`; `Test`/`Config` soften severity by
/// one tier rather than dropping the finding outright; everything else is
/// unchanged.
pub fn zone_policy_for(detector: &DetectorInfo, zone: Zone) -> ZonePolicy {
    if zone.excluded_from_scoring() || detector.excluded_zones.contains(&zone) {
        ZonePolicy::Skip
    } else if matches!(zone, Zone::Test | Zone::Config) {
        ZonePolicy::DowngradeOneTier
    } else {
        ZonePolicy::Normal
    }
}

/// Mechanical scoring dimension fixed weight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    FileHealth,
    CodeQuality,
    Duplication,
    TestHealth,
    Security,
}

impl Dimension {
    pub const fn configured_weight(self) -> f64 {
        match self {
            Dimension::FileHealth => 2.0,
            Dimension::CodeQuality => 1.0,
            Dimension::Duplication => 1.0,
            Dimension::TestHealth => 1.0,
            Dimension::Security => 1.0,
        }
    }
}

/// Static metadata for one detector. Populated once at registry
/// construction; never mutated afterward.
#[derive(Debug, Clone)]
pub struct DetectorInfo {
    pub name: &'static str,
    pub display_label: &'static str,
    pub dimension: Dimension,
    pub structural: bool,
    pub needs_judgment: bool,
    pub file_based: bool,
    /// Zones excluded outright for this detector (in addition to the
    /// globally-excluded Generated/Vendor zones).
    pub excluded_zones: &'static [Zone],
}

/// Compile-time, single-sourced detector registry. Lookup is O(1) and
/// infallible for known names, avoiding dynamic dispatch through
/// string-keyed detector maps.
#[derive(Debug, Clone)]
pub struct DetectorRegistry {
    by_name: BTreeMap<&'static str, DetectorInfo>,
}

impl DetectorRegistry {
    /// The built-in detector set. Language plugins consume these names;
    /// the core never learns a new detector at runtime.
    pub fn standard() -> Self {
        let entries = [
            DetectorInfo {
                name: "large_file",
                display_label: "Large file",
                dimension: Dimension::FileHealth,
                structural: true,
                needs_judgment: false,
                file_based: true,
                excluded_zones: &[Zone::Test],
            },
            DetectorInfo {
                name: "complexity",
                display_label: "High complexity",
                dimension: Dimension::CodeQuality,
                structural: true,
                needs_judgment: false,
                file_based: true,
                excluded_zones: &[],
            },
            DetectorInfo {
                name: "god_class",
                display_label: "God class",
                dimension: Dimension::CodeQuality,
                structural: true,
                needs_judgment: true,
                file_based: true,
                excluded_zones: &[],
            },
            DetectorInfo {
                name: "smell",
                display_label: "Code smell",
                dimension: Dimension::CodeQuality,
                structural: false,
                needs_judgment: false,
                file_based: true,
                excluded_zones: &[],
            },
            DetectorInfo {
                name: "unused_import",
                display_label: "Unused import",
                dimension: Dimension::CodeQuality,
                structural: false,
                needs_judgment: false,
                file_based: true,
                excluded_zones: &[Zone::Generated],
            },
            DetectorInfo {
                name: "security",
                display_label: "Security pattern",
                dimension: Dimension::Security,
                structural: false,
                needs_judgment: false,
                file_based: false,
                excluded_zones: &[Zone::Test],
            },
            DetectorInfo {
                name: "coupling",
                display_label: "Excess coupling",
                dimension: Dimension::FileHealth,
                structural: true,
                needs_judgment: false,
                file_based: true,
                excluded_zones: &[],
            },
            DetectorInfo {
                name: "cycle",
                display_label: "Import cycle",
                dimension: Dimension::FileHealth,
                structural: true,
                needs_judgment: false,
                file_based: false,
                excluded_zones: &[],
            },
            DetectorInfo {
                name: "orphaned",
                display_label: "Orphaned file",
                dimension: Dimension::FileHealth,
                structural: false,
                needs_judgment: false,
                file_based: true,
                excluded_zones: &[Zone::Script],
            },
            DetectorInfo {
                name: "test_coverage",
                display_label: "Missing test coverage",
                dimension: Dimension::TestHealth,
                structural: false,
                needs_judgment: false,
                file_based: true,
                excluded_zones: &[Zone::Test],
            },
            DetectorInfo {
                name: "review_freshness",
                display_label: "Stale subjective review",
                dimension: Dimension::CodeQuality,
                structural: false,
                needs_judgment: true,
                file_based: false,
                excluded_zones: &[],
            },
            DetectorInfo {
                name: "dupes",
                display_label: "Duplicate block",
                dimension: Dimension::Duplication,
                structural: false,
                needs_judgment: false,
                file_based: true,
                excluded_zones: &[Zone::Generated, Zone::Test],
            },
        ];
        let by_name = entries.into_iter().map(|e| (e.name, e)).collect();
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&DetectorInfo> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_name.keys().copied()
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Canonical finding id: `"{detector}::{relative_path}::{symbol}"`.
///
/// The symbol slot is chosen per defect class by the detector:
/// function/method-scoped findings use a qualified symbol name,
/// file-scoped findings use an empty symbol, line-scoped findings use
/// `"L{n}"`, and cross-file findings (cycles, duplicate clusters) use a
/// short hash of the sorted member set so identity survives partial
/// membership changes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindingId(String);

impl FindingId {
    pub fn new(detector: &str, file: &str, symbol: &str) -> Self {
        Self(format!("{detector}::{file}::{symbol}"))
    }

    pub fn file_scoped(detector: &str, file: &str) -> Self {
        Self::new(detector, file, "")
    }

    pub fn line_scoped(detector: &str, file: &str, line: usize) -> Self {
        Self::new(detector, file, &format!("L{line}"))
    }

    /// Cross-file id: detector plus a stable hash of the sorted member
    /// set. Member-set hashing (rather than "first file alphabetically")
    /// keeps identity stable when a refactor drops or adds members, per
    /// the design note fixing cycle identity.
    pub fn cross_file(detector: &str, members: &[String]) -> Self {
        let mut sorted: Vec<&str> = members.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        let hash = member_set_hash(&sorted);
        Self(format!("{detector}::{hash}::"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse back the `(detector, file, symbol)` components. Returns
    /// `None` if the id does not have exactly two `::` separators.
    pub fn parts(&self) -> Option<(&str, &str, &str)> {
        let mut iter = self.0.splitn(3, "::");
        let detector = iter.next()?;
        let file = iter.next()?;
        let symbol = iter.next()?;
        Some((detector, file, symbol))
    }
}

impl std::fmt::Display for FindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Short, stable hash (16 hex chars) of a sorted member set. Shared by
/// cross-file finding ids and concern fingerprints.
pub fn member_set_hash(sorted_members: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, m) in sorted_members.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\x1f");
        }
        hasher.update(m.as_bytes());
    }
    let digest = hasher.finalize();
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}
