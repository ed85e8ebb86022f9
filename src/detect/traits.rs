//! The [`LanguagePlugin`] and [`Phase`] collaborator interfaces.
//! AST extraction, linter subprocess invocation, and rendering are all
//! explicitly external; this crate only defines the typed seam a
//! plugin implementation must satisfy to feed the pipeline.

use crate::state::NewFinding;
use crate::zone::ZoneClassifier;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Per-scan context threaded through every phase: the scan root, the
/// file list already filtered by `exclude` patterns, the resolved zone
/// classifier (so a phase can tag each `NewFinding.zone` itself rather
/// than the core guessing it after the fact), and the per-tool timeout
/// budget.
#[derive(Debug, Clone)]
pub struct PhaseContext {
    pub scan_root: PathBuf,
    pub files: Vec<String>,
    pub zone_classifier: Arc<ZoneClassifier>,
    pub tool_timeout: Duration,
}

impl Default for PhaseContext {
    fn default() -> Self {
        Self {
            scan_root: PathBuf::from("."),
            files: Vec::new(),
            zone_classifier: Arc::new(ZoneClassifier::default()),
            tool_timeout: Duration::from_secs(120),
        }
    }
}

/// One callable phase in the pipeline: `(scan_path, lang_context)
/// -> (findings[], potentials{detector -> count})`.
///
/// A phase that panics or returns `Err` is treated as a phase failure:
/// the pipeline driver logs it and continues with the next phase, never
/// aborting the scan.
pub trait Phase: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this phase's backing tool is present. A phase whose tool
    /// is missing is skipped entirely: its detectors do not enter
    /// `detectors_ran`, so state merge will not auto-resolve their prior
    /// findings.
    fn tool_available(&self, _ctx: &PhaseContext) -> bool {
        true
    }

    fn run(&self, ctx: &PhaseContext) -> Result<(Vec<NewFinding>, HashMap<String, u32>), String>;
}

/// What the core consumes from a language plugin. Everything
/// AST-shaped (`extract_functions`, `extract_classes`) or
/// process-shaped (linter adapters, fixers) lives behind this interface;
/// the core only calls through it.
pub trait LanguagePlugin: Send + Sync {
    fn extensions(&self) -> &[&str];

    fn detect_markers(&self) -> &[&str] {
        &[]
    }

    fn large_threshold(&self) -> u32 {
        500
    }

    fn complexity_threshold(&self) -> u32 {
        10
    }

    /// Entry-point path patterns for orphan detection: a file
    /// matching one of these is never considered orphaned even with
    /// zero fan-in.
    fn entry_patterns(&self) -> &[&str] {
        &[]
    }

    /// Ordered phase list: tool-specific linters, structural,
    /// AST smells, cohesion, security, coupling/cycles, coverage,
    /// review freshness, duplicates, in that order, by convention.
    fn phases(&self) -> &[Box<dyn Phase>];

    /// Edge producer for the import graph: a file path to
    /// the list of `(imported_path, deferred)` pairs it resolves to.
    /// Default: no edges, for plugins that do not participate in import
    /// graph analysis.
    fn resolve_import(&self, _file: &str) -> Vec<(String, bool)> {
        Vec::new()
    }
}
