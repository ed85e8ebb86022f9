//! Core finding lifecycle, four-channel scoring, and work-queue engine
//! for a codebase quality analyzer.
//!
//! This crate owns identity, state, scoring, queueing, and plan
//! reconciliation. AST extraction, linter subprocess execution, and
//! all rendering/CLI surfaces are external collaborators reached through
//! the [`detect::LanguagePlugin`] trait; this crate never shells out or
//! parses source text itself.

pub mod concerns;
pub mod config;
pub mod detect;
pub mod error;
pub mod graph;
pub mod integrity;
pub mod io;
pub mod plan;
pub mod queue;
pub mod scoring;
pub mod state;
pub mod taxonomy;
pub mod zone;

pub use error::{CoreError, Result};
pub use state::State;
pub use taxonomy::{DetectorRegistry, Tier, Zone};

use chrono::{DateTime, Utc};
use detect::{LanguagePlugin, PhaseContext};
use std::collections::HashSet;
use std::path::Path;

/// Everything one `run_scan` call produces, for a caller (the CLI binary,
/// a test, an embedding application) to act on without re-deriving it.
pub struct ScanResult {
    pub state: State,
    pub plan: plan::Plan,
    pub queue: queue::QueueResult,
    pub concerns: Vec<concerns::Concern>,
    pub integrity: integrity::IntegrityReport,
    pub dropped_finding_count: usize,
}

/// Run one full scan pass over `repo_root` using `plugin` (data-flow
/// table: discover -> classify zones -> build import graph -> run
/// detector phases -> merge into state -> score -> reconcile plan).
///
/// Callers own persistence: this function is pure over its inputs except
/// for whatever I/O `plugin`'s phases perform internally, and returns the
/// next `State`/`Plan` rather than writing them, so the driver can choose
/// when (and whether) to persist the result.
pub fn run_scan(
    repo_root: &Path,
    plugin: &dyn LanguagePlugin,
    config: &config::CoreConfig,
    mut state: State,
    mut plan: plan::Plan,
    now: DateTime<Utc>,
) -> ScanResult {
    let registry = DetectorRegistry::standard();

    let files = discover_files(repo_root, plugin, config);
    let classifier = std::sync::Arc::new(build_zone_classifier(config));

    let mut graph = graph::ImportGraph::new();
    for file in &files {
        graph.add_node(file);
        if is_entry_point(file, plugin) {
            graph.mark_entry_point(file);
        }
        for (target, deferred) in plugin.resolve_import(file) {
            graph.add_edge(file, &target, deferred);
        }
    }

    let ctx = PhaseContext {
        scan_root: repo_root.to_path_buf(),
        files: files.clone(),
        zone_classifier: classifier.clone(),
        tool_timeout: std::time::Duration::from_secs(120),
    };
    let mut output = detect::run_phases(plugin, &ctx, &registry);
    let (graph_findings, graph_potentials) = graph_derived_findings(&graph, &classifier);
    output.detectors_ran.insert("cycle".to_string());
    output.detectors_ran.insert("orphaned".to_string());
    for (detector, count) in graph_potentials {
        *output.potentials.entry(detector).or_insert(0) += count;
    }
    output.findings.extend(graph_findings);
    output.findings.sort_by(|a, b| a.id.cmp(&b.id));

    let ignore_patterns: Vec<glob::Pattern> =
        config.ignore.iter().filter_map(|p| glob::Pattern::new(p).ok()).collect();
    let merge_options = state::merge::MergeOptions {
        ignore_patterns,
        per_detector_noise_budget: config.finding_noise_budget,
        global_noise_budget: config.global_noise_budget(),
        stale_triggers: Default::default(),
    };

    let (mut state, _diff) = state::merge::merge_scan(state, output.findings, &output.detectors_ran, now, &merge_options);

    let scores = scoring::compute(&state, &output.potentials, &registry);
    state.scores = scores;
    state::merge::append_history(&mut state, scores, now);

    let integrity_report = integrity::run(&mut state, config.target_strict_score, 1.0);
    if integrity_report.flag_status == integrity::FlagStatus::Penalized {
        state.scores = scoring::compute(&state, &output.potentials, &registry);
    }

    let auto_clusters = plan::auto_cluster(&state);
    for (name, cluster) in auto_clusters {
        plan.clusters.entry(name).or_insert(cluster);
    }
    let scan_count = state.scan_history.len() as u64;
    let (plan, _reconcile_report) = plan::reconcile(plan, &state, now, scan_count);

    let clusters: Vec<plan::Cluster> = plan.clusters.values().cloned().collect();
    let skipped_ids: HashSet<String> = plan.skipped_ids().into_iter().collect();
    let queue_result = queue::build_queue(&state, &clusters, &skipped_ids, &queue::QueueFilter::default());

    let concerns = concerns::synthesize(&state);

    ScanResult {
        state,
        plan,
        queue: queue_result,
        concerns,
        integrity: integrity_report,
        dropped_finding_count: output.dropped_count,
    }
}

fn discover_files(repo_root: &Path, plugin: &dyn LanguagePlugin, config: &config::CoreConfig) -> Vec<String> {
    let exclude_patterns: Vec<glob::Pattern> =
        config.exclude.iter().filter_map(|p| glob::Pattern::new(p).ok()).collect();
    let extensions = plugin.extensions();

    walkdir::WalkDir::new(repo_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(repo_root).ok().map(|p| p.to_string_lossy().replace('\\', "/")))
        .filter(|rel| extensions.iter().any(|ext| rel.ends_with(&format!(".{ext}"))))
        .filter(|rel| !exclude_patterns.iter().any(|p| p.matches(rel)))
        .collect()
}

fn build_zone_classifier(config: &config::CoreConfig) -> zone::ZoneClassifier {
    zone::ZoneClassifier::new(config.zone_overrides.clone(), Vec::new(), Vec::new())
}

fn is_entry_point(file: &str, plugin: &dyn LanguagePlugin) -> bool {
    plugin.entry_patterns().iter().any(|pat| file.contains(pat))
}

/// Turn import-graph analysis (component C3) into findings the merge
/// step can treat like any other detector's output: one cross-file
/// finding per strongly connected component, and one file-scoped finding
/// per orphaned file.
fn graph_derived_findings(
    graph: &graph::ImportGraph,
    classifier: &zone::ZoneClassifier,
) -> (Vec<state::NewFinding>, std::collections::HashMap<String, u32>) {
    use state::{FindingDetail, NewFinding};
    use taxonomy::{Confidence, FindingId, Tier};

    let mut findings = Vec::new();
    let node_count = graph.nodes().count() as u32;

    for scc in graph.sccs() {
        let id = FindingId::cross_file("cycle", &scc);
        let zone = classifier.classify(scc.first().map(String::as_str).unwrap_or(""));
        findings.push(NewFinding {
            id: id.as_str().to_string(),
            detector: "cycle".to_string(),
            file: scc.first().cloned().unwrap_or_default(),
            tier: Tier::Judgment,
            confidence: Confidence::High,
            zone,
            lang: "unknown".to_string(),
            detail: FindingDetail { cluster_id: Some(id.as_str().to_string()), ..FindingDetail::default() },
        });
    }

    for orphan in graph.orphans() {
        let id = FindingId::file_scoped("orphaned", orphan);
        let zone = classifier.classify(orphan);
        findings.push(NewFinding {
            id: id.as_str().to_string(),
            detector: "orphaned".to_string(),
            file: orphan.to_string(),
            tier: Tier::QuickFix,
            confidence: Confidence::Medium,
            zone,
            lang: "unknown".to_string(),
            detail: FindingDetail::default(),
        });
    }

    let mut potentials = std::collections::HashMap::new();
    potentials.insert("cycle".to_string(), node_count);
    potentials.insert("orphaned".to_string(), node_count);
    (findings, potentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use detect::{Phase, PhaseContext};
    use std::collections::HashMap;
    use tempfile::tempdir;

    struct NoopPhase;
    impl Phase for NoopPhase {
        fn name(&self) -> &'static str {
            "noop"
        }
        fn run(&self, ctx: &PhaseContext) -> std::result::Result<(Vec<state::NewFinding>, HashMap<String, u32>), String> {
            let mut potentials = HashMap::new();
            potentials.insert("large_file".to_string(), ctx.files.len() as u32);
            Ok((Vec::new(), potentials))
        }
    }

    struct DemoPlugin {
        phases: Vec<Box<dyn Phase>>,
    }
    impl LanguagePlugin for DemoPlugin {
        fn extensions(&self) -> &[&str] {
            &["rs"]
        }
        fn phases(&self) -> &[Box<dyn Phase>] {
            &self.phases
        }
    }

    #[test]
    fn scan_over_empty_repo_yields_perfect_scores() {
        let dir = tempdir().unwrap();
        let plugin = DemoPlugin { phases: vec![Box::new(NoopPhase)] };
        let config = config::CoreConfig::default();
        let result = run_scan(dir.path(), &plugin, &config, State::new(), plan::Plan::new(), Utc::now());
        assert_eq!(result.state.scores.overall, 100.0);
        assert_eq!(result.dropped_finding_count, 0);
    }

    #[test]
    fn scan_discovers_matching_extension_files_only() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        std::fs::write(dir.path().join("b.txt"), "not rust").unwrap();
        let plugin = DemoPlugin { phases: vec![] };
        let config = config::CoreConfig::default();
        let files = discover_files(dir.path(), &plugin, &config);
        assert_eq!(files, vec!["a.rs".to_string()]);
    }
}
