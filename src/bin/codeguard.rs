//! Thin CLI entry point. Argument parsing and process wiring only; all
//! scoring and merge logic lives in the library crate.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use codeguard_core::config::load_config;
use codeguard_core::detect::{LanguagePlugin, Phase, PhaseContext};
use codeguard_core::io::{read_json, write_json_atomically, ScanLock};
use codeguard_core::plan::Plan;
use codeguard_core::state::{NewFinding, State};
use codeguard_core::{run_scan, Tier};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codeguard", version, about = "Codebase quality scan")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Scan a repository and print the ranked work queue.
    Scan {
        path: PathBuf,
        #[arg(long)]
        tier: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

/// Built-in demo plugin exercising the core pipeline without an external
/// language toolchain. Real language support is an out-of-tree collaborator
/// implementing [`LanguagePlugin`]; this one exists so the binary runs
/// end-to-end out of the box.
struct DemoRustPlugin;

struct LargeFilePhase;

impl Phase for LargeFilePhase {
    fn name(&self) -> &'static str {
        "large_file_scan"
    }

    fn run(&self, ctx: &PhaseContext) -> std::result::Result<(Vec<NewFinding>, HashMap<String, u32>), String> {
        use codeguard_core::state::FindingDetail;
        use codeguard_core::taxonomy::{Confidence, FindingId};

        let mut findings = Vec::new();
        let mut potentials = HashMap::new();
        potentials.insert("large_file".to_string(), ctx.files.len() as u32);

        for file in &ctx.files {
            let full_path = ctx.scan_root.join(file);
            let Ok(contents) = std::fs::read_to_string(&full_path) else { continue };
            let loc = contents.lines().count() as u32;
            if loc > 500 {
                let id = FindingId::file_scoped("large_file", file);
                findings.push(NewFinding {
                    id: id.as_str().to_string(),
                    detector: "large_file".to_string(),
                    file: file.clone(),
                    tier: Tier::QuickFix,
                    confidence: Confidence::High,
                    zone: ctx.zone_classifier.classify(file),
                    lang: "rust".to_string(),
                    detail: FindingDetail { loc: Some(loc), ..FindingDetail::default() },
                });
            }
        }
        Ok((findings, potentials))
    }
}

impl LanguagePlugin for DemoRustPlugin {
    fn extensions(&self) -> &[&str] {
        &["rs"]
    }

    fn entry_patterns(&self) -> &[&str] {
        &["main.rs", "lib.rs"]
    }

    fn phases(&self) -> &[Box<dyn Phase>] {
        static PHASES: std::sync::OnceLock<Vec<Box<dyn Phase>>> = std::sync::OnceLock::new();
        PHASES.get_or_init(|| vec![Box::new(LargeFilePhase)])
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Scan { path, tier, json } => run(&path, tier.as_deref(), json),
    }
}

fn run(repo_root: &PathBuf, tier_filter: Option<&str>, as_json: bool) -> Result<()> {
    let codeguard_dir = repo_root.join(".codeguard");
    std::fs::create_dir_all(&codeguard_dir).context("creating .codeguard directory")?;
    let lock_path = codeguard_dir.join("state.json.lock");
    let _lock = ScanLock::acquire(&lock_path).context("another scan is already running")?;

    let config = load_config(repo_root).context("loading configuration")?;

    let state_path = codeguard_dir.join("state.json");
    let state = if state_path.exists() {
        read_json(&state_path).context("reading prior state")?
    } else {
        State::new()
    };

    let plan_path = codeguard_dir.join("plan.json");
    let plan = if plan_path.exists() {
        read_json(&plan_path).context("reading prior plan")?
    } else {
        Plan::new()
    };

    let plugin = DemoRustPlugin;
    let result = run_scan(repo_root, &plugin, &config, state, plan, Utc::now());

    write_json_atomically(&state_path, &result.state).context("writing state")?;
    write_json_atomically(&plan_path, &result.plan).context("writing plan")?;

    let tier: Option<Tier> = tier_filter.and_then(|t| match t {
        "auto_fix" => Some(Tier::AutoFix),
        "quick_fix" => Some(Tier::QuickFix),
        "judgment" => Some(Tier::Judgment),
        "major_refactor" => Some(Tier::MajorRefactor),
        _ => None,
    });
    let queue = if tier.is_some() {
        use codeguard_core::queue::{build_queue, QueueFilter};
        let clusters: Vec<_> = result.plan.clusters.values().cloned().collect();
        let skipped = result.plan.skipped_ids().into_iter().collect();
        build_queue(&result.state, &clusters, &skipped, &QueueFilter { tier, ..QueueFilter::default() })
    } else {
        result.queue
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result.state.scores)?);
    } else {
        println!(
            "overall={:.1} objective={:.1} strict={:.1} verified_strict={:.1}",
            result.state.scores.overall,
            result.state.scores.objective,
            result.state.scores.strict,
            result.state.scores.verified_strict
        );
        if let Some(reason) = &queue.fallback_reason {
            println!("note: {reason}");
        }
        println!("work queue ({} items):", queue.items.len());
        for item in queue.items.iter().take(20) {
            println!("  {item:?}");
        }
        if !result.concerns.is_empty() {
            println!("concerns:");
            for concern in &result.concerns {
                println!("  [{:?}] {}", concern.kind, concern.summary);
            }
        }
    }

    Ok(())
}
