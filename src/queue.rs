//! Work queue: composite-key ranking over
//! mechanical findings, clusters, and subjective items.

use crate::plan::Cluster;
use crate::scoring::constants::HOLISTIC_MULTIPLIER;
use crate::state::State;
use crate::taxonomy::{ActionPriority, Confidence, Tier};

/// One heterogeneous work-queue entry.
#[derive(Debug, Clone)]
pub enum QueueItem {
    Cluster { name: String, action: ActionPriority, member_count: usize },
    Mechanical { id: String, tier: Tier, confidence: Confidence, review_weight: f64, count: u32 },
    Subjective { dimension: String, score: f64 },
}

/// The fully-ordered sort key for one item: `(effective_tier, bucket,
/// secondary, tertiary, quaternary, id)`. Clusters and mechanical
/// findings share `bucket = 0`; subjective items use `bucket = 1` and
/// are always forced to `effective_tier = MajorRefactor`, which places
/// them after same-tier mechanical items but keeps them orderable
/// against other tiers. Every item carries an `id` tiebreak so the
/// order is total.
fn combined_key(item: &QueueItem) -> (u8, u8, i64, i64, i64, String) {
    match item {
        QueueItem::Cluster { name, action, member_count } => {
            (0, 0, *action as i64, -(*member_count as i64), 0, name.clone())
        }
        QueueItem::Mechanical { id, tier, confidence, review_weight, count } => (
            tier.ordinal(),
            0,
            confidence.rank() as i64,
            -((*review_weight) * 1000.0) as i64,
            -(*count as i64),
            id.clone(),
        ),
        QueueItem::Subjective { dimension, score } => {
            (Tier::MajorRefactor.ordinal(), 1, (*score * 1000.0) as i64, 0, 0, dimension.clone())
        }
    }
}

/// Filters applied before ranking.
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    pub tier: Option<Tier>,
    pub scope_prefix: Option<String>,
    pub chronic_only: bool,
    pub include_skipped: bool,
    pub no_tier_fallback: bool,
    pub collapse_clusters: bool,
}

#[derive(Debug, Clone, Default)]
pub struct QueueResult {
    pub items: Vec<QueueItem>,
    pub fallback_reason: Option<String>,
}

/// Build the ranked work queue from current state, active clusters, and
/// skip set.
pub fn build_queue(
    state: &State,
    clusters: &[Cluster],
    skipped_ids: &std::collections::HashSet<String>,
    filter: &QueueFilter,
) -> QueueResult {
    let collapsed_ids: std::collections::HashSet<&str> = if filter.collapse_clusters {
        clusters.iter().flat_map(|c| c.finding_ids.iter().map(String::as_str)).collect()
    } else {
        std::collections::HashSet::new()
    };

    let mut items = collect_items(state, clusters, skipped_ids, filter, &collapsed_ids);

    let mut fallback_reason = None;
    if let Some(tier) = filter.tier {
        if !filter.no_tier_fallback && !items.iter().any(|i| matches_tier(i, tier)) {
            // Fall through to adjacent tiers: lower first, then higher.
            let ordered_candidates = adjacent_tiers(tier);
            for candidate in ordered_candidates {
                let relaxed_filter = QueueFilter { tier: Some(candidate), ..filter.clone() };
                let relaxed = collect_items(state, clusters, skipped_ids, &relaxed_filter, &collapsed_ids);
                if !relaxed.is_empty() {
                    items = relaxed;
                    fallback_reason =
                        Some(format!("no findings at tier {tier:?}; falling back to {candidate:?}"));
                    break;
                }
            }
        }
    }

    items.sort_by(|a, b| combined_key(a).cmp(&combined_key(b)));
    QueueResult { items, fallback_reason }
}

fn matches_tier(item: &QueueItem, tier: Tier) -> bool {
    match item {
        QueueItem::Mechanical { tier: t, .. } => *t == tier,
        QueueItem::Cluster { .. } => tier == Tier::AutoFix || tier == Tier::QuickFix,
        QueueItem::Subjective { .. } => tier == Tier::MajorRefactor,
    }
}

/// Lower tiers first, then higher, as ordinal distance from `tier`.
fn adjacent_tiers(tier: Tier) -> Vec<Tier> {
    let mut candidates: Vec<(i32, Tier)> = Tier::ALL
        .iter()
        .filter(|t| **t != tier)
        .map(|t| (t.ordinal() as i32 - tier.ordinal() as i32, *t))
        .collect();
    candidates.sort_by_key(|(delta, _)| (delta.signum() > 0, delta.abs()));
    candidates.into_iter().map(|(_, t)| t).collect()
}

fn collect_items(
    state: &State,
    clusters: &[Cluster],
    skipped_ids: &std::collections::HashSet<String>,
    filter: &QueueFilter,
    collapsed_ids: &std::collections::HashSet<&str>,
) -> Vec<QueueItem> {
    let mut items = Vec::new();

    for cluster in clusters {
        if !filter.collapse_clusters {
            continue;
        }
        let item = QueueItem::Cluster {
            name: cluster.name.clone(),
            action: cluster.action.unwrap_or(ActionPriority::DebtReview),
            member_count: cluster.finding_ids.len(),
        };
        if filter.tier.is_none_or(|tier| matches_tier(&item, tier)) {
            items.push(item);
        }
    }

    for finding in state.findings.values() {
        if collapsed_ids.contains(finding.id.as_str()) {
            continue;
        }
        if finding.suppressed {
            continue;
        }
        if !filter.include_skipped && skipped_ids.contains(&finding.id) {
            continue;
        }
        if let Some(tier) = filter.tier {
            if finding.tier != tier {
                continue;
            }
        }
        if let Some(prefix) = &filter.scope_prefix {
            if !finding.file.starts_with(prefix.as_str()) {
                continue;
            }
        }
        if filter.chronic_only && finding.reopen_count < 2 {
            continue;
        }
        let holistic_display_weight = finding.weight() * HOLISTIC_MULTIPLIER;
        items.push(QueueItem::Mechanical {
            id: finding.id.clone(),
            tier: finding.tier,
            confidence: finding.confidence,
            review_weight: finding.detail.review_weight.unwrap_or(holistic_display_weight),
            count: 1,
        });
    }

    for (dim, assessment) in &state.subjective_assessments {
        let item = QueueItem::Subjective { dimension: dim.clone(), score: assessment.score };
        if filter.tier.is_none_or(|tier| matches_tier(&item, tier)) {
            items.push(item);
        }
    }

    items
}
