//! Highlight selection strategies.
//!
//! Selection is an ordered list of strategies sharing one signature. Each
//! tier runs only when the previous one produced too little material.

use tracing::debug;

use reelcut_models::{HighlightSelection, Segment, TargetWindow};

/// Accept while the running total stays at or below this share of the target.
const UPPER_TOLERANCE: f64 = 1.2;
/// Stop once the running total reaches this share of the target.
const LOWER_TOLERANCE: f64 = 0.8;
/// Largest gap (seconds) closed when merging adjacent selections.
const MERGE_GAP_SECS: f64 = 2.0;
/// Minimum duration used by the relaxed tier (seconds).
pub const RELAXED_MIN_SEGMENT_SECS: f64 = 2.0;
/// A tier is sufficient when its total reaches this share of the target floor.
const SUFFICIENT_SHARE: f64 = 0.7;

/// One way of turning score-ranked candidates into a selection.
pub trait SelectionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn select(&self, candidates: &[Segment], target: &TargetWindow) -> HighlightSelection;
}

/// Greedy fill toward the target midpoint.
#[derive(Debug, Clone)]
pub struct GreedySelection {
    name: &'static str,
    min_segment_duration: f64,
}

impl GreedySelection {
    pub fn new(name: &'static str, min_segment_duration: f64) -> Self {
        Self {
            name,
            min_segment_duration: min_segment_duration.max(0.0),
        }
    }
}

impl SelectionStrategy for GreedySelection {
    fn name(&self) -> &'static str {
        self.name
    }

    fn select(&self, candidates: &[Segment], target: &TargetWindow) -> HighlightSelection {
        select_highlights(candidates, target, self.min_segment_duration)
    }
}

/// Last resort: the top-N scored windows regardless of duration target.
#[derive(Debug, Clone, Default)]
pub struct ForcedTopN;

impl ForcedTopN {
    /// `max(3, target_min / 10)`.
    pub fn count_for(target: &TargetWindow) -> usize {
        ((target.min / 10.0).floor() as usize).max(3)
    }
}

impl SelectionStrategy for ForcedTopN {
    fn name(&self) -> &'static str {
        "forced_top_n"
    }

    fn select(&self, candidates: &[Segment], target: &TargetWindow) -> HighlightSelection {
        let top: Vec<Segment> = by_score(candidates)
            .into_iter()
            .take(Self::count_for(target))
            .cloned()
            .collect();
        HighlightSelection::from_segments(top, target)
    }
}

/// Greedy highlight selection.
///
/// 1. Accept score-ranked candidates of at least `min_segment_duration`
///    while the total stays within 1.2x the target midpoint, stopping at 0.8x
/// 2. If still short, try the remaining candidates, short ones included
/// 3. If still short, merge time-adjacent selections separated by <= 2s
///
/// A candidate pool whose total already lies within [0.8, 1.2]x the target is
/// returned whole, so selecting from a previous selection changes nothing.
pub fn select_highlights(
    candidates: &[Segment],
    target: &TargetWindow,
    min_segment_duration: f64,
) -> HighlightSelection {
    if candidates.is_empty() {
        return HighlightSelection::empty();
    }

    let goal = target.midpoint();
    let lower = goal * LOWER_TOLERANCE;
    let upper = goal * UPPER_TOLERANCE;

    let pool_total: f64 = candidates.iter().map(|s| s.duration).sum();
    if pool_total >= lower && pool_total <= upper {
        return HighlightSelection::from_segments(candidates.to_vec(), target);
    }

    let ranked = by_score(candidates);
    let mut taken = vec![false; ranked.len()];
    let mut selected: Vec<Segment> = Vec::new();
    let mut total = 0.0;

    let mut fill = |accept_short: bool, selected: &mut Vec<Segment>, total: &mut f64| {
        for (i, segment) in ranked.iter().enumerate() {
            if *total >= lower {
                break;
            }
            if taken[i] || (!accept_short && segment.duration < min_segment_duration) {
                continue;
            }
            if *total + segment.duration <= upper {
                taken[i] = true;
                *total += segment.duration;
                selected.push((*segment).clone());
            }
        }
    };

    fill(false, &mut selected, &mut total);
    if total < lower {
        debug!(total, lower, "First pass short, considering short candidates");
        fill(true, &mut selected, &mut total);
    }

    if total < lower && selected.len() > 1 {
        debug!(total, lower, "Still short, merging adjacent segments");
        selected = merge_adjacent(selected, MERGE_GAP_SECS);
    }

    HighlightSelection::from_segments(selected, target)
}

/// Merge time-adjacent segments separated by at most `max_gap` seconds.
///
/// Each run of adjacent segments becomes one segment scored with the mean
/// of the whole run.
pub fn merge_adjacent(mut segments: Vec<Segment>, max_gap: f64) -> Vec<Segment> {
    segments.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    let mut runs: Vec<Vec<Segment>> = Vec::new();
    for segment in segments {
        match runs.last_mut() {
            Some(run) if run.last().is_some_and(|last| last.gap_to(&segment) <= max_gap) => {
                run.push(segment);
            }
            _ => runs.push(vec![segment]),
        }
    }
    runs.iter().filter_map(|run| Segment::merge_all(run)).collect()
}

/// Whether a tier produced enough material to stop.
pub fn is_sufficient(selection: &HighlightSelection, target: &TargetWindow) -> bool {
    !selection.is_empty() && selection.total_duration >= target.min * SUFFICIENT_SHARE
}

/// Ordered selection tiers.
pub struct StrategyPipeline {
    strategies: Vec<Box<dyn SelectionStrategy>>,
}

impl StrategyPipeline {
    pub fn new(strategies: Vec<Box<dyn SelectionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Normal minimum, relaxed minimum, then forced top-N.
    pub fn standard(min_segment_duration: f64) -> Self {
        Self::new(vec![
            Box::new(GreedySelection::new("normal", min_segment_duration)),
            Box::new(GreedySelection::new(
                "relaxed",
                RELAXED_MIN_SEGMENT_SECS.min(min_segment_duration),
            )),
            Box::new(ForcedTopN),
        ])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// First sufficient selection, or the last tier's if none is.
    ///
    /// `None` only when every tier comes back empty.
    pub fn run(
        &self,
        candidates: &[Segment],
        target: &TargetWindow,
    ) -> Option<(HighlightSelection, &'static str)> {
        let mut fallback = None;
        for strategy in &self.strategies {
            let selection = strategy.select(candidates, target);
            debug!(
                strategy = strategy.name(),
                segments = selection.len(),
                total = selection.total_duration,
                "Selection tier finished"
            );
            if is_sufficient(&selection, target) {
                return Some((selection, strategy.name()));
            }
            if !selection.is_empty() {
                fallback = Some((selection, strategy.name()));
            }
        }
        fallback
    }
}

fn by_score(candidates: &[Segment]) -> Vec<&Segment> {
    let mut ranked: Vec<&Segment> = candidates.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));
    ranked
}
