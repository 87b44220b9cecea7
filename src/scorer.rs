//! Behavioral indicator scoring
//!
//! Converts an event window into normalized indicator scores. Scoring is a
//! deterministic, side-effect-free function of the window: the same events
//! always produce the same scores. Missing inputs for any indicator family
//! yield that family's documented neutral default, never an error.

use crate::config::SequenceTemplate;
use crate::types::{
    DwellBand, DwellSummary, DwellTrend, IndicatorScores, RhythmSummary, ScrollBand,
};
use crate::window::EventWindow;
use std::collections::BTreeSet;

/// Dwell-time bands in seconds (lower inclusive, upper exclusive).
const DWELL_BANDS: [(DwellBand, f64, f64); 5] = [
    (DwellBand::QuickGlance, 0.0, 0.5),
    (DwellBand::BriefInterest, 0.5, 2.0),
    (DwellBand::FocusedAttention, 2.0, 8.0),
    (DwellBand::DeepEngagement, 8.0, 20.0),
    (DwellBand::IntensiveAnalysis, 20.0, f64::INFINITY),
];

/// Scroll-velocity bands in px/sec with the consistency each band expects.
const SCROLL_BANDS: [(ScrollBand, f64, f64, f64); 5] = [
    (ScrollBand::MethodicalReading, 10.0, 50.0, 0.8),
    (ScrollBand::CasualScanning, 50.0, 150.0, 0.6),
    (ScrollBand::ActiveSearching, 150.0, 300.0, 0.4),
    (ScrollBand::OverwhelmedScrolling, 300.0, 800.0, 0.2),
    (ScrollBand::FranticBehavior, 800.0, f64::INFINITY, 0.1),
];

/// A band matches only when observed consistency reaches this fraction of
/// the band's required consistency.
const CONSISTENCY_TOLERANCE: f64 = 0.7;

/// Dwell slope beyond which the series counts as trending.
const TREND_SLOPE_THRESHOLD: f64 = 0.15;

/// Coefficient of variation below which a flat dwell series counts as
/// consistent engagement rather than erratic behavior.
const CONSISTENT_CV_THRESHOLD: f64 = 0.25;

/// Weight of action-set overlap vs timing correlation in sequence matching.
const SEQUENCE_OVERLAP_WEIGHT: f64 = 0.7;
const SEQUENCE_TIMING_WEIGHT: f64 = 0.3;

/// Contiguous action patterns that count as methodical behavior.
const METHODICAL_PATTERNS: [[&str; 3]; 3] = [
    ["view", "hover", "click"],
    ["search", "filter", "compare"],
    ["hover", "read", "compare"],
];

/// Indicator scorer for event windows.
pub struct IndicatorScorer;

impl IndicatorScorer {
    /// Score all indicator families over a window.
    pub fn score(window: &EventWindow, sequences: &[SequenceTemplate]) -> IndicatorScores {
        let mut scores = IndicatorScores::default();

        score_dwell_family(window, &mut scores);
        score_scroll_family(window, &mut scores);
        score_rhythm_family(window, &mut scores);
        score_sequence_family(window, sequences, &mut scores);
        score_behavior_composites(window, &mut scores);

        scores
    }
}

/// Dwell family: band the mean dwell time and derive engagement scalars.
///
/// - `deep_consideration = min(1, mean / 10)`
/// - `quick_scanning = max(0, 1 - mean / 5)`
///
/// Band confidence scales inversely with variance:
/// `clamp(1 - variance / max(1, mean), 0.5, 1.0)`.
fn score_dwell_family(window: &EventWindow, scores: &mut IndicatorScores) {
    let dwell: Vec<f64> = window
        .iter()
        .filter_map(|e| e.dwell_time_sec)
        .filter(|d| *d > 0.0)
        .collect();

    if dwell.is_empty() {
        scores.set("deep_consideration", 0.0);
        scores.set("quick_scanning", 0.0);
        return;
    }

    let mean = mean(&dwell);
    let variance = variance(&dwell, mean);

    scores.set("deep_consideration", mean / 10.0);
    scores.set("quick_scanning", 1.0 - mean / 5.0);

    let band = DWELL_BANDS
        .iter()
        .find(|(_, lo, hi)| mean >= *lo && mean < *hi)
        .map(|(band, _, _)| *band)
        .unwrap_or(DwellBand::IntensiveAnalysis);

    let confidence = (1.0 - variance / mean.max(1.0)).clamp(0.5, 1.0);

    scores.dwell = Some(DwellSummary {
        band,
        trend: dwell_trend(&dwell),
        mean_sec: mean,
        variance,
        confidence,
    });
}

/// Classify the direction of a dwell series. Requires 3 samples.
fn dwell_trend(dwell: &[f64]) -> Option<DwellTrend> {
    if dwell.len() < 3 {
        return None;
    }
    let slope = linear_slope(dwell);
    if slope <= -TREND_SLOPE_THRESHOLD {
        return Some(DwellTrend::DiminishingInterest);
    }
    if slope >= TREND_SLOPE_THRESHOLD {
        return Some(DwellTrend::EscalatingInterest);
    }
    let m = mean(dwell);
    let cv = if m > 0.0 {
        variance(dwell, m).sqrt() / m
    } else {
        0.0
    };
    if cv <= CONSISTENT_CV_THRESHOLD {
        Some(DwellTrend::ConsistentEngagement)
    } else {
        Some(DwellTrend::ErraticBehavior)
    }
}

/// Scroll family: band the mean velocity, gated on observed consistency.
///
/// - `overwhelmed_scrolling = clamp((mean - 200) / 300, 0, 1)`
/// - `methodical_reading = clamp((100 - mean) / 90, 0, 1)`
///
/// Consistency is `clamp(1 - variance / max(1, mean), 0, 1)`; a band is
/// selected only when observed consistency reaches 70% of the band's
/// required consistency.
fn score_scroll_family(window: &EventWindow, scores: &mut IndicatorScores) {
    let velocities: Vec<f64> = window
        .iter()
        .filter_map(|e| e.scroll_velocity)
        .filter(|v| *v > 0.0)
        .collect();

    if velocities.is_empty() {
        scores.set("overwhelmed_scrolling", 0.0);
        scores.set("methodical_reading", 0.0);
        return;
    }

    let mean = mean(&velocities);
    let variance = variance(&velocities, mean);
    let consistency = (1.0 - variance / mean.max(1.0)).clamp(0.0, 1.0);

    scores.set("overwhelmed_scrolling", (mean - 200.0) / 300.0);
    scores.set("methodical_reading", (100.0 - mean) / 90.0);

    scores.scroll_band = SCROLL_BANDS
        .iter()
        .find(|(_, lo, hi, required)| {
            mean >= *lo && mean < *hi && consistency >= required * CONSISTENCY_TOLERANCE
        })
        .map(|(band, _, _, _)| *band);
}

/// Rhythm family: statistics over inter-event gaps.
///
/// `session_continuity = max(0, 1 - mean_gap / 60)`; a window with fewer
/// than two events takes the neutral rhythm default and continuity 0.5.
fn score_rhythm_family(window: &EventWindow, scores: &mut IndicatorScores) {
    let timestamps: Vec<_> = window.iter().map(|e| e.timestamp).collect();
    let gaps: Vec<f64> = timestamps
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64 / 1000.0)
        .filter(|g| *g >= 0.0)
        .collect();

    if gaps.is_empty() {
        scores.rhythm = RhythmSummary::default();
        scores.set("session_continuity", 0.5);
        return;
    }

    let mean_gap = mean(&gaps);
    let std_dev = variance(&gaps, mean_gap).sqrt();

    scores.rhythm = RhythmSummary {
        mean_gap_sec: mean_gap,
        std_dev_sec: std_dev,
        median_gap_sec: median(&gaps),
    };
    scores.set("session_continuity", 1.0 - mean_gap / 60.0);
}

/// Sequence family: similarity of the window's action sequence against each
/// reference sequence.
///
/// Similarity = 0.7 × Jaccard(action sets) + 0.3 × correlation of the
/// sum-normalized timing vectors truncated to the shorter length. The
/// set-overlap term is deliberately order-insensitive. Windows of fewer
/// than 3 events produce no sequence scores.
fn score_sequence_family(
    window: &EventWindow,
    sequences: &[SequenceTemplate],
    scores: &mut IndicatorScores,
) {
    if window.len() < 3 {
        return;
    }

    let actions = window.actions();
    let timings: Vec<f64> = window.iter().map(|e| e.duration_sec).collect();

    for sequence in sequences {
        let overlap = jaccard(&actions, &sequence.actions);
        let timing = timing_similarity(&timings, &sequence.timing_sec);
        let similarity =
            SEQUENCE_OVERLAP_WEIGHT * overlap + SEQUENCE_TIMING_WEIGHT * timing;
        scores.set(&format!("seq_{}", sequence.name), similarity);
    }
}

/// Composite behavior cues derived from the action stream and click
/// pressure samples.
fn score_behavior_composites(window: &EventWindow, scores: &mut IndicatorScores) {
    let actions = window.actions();

    scores.set("methodical_behavior", methodical_score(&actions));
    scores.set("impulsive_behavior", impulsive_score(&actions));

    let pressures: Vec<f64> = window.iter().map(|e| e.click_pressure()).collect();
    let confident = if pressures.is_empty() {
        crate::types::NEUTRAL_CLICK_PRESSURE
    } else {
        mean(&pressures)
    };
    scores.set("confident_clicking", confident);
    scores.set("hesitant_clicking", 1.0 - confident);
}

/// Methodical score: +0.3 for each known contiguous pattern found in the
/// last five actions, capped at 1.0.
fn methodical_score(actions: &[&str]) -> f64 {
    let recent: Vec<&str> = actions
        .iter()
        .skip(actions.len().saturating_sub(5))
        .copied()
        .collect();

    let mut score: f64 = 0.0;
    for pattern in METHODICAL_PATTERNS {
        if contains_contiguous(&recent, &pattern) {
            score += 0.3;
        }
    }
    score.min(1.0)
}

/// Impulsive score: the fraction of three boolean cues that hold.
///
/// Cues: a cart addition within the last two actions; low action diversity
/// (unique actions below 60% of the total); clicking within a very short
/// window (3 events or fewer).
fn impulsive_score(actions: &[&str]) -> f64 {
    if actions.is_empty() {
        return 0.0;
    }

    let last_two = &actions[actions.len().saturating_sub(2)..];
    let quick_cart = last_two.contains(&"add_to_cart");

    let unique: BTreeSet<&str> = actions.iter().copied().collect();
    let repetitive = (unique.len() as f64) < actions.len() as f64 * 0.6;

    let quick_clicking = actions.contains(&"click") && actions.len() <= 3;

    let cues = [quick_cart, repetitive, quick_clicking];
    cues.iter().filter(|c| **c).count() as f64 / cues.len() as f64
}

fn contains_contiguous(haystack: &[&str], needle: &[&str; 3]) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w.iter().zip(needle.iter()).all(|(a, b)| a == b))
}

/// Jaccard overlap of the unique action names in two sequences.
fn jaccard(a: &[&str], b: &[String]) -> f64 {
    let set_a: BTreeSet<&str> = a.iter().copied().collect();
    let set_b: BTreeSet<&str> = b.iter().map(|s| s.as_str()).collect();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    set_a.intersection(&set_b).count() as f64 / union as f64
}

/// Correlation of two timing vectors after sum-normalization, truncated to
/// the shorter length. Degenerate inputs score neutral 0.5; negative
/// correlation floors at 0.
fn timing_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.5;
    }
    let len = a.len().min(b.len());
    let norm_a = sum_normalize(&a[..len]);
    let norm_b = sum_normalize(&b[..len]);
    match pearson(&norm_a, &norm_b) {
        Some(r) => r.max(0.0),
        None => 0.5,
    }
}

fn sum_normalize(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    let denom = total.max(1.0);
    values.iter().map(|v| v / denom).collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
fn variance(values: &[f64], mean: f64) -> f64 {
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Least-squares slope of a series against its index.
fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(values);
    let mut cov = 0.0;
    let mut var_x = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        cov += dx * (y - y_mean);
        var_x += dx * dx;
    }
    if var_x == 0.0 {
        0.0
    } else {
        cov / var_x
    }
}

/// Pearson correlation; `None` when either series is constant.
fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let mean_a = mean(a);
    let mean_b = mean(b);
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        return None;
    }
    Some(cov / denom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::types::InteractionEvent;
    use chrono::{TimeZone, Utc};

    fn event(sec_offset: i64, action: &str, dwell: Option<f64>, scroll: Option<f64>) -> InteractionEvent {
        InteractionEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap()
                + chrono::Duration::seconds(sec_offset),
            action: action.to_string(),
            target: format!("{action}_target"),
            duration_sec: dwell.unwrap_or(1.0),
            scroll_velocity: scroll,
            dwell_time_sec: dwell,
            session_id: "s1".to_string(),
            context: Default::default(),
        }
    }

    fn window_from(events: Vec<InteractionEvent>) -> EventWindow {
        let mut window = EventWindow::default();
        window.extend(events);
        window
    }

    fn score(window: &EventWindow) -> IndicatorScores {
        IndicatorScorer::score(window, &EngineConfig::builtin().sequences)
    }

    #[test]
    fn empty_window_scores_neutral_defaults() {
        let window = EventWindow::default();
        let scores = score(&window);

        assert_eq!(scores.get("deep_consideration"), 0.0);
        assert_eq!(scores.get("overwhelmed_scrolling"), 0.0);
        assert_eq!(scores.get("session_continuity"), 0.5);
        assert_eq!(scores.get("confident_clicking"), 0.5);
        assert!(scores.dwell.is_none());
        assert!(scores.scroll_band.is_none());
        assert_eq!(scores.rhythm, RhythmSummary::default());
    }

    #[test]
    fn dwell_band_selection() {
        let window = window_from(vec![
            event(0, "view", Some(3.5), None),
            event(30, "view", Some(3.6), None),
            event(60, "view", Some(3.4), None),
        ]);
        let scores = score(&window);
        let dwell = scores.dwell.unwrap();

        assert_eq!(dwell.band, DwellBand::FocusedAttention);
        assert_eq!(dwell.trend, Some(DwellTrend::ConsistentEngagement));
        assert!((dwell.mean_sec - 3.5).abs() < 1e-9);
        assert!(dwell.confidence > 0.5);
    }

    #[test]
    fn diminishing_dwell_series_is_detected() {
        let dwell = [10.0, 8.0, 6.0, 4.0, 2.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let events: Vec<_> = dwell
            .iter()
            .enumerate()
            .map(|(i, d)| event(i as i64 * 45, "view", Some(*d), Some(40.0)))
            .collect();
        let scores = score(&window_from(events));

        let summary = scores.dwell.unwrap();
        assert_eq!(summary.trend, Some(DwellTrend::DiminishingInterest));
    }

    #[test]
    fn high_variance_blocks_strict_band() {
        // Mean 30 px/s sits in methodical-reading range, but wild variance
        // fails the band's consistency requirement.
        let events = vec![
            event(0, "scroll", None, Some(5.0)),
            event(10, "scroll", None, Some(80.0)),
            event(20, "scroll", None, Some(5.0)),
        ];
        let scores = score(&window_from(events));
        assert!(scores.scroll_band.is_none());
    }

    #[test]
    fn steady_slow_scrolling_is_methodical() {
        let events = vec![
            event(0, "scroll", None, Some(38.0)),
            event(10, "scroll", None, Some(42.0)),
            event(20, "scroll", None, Some(40.0)),
        ];
        let scores = score(&window_from(events));
        assert_eq!(scores.scroll_band, Some(ScrollBand::MethodicalReading));
        assert!(scores.get("methodical_reading") > 0.6);
        assert_eq!(scores.get("overwhelmed_scrolling"), 0.0);
    }

    #[test]
    fn rapid_scrolling_scores_overwhelmed() {
        let events = vec![
            event(0, "scroll", None, Some(480.0)),
            event(5, "scroll", None, Some(500.0)),
            event(10, "scroll", None, Some(520.0)),
        ];
        let scores = score(&window_from(events));
        assert!(scores.get("overwhelmed_scrolling") > 0.9);
        assert_eq!(scores.get("methodical_reading"), 0.0);
    }

    #[test]
    fn rhythm_statistics() {
        let events = vec![
            event(0, "view", None, None),
            event(10, "hover", None, None),
            event(30, "click", None, None),
        ];
        let scores = score(&window_from(events));

        assert!((scores.rhythm.mean_gap_sec - 15.0).abs() < 1e-9);
        assert!((scores.rhythm.median_gap_sec - 15.0).abs() < 1e-9);
        assert!((scores.get("session_continuity") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn methodical_pattern_detection() {
        let events = vec![
            event(0, "view", None, None),
            event(10, "hover", None, None),
            event(20, "click", None, None),
        ];
        let scores = score(&window_from(events));
        assert!((scores.get("methodical_behavior") - 0.3).abs() < 1e-9);
    }

    #[test]
    fn impulsive_cues() {
        // Quick cart add, tiny window with a click: 2 of 3 cues hold
        // (unique ratio 3/3 = 1.0 is not repetitive).
        let events = vec![
            event(0, "view", None, None),
            event(2, "click", None, None),
            event(3, "add_to_cart", None, None),
        ];
        let scores = score(&window_from(events));
        assert!((scores.get("impulsive_behavior") - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn sequence_similarity_is_order_insensitive_on_overlap() {
        let forward = vec![
            event(0, "view", None, None),
            event(10, "read", None, None),
            event(20, "compare", None, None),
            event(30, "research", None, None),
            event(40, "decide", None, None),
        ];
        let reversed = vec![
            event(0, "decide", None, None),
            event(10, "research", None, None),
            event(20, "compare", None, None),
            event(30, "read", None, None),
            event(40, "view", None, None),
        ];
        let a = score(&window_from(forward));
        let b = score(&window_from(reversed));

        // The set-overlap term is order-insensitive: the same action set in
        // any order yields the same overlap contribution.
        let key = "seq_methodical_researcher";
        assert!(a.get(key) >= 0.7);
        assert!((a.get(key) - b.get(key)).abs() < 0.3);
    }

    #[test]
    fn click_pressure_feeds_confidence_indicators() {
        let mut confident = event(0, "click", None, None);
        confident
            .context
            .insert("click_pressure".to_string(), 0.9);
        let mut firm = event(5, "click", None, None);
        firm.context.insert("click_pressure".to_string(), 0.7);

        let scores = score(&window_from(vec![confident, firm]));
        assert!((scores.get("confident_clicking") - 0.8).abs() < 1e-9);
        assert!((scores.get("hesitant_clicking") - 0.2).abs() < 1e-9);
    }

    #[test]
    fn all_scores_clamped_to_unit_interval() {
        let events: Vec<_> = (0..20)
            .map(|i| event(i * 2, "scroll", Some(45.0), Some(1500.0)))
            .collect();
        let scores = score(&window_from(events));

        for (name, value) in &scores.values {
            assert!(
                (0.0..=1.0).contains(value),
                "indicator {name} out of range: {value}"
            );
        }
    }

    #[test]
    fn linear_slope_of_decreasing_series() {
        let values = [10.0, 8.0, 6.0, 4.0, 2.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        assert!((linear_slope(&values) + 1.0).abs() < 1e-9);
    }
}
