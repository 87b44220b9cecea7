//! State resolution
//!
//! Ranks candidate states into a primary/secondary pair and derives the
//! remaining profile fields: intensity, confidence, stability, momentum,
//! journey stage, and trigger keywords. Stability and momentum read the
//! per-user profile history; everything else is a function of the current
//! window and scores.

use crate::config::EngineConfig;
use crate::types::{
    BehavioralProfile, BehavioralState, CandidateState, IndicatorScores, IntensityLevel,
    JourneyStage,
};
use crate::window::EventWindow;

/// Profiles examined for stability.
const STABILITY_LOOKBACK: usize = 5;

/// Profiles examined for momentum.
const MOMENTUM_LOOKBACK: usize = 3;

/// Seconds defining "recent" interaction for the intensity bonus.
const RECENCY_HORIZON_SEC: i64 = 60;

/// Intensity band thresholds.
const INTENSITY_MEDIUM: f64 = 0.3;
const INTENSITY_HIGH: f64 = 0.6;
const INTENSITY_EXTREME: f64 = 0.8;

/// Complementary indicator pairs whose joint strength raises confidence.
const COMPLEMENTARY_PAIRS: [(&str, &str); 3] = [
    ("confident_clicking", "methodical_behavior"),
    ("deep_consideration", "session_continuity"),
    ("overwhelmed_scrolling", "impulsive_behavior"),
];

/// Resolution output, merged with the transition distribution into the
/// final profile by the engine. Transient, like the candidate set.
#[derive(Debug, Clone)]
pub struct StateResolution {
    pub primary: BehavioralState,
    pub secondary: BehavioralState,
    pub micro_states: Vec<BehavioralState>,
    pub intensity: IntensityLevel,
    pub confidence: f64,
    pub stability: f64,
    pub momentum: f64,
    pub journey_stage: JourneyStage,
    pub triggers: Vec<String>,
}

/// Resolver over candidates, scores, and the profile history.
pub struct StateResolver;

impl StateResolver {
    pub fn resolve(
        candidates: &[CandidateState],
        scores: &IndicatorScores,
        window: &EventWindow,
        history: &[BehavioralProfile],
        config: &EngineConfig,
    ) -> StateResolution {
        let ranked = rank_candidates(candidates, scores, config);

        let primary = ranked
            .first()
            .map(|(s, _)| *s)
            .unwrap_or(BehavioralState::DEFAULT);
        let secondary = ranked.get(1).map(|(s, _)| *s).unwrap_or(primary);
        let micro_states: Vec<BehavioralState> = ranked.iter().map(|(s, _)| *s).collect();

        StateResolution {
            primary,
            secondary,
            micro_states,
            intensity: intensity(scores, window),
            confidence: confidence(scores, candidates.len(), window.len()),
            stability: stability(history),
            momentum: momentum(history),
            journey_stage: journey_stage(window),
            triggers: triggers(window, primary),
        }
    }
}

/// Boost each candidate's evidence by its state-specific weighted indicator
/// combination, then sort descending. The sort is stable, so candidates
/// with equal boosted scores keep template declaration order.
fn rank_candidates(
    candidates: &[CandidateState],
    scores: &IndicatorScores,
    config: &EngineConfig,
) -> Vec<(BehavioralState, f64)> {
    let mut ranked: Vec<(BehavioralState, f64)> = candidates
        .iter()
        .map(|c| {
            let boost = config
                .boost_for(c.state)
                .map(|b| {
                    b.weights
                        .iter()
                        .map(|(indicator, weight)| scores.get(indicator) * weight)
                        .sum::<f64>()
                })
                .unwrap_or(0.0);
            (c.state, c.evidence + boost)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

/// Intensity: weighted sum of impulsiveness, engagement depth, click
/// confidence, and overwhelm, plus a bonus for dense recent interaction.
///
/// The recency bonus counts events within 60 seconds of the *newest event*
/// (not the wall clock) over the last five events, 0.1 each, capped at 0.4,
/// and applies only once the window holds at least 5 events.
fn intensity(scores: &IndicatorScores, window: &EventWindow) -> IntensityLevel {
    let mut score = 0.3 * scores.get("impulsive_behavior")
        + 0.2 * scores.get("deep_consideration")
        + 0.2 * scores.get("confident_clicking")
        + 0.3 * scores.get("overwhelmed_scrolling");

    if window.len() >= 5 {
        let recent = window.recent_event_count(RECENCY_HORIZON_SEC, 5);
        score += (recent as f64 * 0.1).min(0.4);
    }

    if score >= INTENSITY_EXTREME {
        IntensityLevel::Extreme
    } else if score >= INTENSITY_HIGH {
        IntensityLevel::High
    } else if score >= INTENSITY_MEDIUM {
        IntensityLevel::Medium
    } else {
        IntensityLevel::Low
    }
}

/// Confidence: 0.5 base, raised by agreement between complementary
/// indicator pairs (0.2 × min of each pair), by candidate diversity
/// (0.1 each, capped 0.3), and by interaction volume (0.02 per windowed
/// event, capped 0.2). Clamped to [0, 1].
fn confidence(scores: &IndicatorScores, candidate_count: usize, window_len: usize) -> f64 {
    let mut value = 0.5;

    for (a, b) in COMPLEMENTARY_PAIRS {
        value += scores.get(a).min(scores.get(b)) * 0.2;
    }

    value += (candidate_count as f64 * 0.1).min(0.3);
    value += (window_len as f64 * 0.02).min(0.2);

    value.clamp(0.0, 1.0)
}

/// Stability over the last profiles: 0.7 × the fraction of consecutive
/// pairs that kept their primary state + 0.3 × (1 − normalized intensity
/// variance). Fewer than 3 prior profiles yields the neutral default 0.5.
fn stability(history: &[BehavioralProfile]) -> f64 {
    if history.len() < 3 {
        return 0.5;
    }

    let recent = &history[history.len().saturating_sub(STABILITY_LOOKBACK)..];

    let transitions = recent
        .windows(2)
        .filter(|pair| pair[0].primary_state != pair[1].primary_state)
        .count();
    let transition_stability = 1.0 - transitions as f64 / (recent.len() - 1).max(1) as f64;

    let levels: Vec<f64> = recent.iter().map(|p| p.intensity.level() as f64).collect();
    let mean = levels.iter().sum::<f64>() / levels.len() as f64;
    let variance =
        levels.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / levels.len() as f64;
    // Intensity levels span 1..=4, so variance tops out below 3.
    let intensity_stability = (1.0 - variance / 3.0).max(0.0);

    (0.7 * transition_stability + 0.3 * intensity_stability).clamp(0.0, 1.0)
}

/// Momentum: sum of signed intensity-level deltas over the last 3 profiles,
/// scaled by 0.3 per step and clamped to [-1, 1].
fn momentum(history: &[BehavioralProfile]) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }

    let recent = &history[history.len().saturating_sub(MOMENTUM_LOOKBACK)..];
    let momentum: f64 = recent
        .windows(2)
        .map(|pair| (pair[1].intensity.level() - pair[0].intensity.level()) as f64 * 0.3)
        .sum();

    momentum.clamp(-1.0, 1.0)
}

/// Journey stage, evaluated in fixed priority order so exactly one stage is
/// returned.
fn journey_stage(window: &EventWindow) -> JourneyStage {
    let total = window.len();
    if total <= 3 {
        return JourneyStage::Discovery;
    }

    let last_three = window.recent_actions(3);
    if last_three.contains(&"search") {
        return JourneyStage::Exploration;
    }
    if last_three.contains(&"hover") && total > 5 {
        return JourneyStage::Consideration;
    }
    if window.actions().contains(&"add_to_cart") {
        return JourneyStage::Decision;
    }
    if window.recent_actions(2).contains(&"click") && total > 8 {
        return JourneyStage::Commitment;
    }
    JourneyStage::Engagement
}

/// State-specific trigger identification over the last five targets and
/// actions.
fn triggers(window: &EventWindow, primary: BehavioralState) -> Vec<String> {
    let recent_targets = window.recent_targets(5);
    let recent_actions = window.recent_actions(5);
    let mut triggers = Vec::new();

    match primary {
        BehavioralState::Hesitant => {
            if recent_targets.iter().any(|t| t.contains("price")) {
                triggers.push("price_sensitivity".to_string());
            }
            if recent_actions.contains(&"hover") {
                triggers.push("decision_uncertainty".to_string());
            }
        }
        BehavioralState::Inspired => {
            if recent_targets.iter().any(|t| t.contains("story")) {
                triggers.push("narrative_connection".to_string());
            }
            if recent_targets.iter().any(|t| t.contains("sustainability")) {
                triggers.push("value_alignment".to_string());
            }
        }
        BehavioralState::Overwhelmed => {
            let distinct: std::collections::BTreeSet<&&str> = recent_targets.iter().collect();
            if distinct.len() > 3 {
                triggers.push("choice_overload".to_string());
            }
            if recent_actions.contains(&"search") {
                triggers.push("information_seeking".to_string());
            }
        }
        BehavioralState::Confident => {
            if recent_actions.contains(&"add_to_cart") {
                triggers.push("clear_value_proposition".to_string());
            }
            if recent_targets.iter().any(|t| t.contains("review")) {
                triggers.push("social_proof".to_string());
            }
        }
        _ => {}
    }

    if triggers.is_empty() {
        triggers.push("general_engagement".to_string());
    }
    triggers
}
